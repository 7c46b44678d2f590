//! Streaming TSV reader
//!
//! Reads one line at a time from a tab-separated export. The first line is
//! the header; every later line is returned as an ordered list of field
//! values. Quote characters are ordinary data in these exports, and rows may
//! have any width (the normalizer decides what a width mismatch means). A
//! blank line is a row with a single empty field, so line numbers always
//! match the file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ImportError, ImportResult};

const UTF8_BOM: char = '\u{feff}';

/// Row-at-a-time reader over a tab-delimited source
pub struct RowTokenizer<R: Read = File> {
    source: PathBuf,
    reader: BufReader<R>,
    headers: Vec<String>,
    buf: Vec<u8>,
    rows_read: u64,
}

impl RowTokenizer<File> {
    /// Open `path` and consume its header row
    pub fn open(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(file, path)
    }
}

impl<R: Read> RowTokenizer<R> {
    /// Wrap an arbitrary reader; `source` is only used in error messages
    pub fn from_reader(inner: R, source: impl Into<PathBuf>) -> ImportResult<Self> {
        let mut tokenizer = Self {
            source: source.into(),
            reader: BufReader::new(inner),
            headers: Vec::new(),
            buf: Vec::new(),
            rows_read: 0,
        };

        if !tokenizer.read_line(0)? {
            return Err(ImportError::EmptyInput(tokenizer.source));
        }

        tokenizer.headers = tokenizer
            .fields()
            .map(|field| decode(field).trim_start_matches(UTF8_BOM).trim().to_string())
            .collect();

        debug!(
            source = %tokenizer.source.display(),
            columns = tokenizer.headers.len(),
            "Read header row"
        );

        Ok(tokenizer)
    }

    /// Header names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows returned or skipped so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Next data row, or `None` at end of input
    pub fn next_row(&mut self) -> ImportResult<Option<Vec<String>>> {
        if !self.read_line(self.rows_read + 1)? {
            return Ok(None);
        }
        self.rows_read += 1;

        Ok(Some(self.fields().map(decode).collect()))
    }

    /// Advance past one data row without decoding it
    ///
    /// Returns `false` at end of input.
    pub fn skip_row(&mut self) -> ImportResult<bool> {
        if !self.read_line(self.rows_read + 1)? {
            return Ok(false);
        }
        self.rows_read += 1;
        Ok(true)
    }

    /// Reads the next physical line into the buffer without its terminator
    fn read_line(&mut self, line: u64) -> ImportResult<bool> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| ImportError::Tokenize { line, source })?;
        if read == 0 {
            return Ok(false);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(true)
    }

    fn fields(&self) -> impl Iterator<Item = &[u8]> {
        self.buf.split(|&b| b == b'\t')
    }
}

fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokenizer(content: &str) -> RowTokenizer<Cursor<Vec<u8>>> {
        RowTokenizer::from_reader(Cursor::new(content.as_bytes().to_vec()), "inline.tsv").unwrap()
    }

    #[test]
    fn test_header_then_rows() {
        let mut t = tokenizer("code\tproduct_name\nA\tTea\nB\tSoda\n");

        assert_eq!(t.headers(), ["code", "product_name"]);
        assert_eq!(t.next_row().unwrap(), Some(vec!["A".to_string(), "Tea".to_string()]));
        assert_eq!(t.next_row().unwrap(), Some(vec!["B".to_string(), "Soda".to_string()]));
        assert_eq!(t.next_row().unwrap(), None);
        assert_eq!(t.rows_read(), 2);
    }

    #[test]
    fn test_quotes_are_data() {
        let mut t = tokenizer("code\tproduct_name\nA\t\"Best\" tea\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row[1], "\"Best\" tea");
    }

    #[test]
    fn test_ragged_rows_are_returned_as_is() {
        let mut t = tokenizer("a\tb\tc\n1\t2\n1\t2\t3\t4\n");
        assert_eq!(t.next_row().unwrap().unwrap().len(), 2);
        assert_eq!(t.next_row().unwrap().unwrap().len(), 4);
    }

    #[test]
    fn test_bom_and_whitespace_stripped_from_header() {
        let t = tokenizer("\u{feff}code \t product_name\nA\tTea\n");
        assert_eq!(t.headers(), ["code", "product_name"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut bytes = b"code\tname\nA\t".to_vec();
        bytes.extend_from_slice(&[0x66, 0xff, 0x6f]);
        bytes.push(b'\n');
        let mut t = RowTokenizer::from_reader(Cursor::new(bytes), "bytes.tsv").unwrap();
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row[1], "f\u{fffd}o");
    }

    #[test]
    fn test_skip_row_counts_lines() {
        let mut t = tokenizer("code\nA\nB\nC\n");
        assert!(t.skip_row().unwrap());
        assert!(t.skip_row().unwrap());
        assert_eq!(t.next_row().unwrap(), Some(vec!["C".to_string()]));
        assert!(!t.skip_row().unwrap());
        assert_eq!(t.rows_read(), 3);
    }

    #[test]
    fn test_blank_lines_are_single_empty_field_rows() {
        let mut t = tokenizer("code\tname\nA\tTea\n\nB\tSoda\n");

        assert_eq!(t.next_row().unwrap(), Some(vec!["A".to_string(), "Tea".to_string()]));
        assert_eq!(t.next_row().unwrap(), Some(vec![String::new()]));
        assert_eq!(t.next_row().unwrap(), Some(vec!["B".to_string(), "Soda".to_string()]));
        assert_eq!(t.next_row().unwrap(), None);
        assert_eq!(t.rows_read(), 3);
    }

    #[test]
    fn test_skip_row_counts_blank_lines() {
        let mut t = tokenizer("code\n\n\nC\n");
        assert!(t.skip_row().unwrap());
        assert!(t.skip_row().unwrap());
        assert_eq!(t.next_row().unwrap(), Some(vec!["C".to_string()]));
        assert_eq!(t.rows_read(), 3);
    }

    #[test]
    fn test_crlf_terminators_are_stripped() {
        let mut t = tokenizer("code\tname\r\nA\tTea\r\n\r\nB\tSoda");

        assert_eq!(t.headers(), ["code", "name"]);
        assert_eq!(t.next_row().unwrap(), Some(vec!["A".to_string(), "Tea".to_string()]));
        assert_eq!(t.next_row().unwrap(), Some(vec![String::new()]));
        assert_eq!(t.next_row().unwrap(), Some(vec!["B".to_string(), "Soda".to_string()]));
        assert_eq!(t.next_row().unwrap(), None);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = RowTokenizer::from_reader(Cursor::new(Vec::new()), "empty.tsv");
        assert!(matches!(result, Err(ImportError::EmptyInput(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = RowTokenizer::open("/definitely/not/here.tsv");
        assert!(matches!(result, Err(ImportError::Io { .. })));
    }
}

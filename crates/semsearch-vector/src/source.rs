//! Record sources: lazy sequences of raw records to be embedded.
//!
//! Any iterator of `Result<RawRecord>` is a [`RecordSource`]. The corpus
//! builder pulls from it one record at a time and stops at its limit, so an
//! unbounded source is never materialized.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;

use semsearch_core::error::{Result, SemsearchError};
use semsearch_core::types::RawRecord;

/// A lazy, possibly unbounded sequence of raw records.
pub trait RecordSource: Iterator<Item = Result<RawRecord>> {}

impl<I> RecordSource for I where I: Iterator<Item = Result<RawRecord>> {}

/// Wrap in-memory records as an infallible source.
pub fn from_records<I>(records: I) -> impl RecordSource
where
    I: IntoIterator<Item = RawRecord>,
{
    records.into_iter().map(Ok)
}

/// Reads one JSON object per line.
///
/// Blank lines are skipped. A line that is not valid JSON, or whose value is
/// not an object, yields a `Source` error carrying its 1-based line number.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON Lines file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    fn parse_line(&self) -> Result<RawRecord> {
        match serde_json::from_str::<Value>(&self.buf) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(SemsearchError::Source {
                line: self.line,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(SemsearchError::Source {
                line: self.line,
                message: e.to_string(),
            }),
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    if self.buf.trim().is_empty() {
                        continue;
                    }
                    return Some(self.parse_line());
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn source(text: &str) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_one_record_per_line() {
        let records: Vec<RawRecord> = source(
            "{\"reviewText\": \"great\", \"overall\": 5.0}\n{\"reviewText\": \"bad\"}\n",
        )
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["reviewText"], "great");
        assert_eq!(records[0]["overall"], 5.0);
        assert_eq!(records[1]["reviewText"], "bad");
    }

    #[test]
    fn test_skips_blank_lines_and_handles_missing_newline() {
        let records: Vec<RawRecord> = source("\n{\"a\": 1}\n   \n{\"a\": 2}")
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"], 2);
    }

    #[test]
    fn test_reports_malformed_line_number() {
        let mut src = source("{\"a\": 1}\n\n{oops}\n{\"a\": 3}\n");
        assert!(src.next().unwrap().is_ok());
        match src.next().unwrap() {
            Err(SemsearchError::Source { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected Source error, got {other:?}"),
        }
        // The source keeps going after a bad line.
        assert_eq!(src.next().unwrap().unwrap()["a"], 3);
        assert!(src.next().is_none());
    }

    #[test]
    fn test_rejects_non_object_values() {
        let mut src = source("[1, 2, 3]\n");
        match src.next().unwrap() {
            Err(SemsearchError::Source { line, message }) => {
                assert_eq!(line, 1);
                assert!(message.contains("an array"));
            }
            other => panic!("Expected Source error, got {other:?}"),
        }
    }

    #[test]
    fn test_is_lazy() {
        // Only the first line is valid; taking one record never touches the rest.
        let first = source("{\"a\": 1}\nnot json at all\n").take(1).count();
        assert_eq!(first, 1);
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"reviewText\": \"from disk\"}}").unwrap();

        let records: Vec<RawRecord> = JsonLinesSource::open(file.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0]["reviewText"], "from disk");
    }

    #[test]
    fn test_open_missing_file() {
        let err = JsonLinesSource::open(Path::new("/nonexistent/reviews.json")).unwrap_err();
        assert!(matches!(err, SemsearchError::Io(_)));
    }

    #[test]
    fn test_from_records() {
        let mut record = RawRecord::new();
        record.insert("reviewText".to_string(), Value::from("in memory"));
        let collected: Vec<RawRecord> = from_records(vec![record.clone()])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(collected, vec![record]);
    }
}

//! CSV/TSV extractor with delimiter detection and schema coercion.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, SluiceError};
use crate::schema::{ColumnType, Dataset};
use crate::table::{Table, Value};

use super::source::{SourceMetadata, is_null_token};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<char>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: '"',
        }
    }
}

fn ascii_byte(ch: char, what: &str) -> Result<u8> {
    u8::try_from(ch)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| SluiceError::Config(format!("{} must be an ASCII character, got '{}'", what, ch)))
}

/// Reads delimited files into [`Table`]s.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read a file as text cells, with null tokens mapped to `Null`.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Table, SourceMetadata)> {
        self.read(path.as_ref(), |_, raw, _| Ok(text_cell(raw)))
    }

    /// Read a file and coerce each cell to the type `dataset` declares for
    /// its column. Undeclared columns stay text.
    pub fn parse_dataset(
        &self,
        dataset: Dataset,
        path: impl AsRef<Path>,
    ) -> Result<(Table, SourceMetadata)> {
        let path = path.as_ref();
        let (table, metadata) = self.read(path, |column, raw, row| {
            coerce(dataset.column_type(column), column, raw, row)
        })?;
        debug!(
            dataset = dataset.table_name(),
            file = %metadata.file,
            rows = table.row_count(),
            columns = table.column_count(),
            "Extracted"
        );
        Ok((table, metadata))
    }

    fn read<F>(&self, path: &Path, convert: F) -> Result<(Table, SourceMetadata)>
    where
        F: Fn(&str, &str, usize) -> Result<Value>,
    {
        let io_err = |source| SluiceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let size_bytes = file.metadata().map_err(io_err)?.len();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_err)?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) => ascii_byte(d, "Delimiter")?,
            None => detect_delimiter(&contents)?,
        };

        let table = self.parse_bytes(&contents, delimiter, convert)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    fn parse_bytes<F>(&self, bytes: &[u8], delimiter: u8, convert: F) -> Result<Table>
    where
        F: Fn(&str, &str, usize) -> Result<Value>,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(ascii_byte(self.config.quote, "Quote")?)
            .flexible(true)
            .from_reader(bytes);

        let mut records = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            if self.config.max_rows.is_some_and(|max| row_idx >= max) {
                break;
            }
            records.push(record?);
        }

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.trim().to_string()).collect()
        } else {
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(SluiceError::EmptyData("No columns found".to_string()));
        }

        let mut table = Table::with_columns(headers);
        for (row_idx, record) in records.iter().enumerate() {
            let row = table
                .columns
                .iter()
                .enumerate()
                .map(|(col_idx, column)| convert(column, record.get(col_idx).unwrap_or(""), row_idx))
                .collect::<Result<Vec<_>>>()?;
            table.push_row(row);
        }

        Ok(table)
    }
}

fn text_cell(raw: &str) -> Value {
    if is_null_token(raw) {
        Value::Null
    } else {
        Value::Text(raw.to_string())
    }
}

/// Convert one raw cell to `column_type`.
///
/// Timestamps are kept as text; parsing them is a cleaning step with its own
/// failure policy.
pub fn coerce(column_type: ColumnType, column: &str, raw: &str, row: usize) -> Result<Value> {
    if is_null_token(raw) {
        return Ok(Value::Null);
    }
    let trimmed = raw.trim();
    let parse_error = |message: String| SluiceError::Parse {
        row,
        column: column.to_string(),
        message,
    };

    match column_type {
        ColumnType::String | ColumnType::DateTime => Ok(Value::Text(raw.to_string())),
        ColumnType::Integer => {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
            // Integer columns with gaps are often written as floats ("12.0").
            match trimmed.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Integer(f as i64)),
                _ => Err(parse_error(format!("'{}' is not an integer", raw))),
            }
        }
        ColumnType::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| parse_error(format!("'{}' is not a number", raw))),
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Boolean(true)),
            "false" | "0" | "no" => Ok(Value::Boolean(false)),
            _ => Err(parse_error(format!("'{}' is not a boolean", raw))),
        },
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(SluiceError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts across lines beat a higher but ragged count.
        let score = if counts.iter().all(|&c| c == first_count) {
            first_count * 1000 + usize::from(delim == b'\t') * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

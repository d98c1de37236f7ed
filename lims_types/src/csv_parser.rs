use anyhow::{Context, Result};
use csv::StringRecord;
use fxhash::FxHashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CsvErrors {
    #[error("The {filetype} file {path:?} is empty.")]
    EmptyFile { filetype: String, path: PathBuf },

    #[error("The {filetype} file {path:?} has a header but no data rows.")]
    NoRows { filetype: String, path: PathBuf },

    #[error(
        "The {filetype} file {path:?} has unexpected headers. Expected the columns to start \
         with:\n{expected}\nbut found:\n{found}"
    )]
    UnexpectedHeaders {
        filetype: String,
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error(
        "Error in {filetype} file {path:?}. On line {line} in '{col}' column: \
         Expected a {expected} but received '{value}'"
    )]
    InvalidValue {
        filetype: String,
        path: PathBuf,
        line: usize,
        col: String,
        expected: String,
        value: String,
    },

    #[error(
        "Error in {filetype} file {path:?}. On line {line} in '{col}' column: \
         Value required but cell is empty."
    )]
    EmptyValue {
        filetype: String,
        path: PathBuf,
        line: usize,
        col: String,
    },
}

/// Helper for parsing instrument and configuration CSV files, validating
/// them & providing good error messages. Line numbers in errors are 1-based
/// and count the header line.
pub struct CsvParser {
    filetype: String,
    filename: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    col_map: FxHashMap<String, usize>,
    line: usize,
}

impl CsvParser {
    /// Create a parser for a file whose leading columns must be exactly
    /// `expected_headers`, in order. Missing or reordered columns are an error;
    /// extra trailing columns are allowed.
    pub fn with_exact_headers(
        filename: &Path,
        expected_headers: &[&str],
        filetype: &str,
    ) -> Result<CsvParser> {
        let file = File::open(filename).with_context(|| filename.display().to_string())?;
        Self::from_reader(
            BufReader::new(file),
            filename,
            expected_headers,
            filetype,
        )
    }

    /// Same as `with_exact_headers` but reading from memory. `filename` is only
    /// used in error messages.
    pub fn from_str_exact(
        contents: &str,
        filename: &Path,
        expected_headers: &[&str],
        filetype: &str,
    ) -> Result<CsvParser> {
        Self::from_reader(
            contents.as_bytes(),
            filename,
            expected_headers,
            filetype,
        )
    }

    fn from_reader<R: Read>(
        reader: R,
        filename: &Path,
        expected: &[&str],
        filetype: &str,
    ) -> Result<CsvParser> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let mut headers = rdr.headers()?.clone();
        headers.trim();
        let headers: Vec<_> = headers.iter().map(String::from).collect();
        if headers.iter().all(String::is_empty) {
            return Err(CsvErrors::EmptyFile {
                filetype: filetype.to_string(),
                path: filename.to_path_buf(),
            }
            .into());
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let mut record = result.with_context(|| filename.display().to_string())?;
            record.trim();
            // Spreadsheet exports often end with rows of empty cells.
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record);
        }

        let col_map = CsvParser::check_headers(filename, filetype, expected, &headers)?;

        Ok(CsvParser {
            filetype: filetype.to_string(),
            filename: filename.to_path_buf(),
            headers,
            rows,
            col_map,
            line: 0,
        })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Error out if there are no data rows.
    pub fn require_rows(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CsvErrors::NoRows {
                filetype: self.filetype.clone(),
                path: self.filename.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// File name
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Headers found in CSV
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Set the line number (not including the header) to pull data from
    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// 1-based line number in the file of the current row, header included.
    pub fn file_line(&self) -> usize {
        self.line + 2
    }

    fn cell(&self, col: &str) -> &str {
        let i = self.col_map[col];
        self.rows[self.line].get(i).unwrap_or("")
    }

    /// Get a value of type `T` from column `col` on the current line.
    /// Returns Ok(None) for an empty field and an error if the contents
    /// cannot be parsed as `T`. Panics if the column doesn't exist.
    pub fn try_parse_field<T: FromStr>(&self, col: &str, expected: &str) -> Result<Option<T>> {
        let v = self.cell(col);
        if v.is_empty() {
            return Ok(None);
        }
        match v.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(CsvErrors::InvalidValue {
                filetype: self.filetype.clone(),
                path: self.filename.clone(),
                line: self.file_line(),
                col: col.to_string(),
                expected: expected.to_string(),
                value: v.to_string(),
            }
            .into()),
        }
    }

    /// Get a value of type `T` from column `col` on the current line.
    /// An empty field is an error.
    pub fn parse_field<T: FromStr>(&self, col: &str, expected: &str) -> Result<T> {
        match self.try_parse_field(col, expected)? {
            Some(v) => Ok(v),
            None => Err(self.empty_value(col)),
        }
    }

    /// Get a string from column `col` on the current line.
    /// Returns an error on an empty string, Panics if column doesn't exist
    pub fn require_string(&self, col: &str) -> Result<String> {
        self.try_get_string(col)
            .ok_or_else(|| self.empty_value(col))
    }

    /// Get a string from column `col` on the current line.
    /// Returns "" for an empty string, Panics if column doesn't exist
    pub fn get_string(&self, col: &str) -> String {
        self.try_get_string(col).unwrap_or_default()
    }

    /// Get a string from column `col` on the current line.
    /// Returns None for an empty string, Panics if column doesn't exist
    pub fn try_get_string(&self, col: &str) -> Option<String> {
        let val = self.cell(col);
        if val.is_empty() {
            None
        } else {
            Some(val.to_string())
        }
    }

    fn empty_value(&self, col: &str) -> anyhow::Error {
        CsvErrors::EmptyValue {
            filetype: self.filetype.clone(),
            path: self.filename.clone(),
            line: self.file_line(),
            col: col.to_string(),
        }
        .into()
    }

    fn check_headers(
        file_arg: &Path,
        filetype: &str,
        expected: &[&str],
        headers: &[String],
    ) -> Result<FxHashMap<String, usize>> {
        // leading columns must match exactly; extra trailing columns are fine
        let matches = headers.len() >= expected.len()
            && headers.iter().zip(expected.iter()).all(|(h, e)| h == e);
        if !matches {
            return Err(CsvErrors::UnexpectedHeaders {
                filetype: filetype.to_string(),
                path: file_arg.to_path_buf(),
                expected: expected.join(","),
                found: headers.join(","),
            }
            .into());
        }

        // column name to column index map, first occurrence wins
        let mut result = FxHashMap::default();
        for (i, h) in headers.iter().enumerate() {
            result.entry(h.to_string()).or_insert(i);
        }
        Ok(result)
    }
}

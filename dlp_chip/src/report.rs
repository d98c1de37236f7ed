//! Parsing of the chip scan report exported by the isolation instrument.

use crate::spot::{CellCounts, ChipSpot};
use anyhow::Result;
use itertools::Itertools;
use lims_types::csv_parser::CsvParser;
use log::info;
use std::path::{Path, PathBuf};

const FILETYPE: &str = "chip scan report";

pub const SAMPLE: &str = "Sample";
pub const ROW: &str = "Row";
pub const COLUMN: &str = "Column";
pub const IMG_DIR: &str = "Img_Dir";
pub const FILE_CH1: &str = "File_Ch1";
pub const FILE_CH2: &str = "File_Ch2";
pub const NUM_LIVE: &str = "Num_Live";
pub const NUM_DEAD: &str = "Num_Dead";
pub const REV_LIVE: &str = "Rev_Live";
pub const REV_DEAD: &str = "Rev_Dead";
pub const REV_CLASS: &str = "Rev_Class";
pub const CONDITION: &str = "Condition";
pub const INDEX_I7: &str = "Index_I7";
pub const PRIMER_I7: &str = "Primer_I7";
pub const INDEX_I5: &str = "Index_I5";
pub const PRIMER_I5: &str = "Primer_I5";
pub const PICK_MET: &str = "Pick_Met";
pub const SPOT_WELL: &str = "Spot_Well";

/// The leading columns of every scan report, in order.
pub const SCAN_REPORT_HEADERS: [&str; 18] = [
    SAMPLE, ROW, COLUMN, IMG_DIR, FILE_CH1, FILE_CH2, NUM_LIVE, NUM_DEAD, REV_LIVE, REV_DEAD,
    REV_CLASS, CONDITION, INDEX_I7, PRIMER_I7, INDEX_I5, PRIMER_I5, PICK_MET, SPOT_WELL,
];

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ScanReportErrors {
    #[error(
        "Error in chip scan report file {path:?}. On line {line} in '{col}' column: \
         {value} is not a valid chip coordinate."
    )]
    InvalidCoordinate {
        path: PathBuf,
        line: usize,
        col: String,
        value: f64,
    },

    #[error(
        "Error in chip scan report file {path:?}. On line {line} in '{col}' column: \
         cell counts cannot be negative, received {value}."
    )]
    NegativeCount {
        path: PathBuf,
        line: usize,
        col: String,
        value: f64,
    },
}

/// All spots of one scan report, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    path: PathBuf,
    spots: Vec<ChipSpot>,
}

impl ScanReport {
    /// Read and validate a scan report. Any malformed row rejects the whole file.
    pub fn read(path: &Path) -> Result<Self> {
        let parser = CsvParser::with_exact_headers(path, &SCAN_REPORT_HEADERS, FILETYPE)?;
        let report = Self::from_parser(parser)?;
        info!(
            "read {} spots of {} samples from {}",
            report.len(),
            report.samples().len(),
            path.display()
        );
        Ok(report)
    }

    /// Parse a scan report held in memory. `path` is only used in error messages.
    pub fn parse_str(contents: &str, path: &Path) -> Result<Self> {
        let parser = CsvParser::from_str_exact(contents, path, &SCAN_REPORT_HEADERS, FILETYPE)?;
        Self::from_parser(parser)
    }

    fn from_parser(mut parser: CsvParser) -> Result<Self> {
        parser.require_rows()?;
        let mut spots = Vec::with_capacity(parser.len());
        for line in 0..parser.len() {
            parser.set_line(line);
            spots.push(parse_spot(&parser)?);
        }
        Ok(ScanReport {
            path: parser.filename().to_path_buf(),
            spots,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spots(&self) -> &[ChipSpot] {
        &self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Distinct sample ids, in order of first appearance.
    pub fn samples(&self) -> Vec<&str> {
        self.spots
            .iter()
            .map(|spot| spot.sample_id.as_str())
            .unique()
            .collect()
    }

    /// Spots scanned for `sample_id`, in file order.
    pub fn spots_for<'a>(&'a self, sample_id: &'a str) -> impl Iterator<Item = &'a ChipSpot> + 'a {
        self.spots
            .iter()
            .filter(move |spot| spot.sample_id == sample_id)
    }
}

fn parse_spot(parser: &CsvParser) -> Result<ChipSpot> {
    Ok(ChipSpot {
        sample_id: parser.require_string(SAMPLE)?,
        row: parse_coordinate(parser, ROW)?,
        column: parse_coordinate(parser, COLUMN)?,
        image_dir: parser.get_string(IMG_DIR),
        channel_1_file: parser.get_string(FILE_CH1),
        channel_2_file: parser.get_string(FILE_CH2),
        raw: CellCounts::new(
            parse_count(parser, NUM_LIVE)?,
            parse_count(parser, NUM_DEAD)?,
        ),
        revised: CellCounts::new(
            parse_count(parser, REV_LIVE)?,
            parse_count(parser, REV_DEAD)?,
        ),
        revised_class: parser.get_string(REV_CLASS),
        condition: parser.get_string(CONDITION),
        index_i7: parser.get_string(INDEX_I7),
        primer_i7: parser.get_string(PRIMER_I7),
        index_i5: parser.get_string(INDEX_I5),
        primer_i5: parser.get_string(PRIMER_I5),
        pick_method: parser.get_string(PICK_MET),
        spot_well: parser.get_string(SPOT_WELL),
        line: parser.file_line(),
    })
}

/// Coordinates may be exported as decimals (`3.0`); they are truncated.
fn parse_coordinate(parser: &CsvParser, col: &str) -> Result<u32> {
    let value: f64 = parser.parse_field(col, "number")?;
    if !value.is_finite() || value < 0.0 || value >= f64::from(u32::MAX) {
        return Err(ScanReportErrors::InvalidCoordinate {
            path: parser.filename().to_path_buf(),
            line: parser.file_line(),
            col: col.to_string(),
            value,
        }
        .into());
    }
    Ok(value.trunc() as u32)
}

fn parse_count(parser: &CsvParser, col: &str) -> Result<Option<f64>> {
    match parser.try_parse_field::<f64>(col, "number")? {
        Some(value) if value < 0.0 || value.is_nan() => Err(ScanReportErrors::NegativeCount {
            path: parser.filename().to_path_buf(),
            line: parser.file_line(),
            col: col.to_string(),
            value,
        }
        .into()),
        count => Ok(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_types::csv_parser::CsvErrors;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const HEADER: &str = "Sample,Row,Column,Img_Dir,File_Ch1,File_Ch2,Num_Live,Num_Dead,\
                          Rev_Live,Rev_Dead,Rev_Class,Condition,Index_I7,Primer_I7,Index_I5,\
                          Primer_I5,Pick_Met,Spot_Well";

    fn report(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s.push('\n');
        s
    }

    fn parse(rows: &[&str]) -> Result<ScanReport> {
        ScanReport::parse_str(&report(rows), Path::new("scan.csv"))
    }

    #[test]
    fn test_parse_spots() -> Result<()> {
        let scan = parse(&[
            "SA1,5,10.0,img/,c1.tif,c2.tif,1,0,,,single,A,N701,TAAGGCGA,S502,CTCTCTAT,auto,A1",
            "SA2,3.0,40,img/,c1.tif,c2.tif,0,0,0,1,dead,B,,,,,manual,A2",
            "SA1,40,40,img/,c1.tif,c2.tif,2,0,,,,C,,,,,,",
        ])?;
        assert_eq!(scan.len(), 3);
        assert_eq!(scan.samples(), vec!["SA1", "SA2"]);

        let first = &scan.spots()[0];
        assert_eq!((first.row, first.column), (5, 10));
        assert_eq!(first.raw, CellCounts::new(Some(1.0), Some(0.0)));
        assert_eq!(first.revised, CellCounts::default());
        assert_eq!(first.primer_i7, "TAAGGCGA");
        assert_eq!(first.spot_well, "A1");
        assert_eq!(first.line, 2);

        let second = &scan.spots()[1];
        assert_eq!((second.row, second.column), (3, 40));
        assert_eq!(second.revised, CellCounts::new(Some(0.0), Some(1.0)));

        let rows: Vec<_> = scan.spots_for("SA1").map(|s| s.row).collect();
        assert_eq!(rows, vec![5, 40]);
        assert_eq!(scan.spots_for("SA3").count(), 0);
        Ok(())
    }

    #[test]
    fn test_malformed_count_rejects_file() {
        let err = parse(&[
            "SA1,5,10,,,,1,0,,,,,,,,,,",
            "SA1,6,10,,,,one,0,,,,,,,,,,",
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in chip scan report file \"scan.csv\". On line 3 in 'Num_Live' column: \
             Expected a number but received 'one'"
        );
    }

    #[test]
    fn test_invalid_coordinates() {
        let err = parse(&["SA1,-1,10,,,,1,0,,,,,,,,,,"]).unwrap_err();
        assert!(matches!(
            err.downcast::<ScanReportErrors>().unwrap(),
            ScanReportErrors::InvalidCoordinate { line: 2, .. }
        ));

        let err = parse(&["SA1,5,,,,,1,0,,,,,,,,,,"]).unwrap_err();
        assert!(matches!(
            err.downcast::<CsvErrors>().unwrap(),
            CsvErrors::EmptyValue { .. }
        ));

        let err = parse(&["SA1,5,10,,,,-1,0,,,,,,,,,,"]).unwrap_err();
        assert!(matches!(
            err.downcast::<ScanReportErrors>().unwrap(),
            ScanReportErrors::NegativeCount { .. }
        ));
    }

    #[test]
    fn test_missing_sample_id() {
        let err = parse(&[",5,10,,,,1,0,,,,,,,,,,"]).unwrap_err();
        assert!(matches!(
            err.downcast::<CsvErrors>().unwrap(),
            CsvErrors::EmptyValue { line: 2, .. }
        ));
    }

    #[test]
    fn test_header_validation() {
        let reordered = HEADER.replacen("Row,Column", "Column,Row", 1);
        let err = ScanReport::parse_str(&format!("{reordered}\nSA1,5,10\n"), Path::new("x.csv"))
            .unwrap_err();
        assert!(matches!(
            err.downcast::<CsvErrors>().unwrap(),
            CsvErrors::UnexpectedHeaders { .. }
        ));

        let err = ScanReport::parse_str("", Path::new("x.csv")).unwrap_err();
        assert!(matches!(
            err.downcast::<CsvErrors>().unwrap(),
            CsvErrors::EmptyFile { .. }
        ));

        let err = ScanReport::parse_str(&report(&[]), Path::new("x.csv")).unwrap_err();
        assert!(matches!(
            err.downcast::<CsvErrors>().unwrap(),
            CsvErrors::NoRows { .. }
        ));
    }

    #[test]
    fn test_read_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{}", report(&["SA1,5,10,,,,1,0,,,,,,,,,,B7"]))?;
        let scan = ScanReport::read(file.path())?;
        assert_eq!(scan.path(), file.path());
        assert_eq!(scan.samples(), vec!["SA1"]);
        Ok(())
    }
}

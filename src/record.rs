use super::{Error, Result};
use csv::StringRecord;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Row semantics, selected by the first field of an easyEXPERT csv row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTag {
    /// Sweep kind declaration
    PrimitiveTest,
    /// Named test parameter (key in field 2)
    TestParameter,
    /// Primary axis count
    Dimension1,
    /// Secondary axis count
    Dimension2,
    /// Analysis setup entries, the test title among them
    AnalysisSetup,
    /// Column header row
    DataName,
    /// Data row
    DataValue,
    /// Anything else, ignored
    Other,
}

impl From<&str> for RowTag {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "PrimitiveTest" => RowTag::PrimitiveTest,
            "TestParameter" => RowTag::TestParameter,
            "Dimension1" => RowTag::Dimension1,
            "Dimension2" => RowTag::Dimension2,
            "AnalysisSetup" => RowTag::AnalysisSetup,
            "DataName" => RowTag::DataName,
            "DataValue" => RowTag::DataValue,
            _ => RowTag::Other,
        }
    }
}

/// Interval metadata of one sweep axis as found in the file
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PartialInterval {
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
    pub count: Option<usize>,
}

/// Sweep axis names and their raw interval metadata
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepMeta {
    /// (primary, secondary) axis names
    pub names: Option<(String, String)>,
    pub primary: PartialInterval,
    pub secondary: PartialInterval,
}

/// Flat content of an easyEXPERT csv file
#[derive(Debug, Clone)]
pub struct RawTestRecord {
    pub sweep_kind: String,
    pub title: String,
    pub primary_count: usize,
    pub secondary_count: usize,
    pub column_names: Vec<String>,
    /// One flat column per name, in file row order
    pub columns: Vec<Vec<f64>>,
    pub meta: SweepMeta,
}

impl RawTestRecord {
    /// Returns the flat column `name`
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }
    /// Number of data rows, `primary_count * secondary_count`
    pub fn n_sample(&self) -> usize {
        self.primary_count.saturating_mul(self.secondary_count)
    }
}

/// Interface to easyEXPERT csv exports
pub trait FromEasyExpert: Sized {
    /// Loads from any csv byte stream
    fn from_reader<R: Read>(reader: R) -> Result<Self>;
    /// Loads a csv file
    fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
    /// Loads a gzip compressed csv file
    fn from_gz<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(GzDecoder::new(file))
    }
    /// Loads a csv file, decompressing it first if its extension is `gz`
    fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::from_gz(path),
            _ => Self::from_csv(path),
        }
    }
}

impl FromEasyExpert for RawTestRecord {
    fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut loader = Loader::default();
        for record in rdr.records() {
            loader.row(&record?)?;
        }
        loader.finish()
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    AwaitingDimensions,
    AwaitingHeader,
    ReadingData {
        row: usize,
    },
}

#[derive(Debug, Default)]
struct Loader {
    state: State,
    sweep_kind: String,
    title: String,
    dim1: Option<usize>,
    dim2: Option<usize>,
    column_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    meta: SweepMeta,
}

fn line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

fn field<T: FromStr>(record: &StringRecord, i: usize, name: &'static str) -> Result<T> {
    let value = record.get(i).unwrap_or_default();
    value.parse().map_err(|_| Error::InvalidNumber {
        line: line(record),
        field: name,
        value: value.to_string(),
    })
}

impl Loader {
    fn row(&mut self, record: &StringRecord) -> Result<()> {
        let Some(tag) = record.get(0) else {
            return Ok(());
        };
        match RowTag::from(tag) {
            RowTag::PrimitiveTest => {
                self.sweep_kind = record.get(1).unwrap_or_default().to_string();
            }
            RowTag::TestParameter => self.test_parameter(record)?,
            RowTag::Dimension1 => {
                self.check_dimension(record)?;
                self.dim1 = Some(field(record, 1, "Dimension1")?);
                self.dimensions_known();
            }
            RowTag::Dimension2 => {
                self.check_dimension(record)?;
                self.dim2 = Some(field(record, 1, "Dimension2")?);
                self.dimensions_known();
            }
            RowTag::AnalysisSetup => {
                if record.get(1) == Some("Analysis.Setup.Title") {
                    self.title = record.get(2).unwrap_or_default().to_string();
                }
            }
            RowTag::DataName => self.header(record)?,
            RowTag::DataValue => self.data(record)?,
            RowTag::Other => {}
        }
        Ok(())
    }

    fn test_parameter(&mut self, record: &StringRecord) -> Result<()> {
        let meta = &mut self.meta;
        match record.get(1).unwrap_or_default() {
            "Channel.VName" => {
                meta.names = Some((
                    record.get(2).unwrap_or_default().to_string(),
                    record.get(3).unwrap_or_default().to_string(),
                ));
            }
            "Measurement.Primary.Stop" => {
                meta.primary.stop = Some(field(record, 2, "Measurement.Primary.Stop")?)
            }
            "Measurement.Primary.Count" => {
                meta.primary.count = Some(field(record, 2, "Measurement.Primary.Count")?)
            }
            "Measurement.Primary.Step" => {
                meta.primary.step = Some(field(record, 2, "Measurement.Primary.Step")?)
            }
            "Measurement.Bias.Source" => {
                meta.primary.start = Some(field(record, 2, "Measurement.Bias.Source")?);
                meta.secondary.start = Some(field(record, 3, "Measurement.Bias.Source")?);
            }
            "Measurement.Secondary.Step" => {
                meta.secondary.step = Some(field(record, 2, "Measurement.Secondary.Step")?)
            }
            "Measurement.Secondary.Count" => {
                meta.secondary.count = Some(field(record, 2, "Measurement.Secondary.Count")?)
            }
            _ => {}
        }
        Ok(())
    }

    fn check_dimension(&self, record: &StringRecord) -> Result<()> {
        match self.state {
            State::ReadingData { .. } => Err(Error::DimensionAfterData { line: line(record) }),
            _ => Ok(()),
        }
    }

    fn dimensions_known(&mut self) {
        if self.dim1.is_some() && self.dim2.is_some() {
            self.state = State::AwaitingHeader;
        }
    }

    fn n_sample(&self) -> Result<usize> {
        let (dim1, dim2) = (self.dim1.unwrap_or_default(), self.dim2.unwrap_or_default());
        dim1.checked_mul(dim2).ok_or(Error::DimensionOverflow { dim1, dim2 })
    }

    fn header(&mut self, record: &StringRecord) -> Result<()> {
        let line = line(record);
        match self.state {
            State::AwaitingDimensions => return Err(Error::HeaderBeforeDimensions { line }),
            State::ReadingData { .. } => return Err(Error::DuplicateHeader { line }),
            State::AwaitingHeader => {}
        }
        // rejects overflowing dimensions before any data row is read
        self.n_sample()?;
        for name in record.iter().skip(1) {
            if self.column_names.iter().any(|n| n == name) {
                return Err(Error::DuplicateColumn {
                    line,
                    name: name.to_string(),
                });
            }
            self.column_names.push(name.to_string());
            self.columns.push(Vec::new());
        }
        self.state = State::ReadingData { row: 0 };
        Ok(())
    }

    fn data(&mut self, record: &StringRecord) -> Result<()> {
        let line = line(record);
        let n_sample = self.n_sample()?;
        let State::ReadingData { row } = &mut self.state else {
            return Err(Error::DataBeforeHeader { line });
        };
        if *row >= n_sample {
            return Err(Error::TooManyRows {
                line,
                expected: n_sample,
            });
        }
        let found = record.len().saturating_sub(1);
        if found != self.column_names.len() {
            return Err(Error::RowLength {
                line,
                expected: self.column_names.len(),
                found,
            });
        }
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.push(field(record, i + 1, "DataValue")?);
        }
        *row += 1;
        Ok(())
    }

    fn finish(self) -> Result<RawTestRecord> {
        let primary_count = self.dim1.ok_or(Error::MissingMetadata("Dimension1"))?;
        let secondary_count = self.dim2.ok_or(Error::MissingMetadata("Dimension2"))?;
        let found = match self.state {
            State::ReadingData { row } => row,
            _ => return Err(Error::MissingMetadata("DataName")),
        };
        let expected = primary_count
            .checked_mul(secondary_count)
            .ok_or(Error::DimensionOverflow {
                dim1: primary_count,
                dim2: secondary_count,
            })?;
        if found != expected {
            return Err(Error::MissingRows { expected, found });
        }
        tracing::debug!(
            columns = self.column_names.len(),
            primary_count,
            secondary_count,
            "easyEXPERT csv loaded"
        );
        Ok(RawTestRecord {
            sweep_kind: self.sweep_kind,
            title: self.title,
            primary_count,
            secondary_count,
            column_names: self.column_names,
            columns: self.columns,
            meta: self.meta,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 5 x 3 Rds vs. Vtgs sweep, Vds held per outer loop
    pub(crate) fn sample_csv() -> String {
        let mut csv = String::from(
            "SetupTitle, Rds v Vtgs\n\
             PrimitiveTest, I/V Sweep\n\
             TestParameter, Channel.VName, Vtgs, Vds\n\
             TestParameter, Channel.Unit, SMU1, SMU2\n\
             TestParameter, Measurement.Primary.Stop, 2\n\
             TestParameter, Measurement.Primary.Count, 5\n\
             TestParameter, Measurement.Bias.Source, -2, 0.1\n\
             TestParameter, Measurement.Secondary.Step, 0.1\n\
             TestParameter, Measurement.Secondary.Count, 3\n\
             AnalysisSetup, Analysis.Setup.Title, Rds v Vtgs\n\
             AnalysisSetup, Analysis.Setup.Vector.Graph.Name, Graph1\n\
             Dimension1, 5, 5, 5\n\
             Dimension2, 3, 3, 3\n\
             DataName, Vtgs, Id, Rds\n",
        );
        for j in 0..3 {
            for i in 0..5 {
                let vtgs = -2. + i as f64;
                let id = (j * 5 + i + 1) as f64 * 1e-6;
                csv.push_str(&format!("DataValue, {vtgs}, {id:e}, {}\n", 1. / id));
            }
        }
        csv
    }

    #[test]
    fn row_tags() {
        assert_eq!(RowTag::from(" DataValue "), RowTag::DataValue);
        assert_eq!(RowTag::from("Dimension2"), RowTag::Dimension2);
        assert_eq!(RowTag::from("SetupTitle"), RowTag::Other);
    }

    #[test]
    fn load_sample() {
        let record = RawTestRecord::from_reader(sample_csv().as_bytes()).unwrap();
        assert_eq!(record.sweep_kind, "I/V Sweep");
        assert_eq!(record.title, "Rds v Vtgs");
        assert_eq!((record.primary_count, record.secondary_count), (5, 3));
        assert_eq!(record.column_names, vec!["Vtgs", "Id", "Rds"]);
        assert!(record.columns.iter().all(|c| c.len() == record.n_sample()));
        assert_eq!(record.column("Vtgs").unwrap()[..5], [-2., -1., 0., 1., 2.]);
        assert_eq!(record.column("Id").unwrap()[14], 15. * 1e-6);

        let meta = &record.meta;
        assert_eq!(meta.names, Some(("Vtgs".to_string(), "Vds".to_string())));
        assert_eq!(meta.primary.start, Some(-2.));
        assert_eq!(meta.primary.stop, Some(2.));
        assert_eq!(meta.primary.count, Some(5));
        assert_eq!(meta.primary.step, None);
        assert_eq!(meta.secondary.start, Some(0.1));
        assert_eq!(meta.secondary.step, Some(0.1));
        assert_eq!(meta.secondary.count, Some(3));
    }

    #[test]
    fn malformed_number() {
        let csv = sample_csv().replacen("DataValue, -2,", "DataValue, -2V,", 1);
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidNumber { field: "DataValue", .. }));
    }

    #[test]
    fn header_before_dimensions() {
        let csv = "Dimension1, 2\nDataName, Vds, Id\nDimension2, 1\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::HeaderBeforeDimensions { line: 2 }));
    }

    #[test]
    fn data_before_header() {
        let csv = "Dimension1, 2\nDimension2, 1\nDataValue, 0, 1\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::DataBeforeHeader { line: 3 }));
    }

    #[test]
    fn dimension_after_data() {
        let csv = "Dimension1, 2\nDimension2, 1\nDataName, Vds\nDataValue, 0\nDimension1, 3\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::DimensionAfterData { line: 5 }));
    }

    #[test]
    fn row_count_mismatch() {
        let csv = "Dimension1, 2\nDimension2, 1\nDataName, Vds\nDataValue, 0\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRows {
                expected: 2,
                found: 1
            }
        ));

        let csv = "Dimension1, 1\nDimension2, 1\nDataName, Vds\nDataValue, 0\nDataValue, 1\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::TooManyRows { expected: 1, .. }));
    }

    #[test]
    fn undeclared_column() {
        let csv = "Dimension1, 1\nDimension2, 1\nDataName, Vds\nDataValue, 0, 1\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::RowLength {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn overflowing_dimensions() {
        let csv = "Dimension1,4611686018427387904\nDimension2,4\nDataName,Vds\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionOverflow {
                dim1: 4611686018427387904,
                dim2: 4
            }
        ));
    }

    #[test]
    fn huge_dimensions_without_data() {
        let csv = "Dimension1, 4294967296\nDimension2, 1\nDataName, Vds, Id\nDataValue, 0, 1\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRows {
                expected: 4294967296,
                found: 1
            }
        ));
    }

    #[test]
    fn duplicate_column() {
        let csv = "Dimension1, 1\nDimension2, 1\nDataName, Vds, Vds\n";
        let err = RawTestRecord::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { .. }));
    }
}

mod record;
pub use record::{FromEasyExpert, PartialInterval, RawTestRecord, RowTag, SweepMeta};
mod interval;
pub use interval::{reconstruct, AxisInterval};
mod grid;
pub use grid::{shape, ShapedGrid, SweepTest};
mod slice;
pub use slice::{drop_zeros, slice_bounds, window, zero_lines, Axis, Domain};
mod device;
pub use device::{
    ChannelDims, DataFile, Device, DeviceInfo, DeviceTable, FileCode, Gate, TestKind, DEVICES_ENV,
    UNKNOWN,
};
mod bank;
pub use bank::{DataBank, DataInfo, DataSet, NamePreset, Window};
mod export;
pub use export::{ExportedGrid, GridExport};
mod logging;
pub use logging::init_logging;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read file")]
    Read(#[from] std::io::Error),
    #[error("failed to read csv data")]
    CSV(#[from] csv::Error),
    #[error("failed to parse device table")]
    Json(#[from] serde_json::Error),
    #[error("failed to (de)serialize bincode export")]
    Bincode(#[from] bincode::Error),
    #[error("failed to write pickle export")]
    Pickle(#[from] serde_pickle::Error),

    // parsing
    #[error("line {line}: invalid number {value:?} in {field}")]
    InvalidNumber {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: column header row before both dimension counts")]
    HeaderBeforeDimensions { line: u64 },
    #[error("line {line}: data row before the column header row")]
    DataBeforeHeader { line: u64 },
    #[error("line {line}: dimension count declared after data rows")]
    DimensionAfterData { line: u64 },
    #[error("line {line}: second column header row")]
    DuplicateHeader { line: u64 },
    #[error("line {line}: column {name:?} declared twice")]
    DuplicateColumn { line: u64, name: String },
    #[error("line {line}: expected {expected} values, found {found}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: more data rows than the declared {expected}")]
    TooManyRows { line: u64, expected: usize },
    #[error("expected {expected} data rows, found {found}")]
    MissingRows { expected: usize, found: usize },
    #[error("dimension counts {dim1} x {dim2} overflow the sample count")]
    DimensionOverflow { dim1: usize, dim2: usize },
    #[error("missing {0} in file metadata")]
    MissingMetadata(&'static str),

    // configuration
    #[error("primary axis count must be at least 2, found {0}")]
    DegeneratePrimaryAxis(usize),
    #[error("axis {0:?} has a zero step")]
    ZeroStep(String),
    #[error("axis {name:?} would sample {found:e} values, at most {limit} are supported")]
    TooManySamples {
        name: String,
        found: f64,
        limit: usize,
    },
    #[error("expected exactly one sweep axis missing from the columns, found {0}")]
    MissingAxis(usize),
    #[error("axis {name:?} has {found} values, the file declares {expected}")]
    IntervalTooShort {
        name: String,
        expected: usize,
        found: usize,
    },

    // usage
    #[error("invalid axis {0:?}, pick 'x'/0 or 'y'/1")]
    InvalidAxis(String),
    #[error("grid shape {found:?} does not match {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("column {0:?} already exists")]
    ColumnExists(String),
    #[error("header index {index} out of bounds for {len} headers")]
    HeaderIndex { index: usize, len: usize },
    #[error("data set {0:?} does not share the bank's gate and test kind")]
    IncompatibleSet(String),
    #[error("data bank is empty")]
    EmptyBank,
}

pub type Result<T> = std::result::Result<T, Error>;

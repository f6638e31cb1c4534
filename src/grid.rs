use super::{
    reconstruct, slice_bounds, Axis, AxisInterval, Error, FromEasyExpert, RawTestRecord, Result,
};
use nalgebra::DMatrix;
use std::io::Read;

/// Every column of a test as a (secondary, primary) indexed grid
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGrid {
    shape: (usize, usize),
    headers: Vec<String>,
    grids: Vec<DMatrix<f64>>,
}

impl ShapedGrid {
    /// Returns the (rows, columns) shape shared by all the grids
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
    pub fn len(&self) -> usize {
        self.headers.len()
    }
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.headers.len() {
            Ok(())
        } else {
            Err(Error::HeaderIndex {
                index,
                len: self.headers.len(),
            })
        }
    }
    pub fn header(&self, index: usize) -> Result<&str> {
        self.check_index(index)?;
        Ok(&self.headers[index])
    }
    pub fn data(&self, index: usize) -> Result<&DMatrix<f64>> {
        self.check_index(index)?;
        Ok(&self.grids[index])
    }
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
    pub fn get(&self, name: &str) -> Option<&DMatrix<f64>> {
        self.position(name).map(|i| &self.grids[i])
    }
    /// Iterates over (header, grid) pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DMatrix<f64>)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.grids.iter())
    }
    /// Appends a derived grid
    ///
    /// The grid must have the common shape and `name` must be new; otherwise
    /// the grid is rejected and nothing changes.
    pub fn push<S: Into<String>>(&mut self, name: S, grid: DMatrix<f64>) -> Result<()> {
        let name = name.into();
        if grid.shape() != self.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape,
                found: grid.shape(),
            });
        }
        if self.position(&name).is_some() {
            return Err(Error::ColumnExists(name));
        }
        self.headers.push(name);
        self.grids.push(grid);
        Ok(())
    }
}

/// Reshapes the flat columns of `record` into grids
///
/// Rows follow the secondary (outer loop) axis and columns the primary
/// (inner loop) axis. The one sweep axis the file does not echo back as a
/// column is synthesized from its interval and inserted so that the first
/// two headers are always (primary, secondary).
pub fn shape(
    record: RawTestRecord,
    primary: &AxisInterval,
    secondary: &AxisInterval,
) -> Result<ShapedGrid> {
    let (nrows, ncols) = (record.secondary_count, record.primary_count);
    let mut grids = record
        .columns
        .iter()
        .map(|column| {
            if column.len() == nrows * ncols {
                Ok(DMatrix::from_row_slice(nrows, ncols, column))
            } else {
                Err(Error::MissingRows {
                    expected: nrows * ncols,
                    found: column.len(),
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let mut headers = record.column_names;

    let is_missing = |axis: &AxisInterval| !headers.contains(&axis.name);
    match (is_missing(primary), is_missing(secondary)) {
        (false, true) => {
            let values = leading(secondary, nrows)?;
            move_column(&mut headers, &mut grids, &primary.name, 0);
            headers.insert(1, secondary.name.clone());
            grids.insert(1, DMatrix::from_fn(nrows, ncols, |i, _| values[i]));
        }
        (true, false) => {
            let values = leading(primary, ncols)?;
            move_column(&mut headers, &mut grids, &secondary.name, 0);
            headers.insert(0, primary.name.clone());
            grids.insert(0, DMatrix::from_fn(nrows, ncols, |_, j| values[j]));
        }
        (true, true) => return Err(Error::MissingAxis(2)),
        (false, false) => return Err(Error::MissingAxis(0)),
    }

    Ok(ShapedGrid {
        shape: (nrows, ncols),
        headers,
        grids,
    })
}

/// Moves the column `name` to header position `index`
fn move_column(
    headers: &mut Vec<String>,
    grids: &mut Vec<DMatrix<f64>>,
    name: &str,
    index: usize,
) {
    if let Some(from) = headers.iter().position(|h| h == name) {
        let header = headers.remove(from);
        headers.insert(index, header);
        let grid = grids.remove(from);
        grids.insert(index, grid);
    }
}

/// The first `count` values of `axis`
fn leading(axis: &AxisInterval, count: usize) -> Result<&[f64]> {
    axis.values
        .get(..count)
        .ok_or_else(|| Error::IntervalTooShort {
            name: axis.name.clone(),
            expected: count,
            found: axis.values.len(),
        })
}

/// A loaded easyEXPERT sweep test
#[derive(Debug, Clone)]
pub struct SweepTest {
    pub sweep_kind: String,
    pub title: String,
    pub primary: AxisInterval,
    pub secondary: AxisInterval,
    pub grid: ShapedGrid,
}

impl FromEasyExpert for SweepTest {
    fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_record(RawTestRecord::from_reader(reader)?)
    }
}

impl SweepTest {
    /// Reconstructs the sweep intervals and shapes the record data
    pub fn from_record(record: RawTestRecord) -> Result<Self> {
        let (primary, secondary) = reconstruct(&record.meta)?;
        let sweep_kind = record.sweep_kind.clone();
        let title = record.title.clone();
        let grid = shape(record, &primary, &secondary)?;
        tracing::debug!(title = %title, shape = ?grid.shape(), "sweep test shaped");
        Ok(Self {
            sweep_kind,
            title,
            primary,
            secondary,
            grid,
        })
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn sweep_kind(&self) -> &str {
        &self.sweep_kind
    }
    pub fn headers(&self) -> &[String] {
        self.grid.headers()
    }
    pub fn header(&self, index: usize) -> Result<&str> {
        self.grid.header(index)
    }
    pub fn data(&self, index: usize) -> Result<&DMatrix<f64>> {
        self.grid.data(index)
    }
    pub fn data_by_name(&self, name: &str) -> Option<&DMatrix<f64>> {
        self.grid.get(name)
    }
    /// Returns the (primary, secondary) counts
    pub fn dims(&self) -> (usize, usize) {
        let (nrows, ncols) = self.grid.shape();
        (ncols, nrows)
    }
    pub fn interval(&self, axis: Axis) -> &AxisInterval {
        match axis {
            Axis::X => &self.primary,
            Axis::Y => &self.secondary,
        }
    }
    /// Returns the interval named after header `index`, if that header is a sweep axis
    pub fn interval_by_header(&self, index: usize) -> Result<Option<&AxisInterval>> {
        let name = self.header(index)?;
        Ok([&self.primary, &self.secondary]
            .into_iter()
            .find(|axis| axis.name == name))
    }
    /// Both rectangular grid components of the sweep intervals
    ///
    /// The primary values vary along the columns of the first grid and the
    /// secondary values along the rows of the second one.
    pub fn meshgrid(&self) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        let (nrows, ncols) = self.grid.shape();
        let x = leading(&self.primary, ncols)?;
        let y = leading(&self.secondary, nrows)?;
        Ok((
            DMatrix::from_fn(nrows, ncols, |_, j| x[j]),
            DMatrix::from_fn(nrows, ncols, |i, _| y[i]),
        ))
    }
    /// Index bounds restricting `axis` to the `domain` [low, high]
    pub fn slice_bounds(&self, axis: Axis, domain: (f64, f64)) -> Result<(usize, usize)> {
        let grid = match axis {
            Axis::X => self.data(0)?,
            Axis::Y => self.data(1)?,
        };
        Ok(slice_bounds(axis, grid, domain.0, domain.1))
    }
    /// Appends a derived grid, see [ShapedGrid::push]
    pub fn add_new_data<S: Into<String>>(&mut self, name: S, grid: DMatrix<f64>) -> Result<()> {
        self.grid.push(name, grid)
    }
}

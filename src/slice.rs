use super::{Error, Result};
use nalgebra::DMatrix;
use std::str::FromStr;

/// Sweep axis selector
///
/// `X` is the primary axis, varying along the grid columns; `Y` is the
/// secondary axis, varying along the grid rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "x" | "X" | "0" => Ok(Axis::X),
            "y" | "Y" | "1" => Ok(Axis::Y),
            other => Err(Error::InvalidAxis(other.to_string())),
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            other => Err(Error::InvalidAxis(other.to_string())),
        }
    }
}

/// Half-open index bounds `[lo, hi)` selecting the values of `axis` within [low, high]
///
/// The primary axis is searched along the first row of `grid`, the secondary
/// axis along its first column. That row (or column) must be sorted in
/// ascending order.
pub fn slice_bounds(axis: Axis, grid: &DMatrix<f64>, low: f64, high: f64) -> (usize, usize) {
    if grid.is_empty() {
        return (0, 0);
    }
    let values: Vec<f64> = match axis {
        Axis::X => grid.row(0).iter().copied().collect(),
        Axis::Y => grid.column(0).iter().copied().collect(),
    };
    (
        values.partition_point(|&v| v < low),
        values.partition_point(|&v| v <= high),
    )
}

/// The `rows` x `cols` window of `grid`
pub fn window(grid: &DMatrix<f64>, rows: (usize, usize), cols: (usize, usize)) -> DMatrix<f64> {
    let r0 = rows.0.min(grid.nrows());
    let c0 = cols.0.min(grid.ncols());
    let nrows = rows.1.min(grid.nrows()).saturating_sub(r0);
    let ncols = cols.1.min(grid.ncols()).saturating_sub(c0);
    grid.slice((r0, c0), (nrows, ncols)).clone_owned()
}

/// Domain restriction of both sweep axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            x: (f64::NEG_INFINITY, f64::INFINITY),
            y: (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}

impl Domain {
    pub fn get(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
    pub fn set(&mut self, axis: Axis, low: f64, high: f64) {
        match axis {
            Axis::X => self.x = (low, high),
            Axis::Y => self.y = (low, high),
        }
    }
    pub fn reset(&mut self) {
        *self = Default::default();
    }
    /// Returns the (rows, cols) bounds of the domain given the sweep axes grids
    pub fn bounds(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> ((usize, usize), (usize, usize)) {
        let cols = slice_bounds(Axis::X, x, self.x.0, self.x.1);
        let rows = slice_bounds(Axis::Y, y, self.y.0, self.y.1);
        (rows, cols)
    }
}

/// Indices of the (rows, columns) of `reference` whose values are all within `tolerance` of zero
///
/// The default tolerance is the smallest absolute value of `reference` plus
/// its variance.
pub fn zero_lines(reference: &DMatrix<f64>, tolerance: Option<f64>) -> (Vec<usize>, Vec<usize>) {
    if reference.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let tolerance = tolerance.unwrap_or_else(|| reference.amin() + reference.variance());
    let is_zero = |v: &f64| v.abs() <= tolerance;
    let rows: Vec<usize> = (0..reference.nrows())
        .filter(|&i| reference.row(i).iter().all(is_zero))
        .collect();
    let cols: Vec<usize> = (0..reference.ncols())
        .filter(|&j| reference.column(j).iter().all(is_zero))
        .collect();
    if !rows.is_empty() || !cols.is_empty() {
        tracing::debug!(?rows, ?cols, tolerance, "zero lines");
    }
    (rows, cols)
}

/// Removes the rows and columns that are all zeros in the first grid from every grid
pub fn drop_zeros(grids: Vec<DMatrix<f64>>, tolerance: Option<f64>) -> Result<Vec<DMatrix<f64>>> {
    let Some(reference) = grids.first() else {
        return Ok(grids);
    };
    if let Some(grid) = grids.iter().find(|g| g.shape() != reference.shape()) {
        return Err(Error::ShapeMismatch {
            expected: reference.shape(),
            found: grid.shape(),
        });
    }
    let (rows, cols) = zero_lines(reference, tolerance);
    Ok(grids
        .into_iter()
        .map(|grid| grid.remove_rows_at(&rows).remove_columns_at(&cols))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_grid() -> DMatrix<f64> {
        DMatrix::from_fn(3, 11, |_, j| j as f64 - 5.)
    }

    #[test]
    fn axis_selectors() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("1".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!(Axis::try_from(0).unwrap(), Axis::X);
        assert!(matches!("z".parse::<Axis>(), Err(Error::InvalidAxis(_))));
        assert!(Axis::try_from(2).is_err());
    }

    #[test]
    fn half_open_bounds() {
        let x = x_grid();
        let (lo, hi) = slice_bounds(Axis::X, &x, -2., 2.);
        let selected: Vec<f64> = x.row(0).iter().skip(lo).take(hi - lo).copied().collect();
        assert_eq!(selected, vec![-2., -1., 0., 1., 2.]);
    }

    #[test]
    fn bounds_between_samples() {
        let x = x_grid();
        assert_eq!(slice_bounds(Axis::X, &x, -2.5, 1.5), (3, 7));
        assert_eq!(slice_bounds(Axis::X, &x, f64::NEG_INFINITY, f64::INFINITY), (0, 11));
        assert_eq!(slice_bounds(Axis::X, &x, 10., 20.), (11, 11));
    }

    #[test]
    fn secondary_bounds() {
        let y = DMatrix::from_fn(4, 2, |i, _| i as f64 * 0.5);
        assert_eq!(slice_bounds(Axis::Y, &y, 0.5, 1.), (1, 3));
    }

    #[test]
    fn windowing() {
        let x = x_grid();
        let w = window(&x, (1, 3), (3, 8));
        assert_eq!(w.shape(), (2, 5));
        assert_eq!(w[(0, 0)], -2.);
        assert_eq!(window(&x, (2, 1), (0, 11)).shape(), (0, 11));
    }

    #[test]
    fn domain() {
        let mut domain = Domain::default();
        domain.set(Axis::X, -1., 1.);
        assert_eq!(domain.get(Axis::X), (-1., 1.));
        let y = DMatrix::from_fn(3, 11, |i, _| i as f64);
        assert_eq!(domain.bounds(&x_grid(), &y), ((0, 3), (4, 7)));
        domain.reset();
        assert_eq!(domain, Domain::default());
    }

    #[test]
    fn zeros_dropped() {
        let divisor = DMatrix::from_row_slice(3, 3, &[0., 0., 0., 0., 2., 3., 0., 4., 5.]);
        let other = DMatrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let dropped = drop_zeros(vec![divisor, other], Some(0.)).unwrap();
        assert_eq!(dropped[0], DMatrix::from_row_slice(2, 2, &[2., 3., 4., 5.]));
        assert_eq!(dropped[1], DMatrix::from_row_slice(2, 2, &[4., 5., 7., 8.]));
    }

    #[test]
    fn default_tolerance() {
        // tolerance = 0.001 + 0.00245025
        let divisor = DMatrix::from_row_slice(2, 2, &[0.001, 0.1, 0.001, 0.1]);
        let dropped = drop_zeros(vec![divisor], None).unwrap();
        assert_eq!(dropped[0].shape(), (2, 1));
    }

    #[test]
    fn mismatched_shapes() {
        let err = drop_zeros(vec![DMatrix::zeros(2, 2), DMatrix::zeros(2, 3)], None).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}

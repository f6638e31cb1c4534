use super::{Result, SweepTest};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A grid as a list of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedGrid {
    pub name: String,
    pub rows: Vec<Vec<f64>>,
}

/// Serializable form of a shaped sweep test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridExport {
    pub title: String,
    pub sweep_kind: String,
    /// (primary, secondary) axis names
    pub axes: (String, String),
    /// (rows, columns)
    pub shape: (usize, usize),
    pub grids: Vec<ExportedGrid>,
}

impl From<&SweepTest> for GridExport {
    fn from(test: &SweepTest) -> Self {
        let grids = test
            .grid
            .iter()
            .map(|(name, grid)| ExportedGrid {
                name: name.to_string(),
                rows: grid
                    .row_iter()
                    .map(|row| row.iter().copied().collect())
                    .collect(),
            })
            .collect();
        Self {
            title: test.title.clone(),
            sweep_kind: test.sweep_kind.clone(),
            axes: (test.primary.name.clone(), test.secondary.name.clone()),
            shape: test.grid.shape(),
            grids,
        }
    }
}

impl GridExport {
    pub fn headers(&self) -> Vec<&str> {
        self.grids.iter().map(|grid| grid.name.as_str()).collect()
    }
    /// Writes the export in the bincode format
    pub fn to_bincode<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        bincode::serialize_into(&mut BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }
    /// Reads an export in the bincode format
    pub fn from_bincode<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(bincode::deserialize_from(BufReader::new(File::open(path)?))?)
    }
    /// Writes the export as a Python pickle
    pub fn to_pickle<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serde_pickle::to_writer(
            &mut BufWriter::new(File::create(path)?),
            self,
            Default::default(),
        )?;
        Ok(())
    }
}

use super::{
    window, zero_lines, Axis, DataFile, DeviceInfo, DeviceTable, Domain, Error, FileCode,
    FromEasyExpert, Gate, Result, SweepTest, TestKind,
};
use nalgebra::DMatrix;

/// Descriptive metadata of a data set
#[derive(Debug, Clone, PartialEq)]
pub struct DataInfo {
    /// Name used in titles and legends, the file code by default
    pub data_name: String,
    /// Test title from the csv file
    pub test_title: String,
    pub file_code: String,
    pub kind: Option<TestKind>,
    pub gate: Option<Gate>,
    pub device: DeviceInfo,
    /// (x, y, z) units
    pub units: [&'static str; 3],
    pub misc: Option<String>,
}

impl DataInfo {
    pub fn new(file: &DataFile, test_title: &str, devices: &DeviceTable) -> Self {
        let code = FileCode::parse(&file.code);
        Self {
            data_name: file.code.clone(),
            test_title: test_title.to_string(),
            file_code: file.code.clone(),
            kind: code.kind,
            gate: code.gate,
            device: devices.lookup(code.device),
            units: code.kind.map_or([""; 3], |kind| kind.units()),
            misc: file.misc.clone(),
        }
    }
}

/// A loaded test with its metadata
#[derive(Debug, Clone)]
pub struct DataSet {
    pub test: SweepTest,
    pub info: DataInfo,
    /// Position of the set in its caller's sequence, drives style cycling
    pub sequence: usize,
}

impl DataSet {
    /// Loads the test file and attaches its device metadata
    pub fn new(file: &DataFile, devices: &DeviceTable, sequence: usize) -> Result<Self> {
        let test = SweepTest::from_path(&file.path)?;
        Ok(Self::from_test(test, file, devices, sequence))
    }
    pub fn from_test(
        test: SweepTest,
        file: &DataFile,
        devices: &DeviceTable,
        sequence: usize,
    ) -> Self {
        let info = DataInfo::new(file, test.title(), devices);
        Self {
            test,
            info,
            sequence,
        }
    }
    pub fn name(&self) -> &str {
        &self.info.data_name
    }
}

/// Domain restricted (x, y, z) grids of a data set
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub name: String,
    pub sequence: usize,
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
    pub z: DMatrix<f64>,
}

/// Data set naming presets
#[derive(Debug, Clone, PartialEq)]
pub enum NamePreset {
    Area,
    Dims,
    Gate,
    DeviceModel,
    DeviceNumber,
    FileCode,
    TestKind,
    Misc,
    Literal(String),
}

impl NamePreset {
    fn name(&self, info: &DataInfo) -> String {
        let dims = &info.device.dims;
        match self {
            NamePreset::Area => format!("{} µm²", dims.area_label()),
            NamePreset::Dims => {
                format!("{} µm × {} µm", dims.length_label(), dims.width_label())
            }
            NamePreset::Gate => match info.gate {
                Some(gate) => format!("{gate} gate"),
                None => "unknown gate".to_string(),
            },
            NamePreset::DeviceModel => info.device.model.clone(),
            NamePreset::DeviceNumber => match info.device.number {
                Some(number) => format!("Device #{number}"),
                None => "Device #unknown".to_string(),
            },
            NamePreset::FileCode => info.file_code.clone(),
            NamePreset::TestKind => info
                .kind
                .map_or_else(|| "unknown".to_string(), |kind| kind.to_string()),
            NamePreset::Misc => info.misc.clone().unwrap_or_default(),
            NamePreset::Literal(name) => name.clone(),
        }
    }
}

/// Collection of data sets sharing gate and test kind
#[derive(Debug, Default)]
pub struct DataBank {
    sets: Vec<DataSet>,
    info: Option<DataInfo>,
    domain: Domain,
    next_sequence: usize,
    /// Accepts sets of any gate and test kind
    pub allow_mixed: bool,
}

impl DataBank {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn sets(&self) -> &[DataSet] {
        &self.sets
    }
    pub fn len(&self) -> usize {
        self.sets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
    /// Bank metadata, copied from the first set
    pub fn info(&self) -> Option<&DataInfo> {
        self.info.as_ref()
    }
    /// Appends a data set
    ///
    /// The first set defines the bank gate and test kind; later sets must
    /// match them unless `allow_mixed` is set.
    pub fn append(&mut self, set: DataSet) -> Result<()> {
        match &self.info {
            None => self.info = Some(set.info.clone()),
            Some(info) => {
                if !self.allow_mixed && (info.gate != set.info.gate || info.kind != set.info.kind) {
                    return Err(Error::IncompatibleSet(set.info.data_name));
                }
            }
        }
        self.next_sequence = self.next_sequence.max(set.sequence + 1);
        self.sets.push(set);
        Ok(())
    }
    /// Loads `file` and appends it with the next sequence position
    pub fn load(&mut self, file: &DataFile, devices: &DeviceTable) -> Result<()> {
        let set = DataSet::new(file, devices, self.next_sequence)?;
        self.append(set)
    }
    /// Removes the set at `index`; the bank info resets once the bank is empty
    pub fn pop(&mut self, index: usize) -> Option<DataSet> {
        if index >= self.sets.len() {
            return None;
        }
        let set = self.sets.remove(index);
        if self.sets.is_empty() {
            self.info = None;
        }
        Some(set)
    }
    pub fn domain(&self) -> &Domain {
        &self.domain
    }
    /// Restricts `axis` ("x"/"0" or "y"/"1") to [low, high]
    pub fn set_domain(&mut self, axis: &str, low: f64, high: f64) -> Result<()> {
        let axis: Axis = axis.parse()?;
        self.domain.set(axis, low, high);
        Ok(())
    }
    pub fn reset_domain(&mut self) {
        self.domain.reset();
    }
    pub fn name(&self) -> Option<&str> {
        self.info.as_ref().map(|info| info.data_name.as_str())
    }
    pub fn set_name<S: Into<String>>(&mut self, name: S) -> Result<()> {
        let info = self.info.as_mut().ok_or(Error::EmptyBank)?;
        info.data_name = name.into();
        Ok(())
    }
    /// Renames every data set after `preset`
    pub fn set_names(&mut self, preset: &NamePreset) {
        for set in self.sets.iter_mut() {
            set.info.data_name = preset.name(&set.info);
        }
    }
    pub fn names(&self) -> Vec<&str> {
        self.sets.iter().map(DataSet::name).collect()
    }
    /// The (x, y, header `z_index`) grids of every set, restricted to the bank domain
    pub fn windows(&self, z_index: usize) -> Result<Vec<Window>> {
        self.sets
            .iter()
            .map(|set| {
                let (x, y, z) = (set.test.data(0)?, set.test.data(1)?, set.test.data(z_index)?);
                let (rows, cols) = self.domain.bounds(x, y);
                Ok(Window {
                    name: set.info.data_name.clone(),
                    sequence: set.sequence,
                    x: window(x, rows, cols),
                    y: window(y, rows, cols),
                    z: window(z, rows, cols),
                })
            })
            .collect()
    }
    /// Same as [DataBank::windows] but with z divided by the `div_index` grid of `divisor`
    ///
    /// Sets with dimensions other than the divisor's are skipped. With
    /// `drop_zeros`, the rows and columns that are all zeros in the divisor are
    /// removed before the domain restriction.
    pub fn ratio_windows(
        &self,
        divisor: &DataSet,
        div_index: usize,
        drop_zeros: bool,
        tolerance: Option<f64>,
        z_index: usize,
    ) -> Result<Vec<Window>> {
        let zdiv = divisor.test.data(div_index)?;
        let (zero_rows, zero_cols) = if drop_zeros {
            zero_lines(zdiv, tolerance)
        } else {
            Default::default()
        };
        let drop = |grid: &DMatrix<f64>| {
            grid.clone()
                .remove_rows_at(&zero_rows)
                .remove_columns_at(&zero_cols)
        };
        let zdiv = drop(zdiv);

        let mut windows = Vec::with_capacity(self.sets.len());
        for (i, set) in self.sets.iter().enumerate() {
            if set.test.dims() != divisor.test.dims() {
                tracing::warn!(
                    set = i,
                    dims = ?set.test.dims(),
                    divisor = ?divisor.test.dims(),
                    "skipping data set with dimensions other than the divisor's"
                );
                continue;
            }
            let x = drop(set.test.data(0)?);
            let y = drop(set.test.data(1)?);
            let z = drop(set.test.data(z_index)?);
            let (rows, cols) = self.domain.bounds(&x, &y);
            windows.push(Window {
                name: set.info.data_name.clone(),
                sequence: set.sequence,
                x: window(&x, rows, cols),
                y: window(&y, rows, cols),
                z: window(&z, rows, cols).component_div(&window(&zdiv, rows, cols)),
            });
        }
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_csv;
    use crate::Device;

    fn devices() -> DeviceTable {
        DeviceTable::new(vec![Device {
            number: 7,
            length: 50.,
            width: 50.,
            area: 2500.,
            model: "P25243".to_string(),
        }])
    }

    fn set(code: &str, sequence: usize) -> DataSet {
        let test = SweepTest::from_reader(sample_csv().as_bytes()).unwrap();
        DataSet::from_test(test, &DataFile::new(code, "sample.csv"), &devices(), sequence)
    }

    #[test]
    fn info_from_code() {
        let set = set("Rt7", 0);
        assert_eq!(set.info.kind, Some(TestKind::Resistance));
        assert_eq!(set.info.gate, Some(Gate::Top));
        assert_eq!(set.info.device.model, "P25243");
        assert_eq!(set.info.units, ["V", "V", "Ω"]);
        assert_eq!(set.info.test_title, "Rds v Vtgs");
        assert_eq!(set.name(), "Rt7");
    }

    #[test]
    fn unknown_device_does_not_fail() {
        let set = set("It4", 0);
        assert_eq!(set.info.device.dims.area_label(), "unknown");
        assert_eq!(set.info.device.number, None);
    }

    #[test]
    fn compatible_sets() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        bank.append(set("Rt4", 1)).unwrap();
        let err = bank.append(set("Rb7", 2)).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSet(_)));
        assert_eq!(bank.len(), 2);

        bank.allow_mixed = true;
        bank.append(set("It7", 3)).unwrap();
        assert_eq!(bank.names(), vec!["Rt7", "Rt4", "It7"]);
    }

    #[test]
    fn pop_resets_info() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        assert!(bank.pop(3).is_none());
        assert_eq!(bank.pop(0).unwrap().name(), "Rt7");
        assert!(bank.info().is_none());
        assert!(matches!(bank.set_name("bank"), Err(Error::EmptyBank)));
    }

    #[test]
    fn invalid_domain_axis() {
        let mut bank = DataBank::new();
        bank.set_domain("x", -1., 1.).unwrap();
        let err = bank.set_domain("z", 0., 1.).unwrap_err();
        assert!(matches!(err, Error::InvalidAxis(_)));
        assert_eq!(bank.domain().x, (-1., 1.));
        assert_eq!(bank.domain().y, Domain::default().y);
    }

    #[test]
    fn restricted_windows() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        bank.set_domain("x", -1., 1.).unwrap();
        bank.set_domain("y", 0.15, 1.).unwrap();
        let windows = bank.windows(3).unwrap();
        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!(w.z.shape(), (2, 3));
        assert_eq!(w.x.row(0).iter().copied().collect::<Vec<_>>(), vec![-1., 0., 1.]);
        assert_eq!(w.z, window(bank.sets()[0].test.data(3).unwrap(), (1, 3), (1, 4)));

        bank.reset_domain();
        assert_eq!(bank.windows(3).unwrap()[0].z.shape(), (3, 5));
        assert!(bank.windows(9).is_err());
    }

    #[test]
    fn ratio_of_identical_sets() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        let divisor = set("Rt7", 1);
        let windows = bank.ratio_windows(&divisor, 3, true, Some(0.), 3).unwrap();
        assert_eq!(windows[0].z.shape(), (3, 5));
        assert!(windows[0].z.iter().all(|&r| (r - 1.).abs() < 1e-12));
    }

    #[test]
    fn ratio_skips_mismatched_dims() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        let mut divisor = set("Rt7", 1);
        divisor.test = SweepTest::from_reader(
            sample_csv()
                .replace("Dimension2, 3, 3, 3", "Dimension2, 2, 2, 2")
                .replace("Measurement.Secondary.Count, 3", "Measurement.Secondary.Count, 2")
                .lines()
                .take(24)
                .collect::<Vec<_>>()
                .join("\n")
                .as_bytes(),
        )
        .unwrap();
        assert!(bank.ratio_windows(&divisor, 2, false, None, 2).unwrap().is_empty());
    }

    #[test]
    fn name_presets() {
        let mut bank = DataBank::new();
        bank.append(set("Rt7", 0)).unwrap();
        bank.set_names(&NamePreset::Area);
        assert_eq!(bank.names(), vec!["2500 µm²"]);
        bank.set_names(&NamePreset::DeviceNumber);
        assert_eq!(bank.names(), vec!["Device #7"]);
        bank.set_names(&NamePreset::Gate);
        assert_eq!(bank.names(), vec!["top gate"]);
        bank.set_names(&NamePreset::Literal("n1".to_string()));
        assert_eq!(bank.names(), vec!["n1"]);
    }
}

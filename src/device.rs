use super::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Placeholder of device properties missing from the device table
pub const UNKNOWN: &str = "unknown";

/// Environment variable holding the device table path
pub const DEVICES_ENV: &str = "TRANSISTOR_DEVICES";
const DEVICES_JSON: &str = "devices.json";

/// A test file and its identifying code
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// `<kind><gate><device number>`, e.g. `Rb7`
    pub code: String,
    pub path: PathBuf,
    /// Free-form note: cryo, epoxy, data quality, ...
    pub misc: Option<String>,
}

impl DataFile {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(code: S, path: P) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
            misc: None,
        }
    }
    pub fn with_misc<S: Into<String>>(mut self, misc: S) -> Self {
        self.misc = Some(misc.into());
        self
    }
}

/// Measured quantity of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// Drain-source resistance
    Resistance,
    /// Drain current
    Current,
}

impl TestKind {
    /// Returns the (x, y, z) units
    pub fn units(&self) -> [&'static str; 3] {
        match self {
            TestKind::Resistance => ["V", "V", "Ω"],
            TestKind::Current => ["V", "V", "A"],
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Resistance => write!(f, "R"),
            TestKind::Current => write!(f, "I"),
        }
    }
}

/// Gate driven by the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Bottom,
    Top,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Bottom => write!(f, "bottom"),
            Gate::Top => write!(f, "top"),
        }
    }
}

/// Decoded test file code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCode {
    pub kind: Option<TestKind>,
    pub gate: Option<Gate>,
    pub device: Option<u32>,
}

impl FileCode {
    /// Decodes `<kind><gate><device number>`
    ///
    /// Unreadable parts are logged and left as `None`.
    pub fn parse(code: &str) -> Self {
        let mut chars = code.chars();
        let kind = match chars.next().map(|c| c.to_ascii_lowercase()) {
            Some('r') => Some(TestKind::Resistance),
            Some('i') => Some(TestKind::Current),
            other => {
                tracing::warn!(code, kind = ?other, "test kind is neither 'R' nor 'I'");
                None
            }
        };
        let gate = match chars.next() {
            Some('b') => Some(Gate::Bottom),
            Some('t') => Some(Gate::Top),
            other => {
                tracing::warn!(code, gate = ?other, "gate is neither 'b' nor 't'");
                None
            }
        };
        let device = match chars.as_str().parse() {
            Ok(number) => Some(number),
            Err(_) => {
                tracing::warn!(code, "unreadable device number");
                None
            }
        };
        Self { kind, gate, device }
    }
}

/// A device entry of the device table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub number: u32,
    pub length: f64,
    pub width: f64,
    pub area: f64,
    pub model: String,
}

/// Channel dimensions, `None` when the device is unknown
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelDims {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub area: Option<f64>,
}

fn label(value: Option<f64>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

impl ChannelDims {
    pub fn length_label(&self) -> String {
        label(self.length)
    }
    pub fn width_label(&self) -> String {
        label(self.width)
    }
    pub fn area_label(&self) -> String {
        label(self.area)
    }
}

/// Device metadata attached to a test
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub number: Option<u32>,
    pub model: String,
    pub dims: ChannelDims,
}

impl DeviceInfo {
    pub fn unknown() -> Self {
        Self {
            number: None,
            model: UNKNOWN.to_string(),
            dims: Default::default(),
        }
    }
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            number: Some(device.number),
            model: device.model.clone(),
            dims: ChannelDims {
                length: Some(device.length),
                width: Some(device.width),
                area: Some(device.area),
            },
        }
    }
}

/// Device lookup table, `{"devices": [...]}` in JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTable {
    devices: Vec<Device>,
}

impl DeviceTable {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::fs::File::open(path)?))
    }
    /// Loads the table at `$TRANSISTOR_DEVICES`, or `devices.json`
    ///
    /// An unreadable table is logged and replaced by an empty one.
    pub fn from_env() -> Self {
        let path = std::env::var_os(DEVICES_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEVICES_JSON));
        Self::from_json(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "device table unavailable");
            Default::default()
        })
    }
    pub fn len(&self) -> usize {
        self.devices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
    pub fn get(&self, number: u32) -> Option<&Device> {
        self.devices.iter().find(|d| d.number == number)
    }
    /// Returns the device info, or placeholders if the device is not listed
    pub fn lookup(&self, number: Option<u32>) -> DeviceInfo {
        match number.and_then(|n| self.get(n)) {
            Some(device) => device.into(),
            None => {
                tracing::warn!(
                    device = ?number,
                    "device not listed in the device table, dimensions unknown"
                );
                DeviceInfo::unknown()
            }
        }
    }
}

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::AppError;

const REQUIRED_SECTIONS: [&str; 4] = ["api", "relays", "logging", "system"];
// `logging.file` must be present but may be null
const REQUIRED_KEYS: [(&str, &str); 6] = [
    ("api", "host"),
    ("api", "port"),
    ("relays", "pins"),
    ("logging", "level"),
    ("logging", "file"),
    ("system", "version"),
];
const BUILD_DATE_PREFIX: &str = "Build date: ";
const UNKNOWN: &str = "unknown";

// Relay ID to physical pin, iterated in ascending relay ID order.
pub type PinMap = BTreeMap<u32, u32>;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelaysConfig {
    pub pins: PinMap,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    pub version: String,
    #[serde(default = "default_version_file")]
    pub version_file: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    Mock,
    Libgpiod,
}

impl Default for SinkKind {
    fn default() -> Self {
        if cfg!(feature = "hardware-gpio") {
            SinkKind::Libgpiod
        } else {
            SinkKind::Mock
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GpioConfig {
    #[serde(default)]
    pub backend: SinkKind,
    #[serde(default = "default_chip")]
    pub chip: String,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: SinkKind::default(),
            chip: default_chip(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub relays: RelaysConfig,
    pub logging: LoggingConfig,
    pub system: SystemConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, AppError> {
        let document: Value = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid config yaml: {e}")))?;
        let sections = document
            .as_mapping()
            .ok_or_else(|| AppError::Config("Config root must be a mapping".into()))?;

        if let Some(name) = REQUIRED_SECTIONS
            .iter()
            .find(|name| !sections.contains_key(**name))
        {
            return Err(AppError::ConfigMissing(name.to_string()));
        }
        for (section, key) in REQUIRED_KEYS {
            if sections.get(section).and_then(|s| s.get(key)).is_none() {
                return Err(AppError::ConfigMissing(format!("{section}.{key}")));
            }
        }

        serde_yaml::from_value(document)
            .map_err(|e| AppError::Config(format!("Invalid config: {e}")))
    }
}

impl SystemConfig {
    pub fn build_date(&self) -> Result<String, AppError> {
        if !self.version_file.exists() {
            return Ok(UNKNOWN.to_string());
        }
        let contents = fs::read_to_string(&self.version_file)?;
        let date = contents
            .lines()
            .nth(1)
            .map(|line| line.trim().replace(BUILD_DATE_PREFIX, ""))
            .filter(|date| !date.is_empty());

        Ok(date.unwrap_or_else(|| UNKNOWN.to_string()))
    }
}

fn default_version_file() -> PathBuf {
    PathBuf::from("version.txt")
}

fn default_chip() -> String {
    "/dev/gpiochip0".to_string()
}

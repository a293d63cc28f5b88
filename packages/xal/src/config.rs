//! Toolkit configuration, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use xal_data_adaptor::WriteOptions;
use xal_messaging::DispatcherConfig;

use crate::Error;

/// Settings for reading and writing XML documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Require a DOCTYPE matching the root element when reading.
    pub validating: bool,
    /// Spaces per nesting level when writing.
    pub indent: usize,
    /// DTD declared in saved documents.
    pub dtd_uri: Option<String>,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            validating: false,
            indent: 4,
            dtd_uri: None,
        }
    }
}

impl XmlConfig {
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            indent: self.indent,
            ..WriteOptions::default()
        }
    }
}

/// Everything a [`Toolkit`](crate::Toolkit) needs.
///
/// ```json
/// {
///   "dispatch": { "pool_size": 2, "backpressure": "drop_newest" },
///   "xml": { "validating": true, "dtd_uri": "lattice.dtd" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub dispatch: DispatcherConfig,
    pub xml: XmlConfig,
}

impl ToolkitConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Self::parse(json, "<string>")
    }

    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&json, &path.display().to_string())
    }

    fn parse(json: &str, location: &str) -> Result<Self, Error> {
        let config: ToolkitConfig = serde_json::from_str(json).map_err(|e| Error::Config {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        config.dispatch.validate().map_err(|e| Error::Config {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        Ok(config)
    }
}

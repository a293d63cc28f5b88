//! Locating and fetching document sources.
//!
//! A location is either a filesystem path or a URL. `file:` URLs and bare
//! paths are read from disk; `http`/`https` URLs go through a
//! [`ResourceLoader`], which is a seam so remote fetches can be mocked.

use std::path::{Path, PathBuf};
#[cfg(feature = "remote")]
use std::time::Duration;

use url::Url;

use crate::Error;

/// Where a document lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Remote(Url),
}

impl Location {
    /// Classify a location string.
    ///
    /// Anything that does not parse as a URL with a multi-letter scheme is
    /// treated as a path (so `C:\data.xml` stays a path).
    pub fn parse(location: &str) -> Result<Self, Error> {
        match Url::parse(location) {
            Ok(url) if url.scheme().len() > 1 => Self::from_url(url, location),
            _ => Ok(Location::File(PathBuf::from(location))),
        }
    }

    fn from_url(url: Url, location: &str) -> Result<Self, Error> {
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Location::File)
                .map_err(|_| Error::ResourceNotFound {
                    location: location.to_string(),
                }),
            "http" | "https" => Ok(Location::Remote(url)),
            other => Err(Error::UnsupportedScheme {
                scheme: other.to_string(),
                location: location.to_string(),
            }),
        }
    }

    /// Human-readable form used in error messages.
    pub fn display(&self) -> String {
        match self {
            Location::File(path) => path.display().to_string(),
            Location::Remote(url) => url.to_string(),
        }
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::File(path.to_path_buf())
    }
}

/// Fetches the text of a remote document.
pub trait ResourceLoader: Send + Sync {
    /// Fetch `url`. A missing resource must map to [`Error::ResourceNotFound`].
    fn fetch(&self, url: &Url) -> Result<String, Error>;
}

/// Read a local file, keeping "not found" distinct from other I/O errors.
pub fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::from_read(path.display().to_string(), e))
}

/// Blocking HTTP loader built on reqwest.
///
/// Must not be created or used from inside an async runtime thread.
#[cfg(feature = "remote")]
pub struct HttpLoader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    /// Create a loader with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch {
                location: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Create with a 30 second timeout.
    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(feature = "remote")]
impl ResourceLoader for HttpLoader {
    fn fetch(&self, url: &Url) -> Result<String, Error> {
        let location = url.to_string();
        let fetch_error = |message: String| Error::Fetch {
            location: location.clone(),
            message,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(Error::ResourceNotFound {
                location: location.clone(),
            });
        }
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        response.text().map_err(|e| fetch_error(e.to_string()))
    }
}

/// Read the document at `location`, using `loader` for remote URLs.
pub fn load(location: &Location, loader: Option<&dyn ResourceLoader>) -> Result<String, Error> {
    match location {
        Location::File(path) => read_file(path),
        Location::Remote(url) => match loader {
            Some(loader) => loader.fetch(url),
            None => default_fetch(url),
        },
    }
}

#[cfg(feature = "remote")]
fn default_fetch(url: &Url) -> Result<String, Error> {
    HttpLoader::with_default_timeout()?.fetch(url)
}

#[cfg(not(feature = "remote"))]
fn default_fetch(url: &Url) -> Result<String, Error> {
    Err(Error::UnsupportedScheme {
        scheme: url.scheme().to_string(),
        location: url.to_string(),
    })
}

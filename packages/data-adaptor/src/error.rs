//! Error types for data adaptors.

/// Errors raised while reading, coercing, or writing adaptor data.
///
/// Loading failures keep three kinds apart: the source could not be located
/// ([`Error::ResourceNotFound`]), the content was malformed ([`Error::Parse`]),
/// or a fresh document could not be built ([`Error::Creation`]).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("resource not found: {location}")]
    ResourceNotFound { location: String },

    #[error("malformed document '{location}': {message}")]
    Parse { location: String, message: String },

    #[error("failed to create document: {message}")]
    Creation { message: String },

    #[error("cannot parse attribute '{attribute}' of <{node}> as {target}: {text:?}")]
    ValueParse {
        node: String,
        attribute: String,
        target: &'static str,
        text: String,
    },

    #[error("<{node}> has no attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },

    #[error("invalid XML name: {name:?}")]
    InvalidName { name: String },

    #[error("unsupported URL scheme '{scheme}' for {location}")]
    UnsupportedScheme { scheme: String, location: String },

    #[error("failed to fetch '{location}': {message}")]
    Fetch { location: String, message: String },

    #[error("I/O error on '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write document: {message}")]
    Write { message: String },
}

impl Error {
    /// Map an I/O failure on `location`, keeping "not found" distinct.
    pub(crate) fn from_io(location: impl Into<String>, source: std::io::Error) -> Self {
        let location = location.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::ResourceNotFound { location }
        } else {
            Error::Io { location, source }
        }
    }

    /// Map a failure reading `location` as text. Bytes that are not UTF-8
    /// are malformed content, not an I/O failure.
    pub(crate) fn from_read(location: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::InvalidData {
            return Error::Parse {
                location: location.into(),
                message: source.to_string(),
            };
        }
        Self::from_io(location, source)
    }

    pub(crate) fn write(error: impl std::fmt::Display) -> Self {
        Error::Write {
            message: error.to_string(),
        }
    }

    /// True when the error means the source does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from_io("/tmp/nope.xml", io);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/tmp/nope.xml"));
    }

    #[test]
    fn other_io_errors_stay_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from_io("/root/secret.xml", io);
        assert!(matches!(err, Error::Io { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn value_parse_display_names_attribute_and_type() {
        let err = Error::ValueParse {
            node: "magnet".to_string(),
            attribute: "length".to_string(),
            target: "double",
            text: "abc".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("length"));
        assert!(message.contains("double"));
        assert!(message.contains("magnet"));
    }
}

//! Top-level error type.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration in '{location}': {message}")]
    Config { location: String, message: String },

    #[error(transparent)]
    Data(#[from] xal_data_adaptor::Error),

    #[error(transparent)]
    Records(#[from] xal_records::Error),

    #[error(transparent)]
    Dispatch(#[from] xal_messaging::DispatchError),

    #[error("failed to notify document listeners of {event}: {message}")]
    Notification { event: &'static str, message: String },

    #[error("document has no source to save to or read from")]
    NoSource,

    #[error("document '{title}' is closed")]
    Closed { title: String },

    #[error("cannot read configuration '{}': {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

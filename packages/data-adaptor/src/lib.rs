//! # xal-data-adaptor
//!
//! Hierarchical attribute storage with an XML backend.
//!
//! A [`DataAdaptor`] is a tagged node holding string attributes and ordered
//! child nodes. Typed reads and writes come from [`DataAdaptorExt`]; objects
//! that know how to serialize themselves implement [`DataListener`].
//!
//! ## Reading
//!
//! ```ignore
//! use xal_data_adaptor::{DataAdaptor, DataAdaptorExt, XmlDocument};
//!
//! let doc = XmlDocument::from_url("file:///data/lattice.xml", false)?;
//! for magnet in doc.child_adaptor("lattice").unwrap().child_adaptors(Some("magnet")) {
//!     let length = magnet.double_value("length")?;
//! }
//! ```
//!
//! ## Writing
//!
//! ```ignore
//! use xal_data_adaptor::XmlDocument;
//!
//! let doc = XmlDocument::for_listener(&my_table, Some("table.dtd"))?;
//! doc.write_to_path("table.xml")?;
//! ```

mod adaptor;
mod codec;
mod document;
mod error;
mod node;
pub mod source;

pub use adaptor::{DataAdaptor, DataAdaptorExt, DataListener};
pub use codec::{DocType, WriteOptions};
pub use document::XmlDocument;
pub use error::Error;
pub use node::{is_xml_name, XmlNode};
pub use source::{Location, ResourceLoader};

#[cfg(feature = "remote")]
pub use source::HttpLoader;

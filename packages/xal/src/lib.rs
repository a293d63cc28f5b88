//! # xal
//!
//! Application core for accelerator tools: XML-backed data adaptors,
//! schema-typed record tables, and typed event dispatch, tied together by
//! documents that announce their state to registered listeners.
//!
//! The layers are also usable on their own:
//!
//! - [`data`]: `DataAdaptor` trees and XML documents
//! - [`messaging`]: protocols, the target directory and dispatchers
//! - [`records`]: schemas, record stores and records
//!
//! ```ignore
//! use xal::{Toolkit, ToolkitConfig};
//!
//! let toolkit = Toolkit::new(ToolkitConfig::load("xal.json")?)?;
//! let document = toolkit.new_document();
//! document.add_listener(window.clone());
//! document.set_has_changes(true)?;
//! document.save_as("lattice.xml", &store)?;
//! ```

mod config;
mod document;
mod error;
mod toolkit;

pub use xal_data_adaptor as data;
pub use xal_messaging as messaging;
pub use xal_records as records;

pub use config::{ToolkitConfig, XmlConfig};
pub use document::{Document, DocumentEvents, DocumentListener, UNTITLED};
pub use error::Error;
pub use toolkit::Toolkit;

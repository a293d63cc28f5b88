//! # xal-messaging
//!
//! In-process publish/subscribe over typed capability protocols.
//!
//! - [`Protocol`]: names a listener trait (the capability) targets implement
//! - [`TargetDirectory`]: shared registry of targets keyed by source and protocol
//! - [`MessageDispatcher`]: fans calls made on its [`Proxy`] out to matching
//!   targets, synchronously or on a bounded worker pool
//! - [`DispatchObserver`]: receives target failures, which never reach callers
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xal_messaging::{MessageDispatcher, Protocol, SourceId, TargetDirectory, TargetResult};
//!
//! pub trait TitleListener: Send + Sync {
//!     fn title_changed(&self, title: &str) -> TargetResult;
//! }
//!
//! pub struct TitleEvents;
//!
//! impl Protocol for TitleEvents {
//!     type Target = dyn TitleListener;
//!     const NAME: &'static str = "TitleListener";
//! }
//!
//! let directory = TargetDirectory::new();
//! let source = SourceId::new();
//! directory.register::<TitleEvents>(Arc::new(MyWindow::default()), Some(source));
//!
//! let dispatcher = MessageDispatcher::<TitleEvents>::synchronous(&directory, Some(source));
//! dispatcher.proxy().send("title_changed", |t| t.title_changed("mebt.xml"))?;
//! ```

mod config;
mod directory;
mod dispatcher;
mod error;
mod observer;
mod pool;
mod protocol;

pub use config::{Backpressure, DispatcherConfig};
pub use directory::TargetDirectory;
pub use dispatcher::{DispatchMode, DispatcherBuilder, MessageDispatcher, Proxy};
pub use error::{DispatchError, DispatchTargetError, FailureReason};
pub use observer::{DispatchObserver, NoopObserver, TracingObserver};
pub use protocol::{Protocol, SourceId, TargetError, TargetId, TargetResult};

//! The toolkit: one target directory and configuration shared by documents,
//! stores and dispatchers.

use std::path::Path;
use std::sync::Arc;

use xal_data_adaptor::XmlDocument;
use xal_messaging::{DispatchMode, MessageDispatcher, Protocol, SourceId, TargetDirectory};
use xal_records::{RecordStore, StoreEvents};

use crate::{Document, Error, ToolkitConfig};

pub struct Toolkit {
    directory: TargetDirectory,
    config: ToolkitConfig,
}

impl Toolkit {
    pub fn new(config: ToolkitConfig) -> Result<Self, Error> {
        config.dispatch.validate()?;
        Ok(Self {
            directory: TargetDirectory::new(),
            config,
        })
    }

    pub fn directory(&self) -> &TargetDirectory {
        &self.directory
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// A new untitled document.
    pub fn new_document(&self) -> Document {
        Document::new(&self.directory, self.config.xml.clone())
    }

    /// Open the XML file at `path` as a document with that file as source.
    pub fn open_document(&self, path: impl AsRef<Path>) -> Result<(Document, XmlDocument), Error> {
        let path = path.as_ref();
        let content = XmlDocument::from_path(path, self.config.xml.validating)?;
        let document = self.new_document();
        document.set_source(path)?;
        Ok((document, content))
    }

    /// A dispatcher for protocol `P` over the shared directory.
    ///
    /// Asynchronous dispatchers get a worker pool sized by the configuration.
    pub fn dispatcher<P: Protocol>(
        &self,
        source: Option<SourceId>,
        mode: DispatchMode,
    ) -> Result<MessageDispatcher<P>, Error> {
        let builder = MessageDispatcher::<P>::builder(&self.directory).source(source);
        Ok(match mode {
            DispatchMode::Synchronous => builder.synchronous(),
            DispatchMode::Asynchronous => builder.asynchronous(&self.config.dispatch)?,
        })
    }

    /// Route `store`'s change events through a new dispatcher speaking for `source`.
    ///
    /// The returned dispatcher can be terminated to stop delivery.
    pub fn publish_store(
        &self,
        store: &RecordStore,
        source: Option<SourceId>,
        mode: DispatchMode,
    ) -> Result<MessageDispatcher<StoreEvents>, Error> {
        let dispatcher = self.dispatcher::<StoreEvents>(source, mode)?;
        store.set_listener(Some(Arc::new(dispatcher.proxy())));
        Ok(dispatcher)
    }
}

impl Default for Toolkit {
    fn default() -> Self {
        Self {
            directory: TargetDirectory::new(),
            config: ToolkitConfig::default(),
        }
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("directory", &self.directory)
            .field("config", &self.config)
            .finish()
    }
}

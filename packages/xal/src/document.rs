//! Documents: titled, savable sources of document events.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use xal_data_adaptor::{DataListener, XmlDocument};
use xal_messaging::{
    MessageDispatcher, Protocol, Proxy, SourceId, TargetDirectory, TargetResult,
};

use crate::{Error, XmlConfig};

/// Title of a document that has never been saved.
pub const UNTITLED: &str = "Untitled";

/// Receives document state changes.
///
/// Register implementations in the [`TargetDirectory`] under a document's
/// [`id`](Document::id), or under `None` to hear from every document.
/// Calls are synchronous: the document's setter returns after every
/// listener has run.
pub trait DocumentListener: Send + Sync {
    fn title_changed(&self, document: &Document, title: &str) -> TargetResult;

    fn has_changes_changed(&self, document: &Document, has_changes: bool) -> TargetResult;

    fn document_will_close(&self, document: &Document) -> TargetResult;

    fn document_has_closed(&self, document: &Document) -> TargetResult;
}

/// The document-events protocol.
pub struct DocumentEvents;

impl Protocol for DocumentEvents {
    type Target = dyn DocumentListener;
    const NAME: &'static str = "DocumentListener";
}

impl DocumentListener for Proxy<DocumentEvents> {
    fn title_changed(&self, document: &Document, title: &str) -> TargetResult {
        let (document, title) = (document.clone(), title.to_string());
        self.send("title_changed", move |target| {
            target.title_changed(&document, &title)
        })?;
        Ok(())
    }

    fn has_changes_changed(&self, document: &Document, has_changes: bool) -> TargetResult {
        let document = document.clone();
        self.send("has_changes_changed", move |target| {
            target.has_changes_changed(&document, has_changes)
        })?;
        Ok(())
    }

    fn document_will_close(&self, document: &Document) -> TargetResult {
        let document = document.clone();
        self.send("document_will_close", move |target| {
            target.document_will_close(&document)
        })?;
        Ok(())
    }

    fn document_has_closed(&self, document: &Document) -> TargetResult {
        let document = document.clone();
        self.send("document_has_closed", move |target| {
            target.document_has_closed(&document)
        })?;
        Ok(())
    }
}

struct DocumentState {
    title: String,
    has_changes: bool,
    source: Option<PathBuf>,
    closed: bool,
}

struct DocumentInner {
    id: SourceId,
    directory: TargetDirectory,
    state: RwLock<DocumentState>,
    dispatcher: MessageDispatcher<DocumentEvents>,
    proxy: Proxy<DocumentEvents>,
    xml: XmlConfig,
}

/// A document with a title, a change flag and an optional file source.
///
/// State changes are announced through [`DocumentListener`] with the
/// document as source. Cloning yields another handle to the same document;
/// two handles are equal when they share an [`id`](Self::id).
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    /// A new, empty, untitled document announcing through `directory`.
    pub fn new(directory: &TargetDirectory, xml: XmlConfig) -> Self {
        let id = SourceId::new();
        let dispatcher = MessageDispatcher::synchronous(directory, Some(id));
        let proxy = dispatcher.proxy();
        tracing::debug!(document = %id, "document created");
        Self {
            inner: Arc::new(DocumentInner {
                id,
                directory: directory.clone(),
                state: RwLock::new(DocumentState {
                    title: UNTITLED.to_string(),
                    has_changes: false,
                    source: None,
                    closed: false,
                }),
                dispatcher,
                proxy,
                xml,
            }),
        }
    }

    /// Source id under which this document's events are dispatched.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Register `listener` for this document only.
    pub fn add_listener(&self, listener: Arc<dyn DocumentListener>) -> bool {
        self.inner
            .directory
            .register::<DocumentEvents>(listener, Some(self.inner.id))
    }

    pub fn remove_listener(&self, listener: &Arc<dyn DocumentListener>) -> bool {
        self.inner
            .directory
            .remove::<DocumentEvents>(listener, Some(self.inner.id))
    }

    pub fn title(&self) -> String {
        self.read_state(|state| state.title.clone())
    }

    /// Change the title and notify listeners. Setting the same title is silent.
    pub fn set_title(&self, title: impl Into<String>) -> Result<(), Error> {
        let title = title.into();
        let changed = self.update_state(|state| {
            if state.title == title {
                return false;
            }
            state.title = title.clone();
            true
        })?;
        if changed {
            self.announce("title_changed", |proxy| proxy.title_changed(self, &title))?;
        }
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.read_state(|state| state.has_changes)
    }

    /// Mark the document dirty or clean and notify listeners on change.
    pub fn set_has_changes(&self, has_changes: bool) -> Result<(), Error> {
        let changed = self.update_state(|state| {
            let changed = state.has_changes != has_changes;
            state.has_changes = has_changes;
            changed
        })?;
        if changed {
            self.announce("has_changes_changed", |proxy| {
                proxy.has_changes_changed(self, has_changes)
            })?;
        }
        Ok(())
    }

    pub fn source(&self) -> Option<PathBuf> {
        self.read_state(|state| state.source.clone())
    }

    /// Set the file backing this document; the title becomes its file name.
    pub fn set_source(&self, path: impl Into<PathBuf>) -> Result<(), Error> {
        let path = path.into();
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.update_state(|state| state.source = Some(path))?;
        self.set_title(title)
    }

    /// No source and no unsaved changes.
    pub fn is_empty(&self) -> bool {
        self.read_state(|state| state.source.is_none() && !state.has_changes)
    }

    pub fn is_closed(&self) -> bool {
        self.read_state(|state| state.closed)
    }

    /// Write `content` as the root of an XML document at `path`, then adopt
    /// `path` as the source and clear the change flag.
    pub fn save_as(&self, path: impl AsRef<Path>, content: &dyn DataListener) -> Result<(), Error> {
        let path = path.as_ref();
        self.ensure_open()?;

        let document = XmlDocument::for_listener(content, self.inner.xml.dtd_uri.as_deref())?;
        document.write_to_path_with(path, &self.inner.xml.write_options())?;
        tracing::debug!(document = %self.inner.id, path = %path.display(), "document saved");

        self.set_source(path)?;
        self.set_has_changes(false)
    }

    /// Save to the current source.
    pub fn save(&self, content: &dyn DataListener) -> Result<(), Error> {
        let source = self.source().ok_or(Error::NoSource)?;
        self.save_as(source, content)
    }

    /// Read and parse the current source.
    pub fn read_source(&self) -> Result<XmlDocument, Error> {
        let source = self.source().ok_or(Error::NoSource)?;
        Ok(XmlDocument::from_path(&source, self.inner.xml.validating)?)
    }

    /// Announce the close, then shut down this document's dispatcher.
    ///
    /// Listeners hear `document_will_close` while the document is still
    /// open and `document_has_closed` after. Later mutations and a second
    /// close fail with [`Error::Closed`].
    pub fn close(&self) -> Result<(), Error> {
        self.ensure_open()?;
        self.announce("document_will_close", |proxy| proxy.document_will_close(self))?;
        self.update_state(|state| state.closed = true)?;
        let result = self.announce("document_has_closed", |proxy| {
            proxy.document_has_closed(self)
        });
        self.inner.dispatcher.terminate();
        tracing::debug!(document = %self.inner.id, "document closed");
        result
    }

    fn announce(
        &self,
        event: &'static str,
        call: impl FnOnce(&Proxy<DocumentEvents>) -> TargetResult,
    ) -> Result<(), Error> {
        call(&self.inner.proxy).map_err(|e| Error::Notification {
            event,
            message: e.to_string(),
        })
    }

    fn ensure_open(&self) -> Result<(), Error> {
        self.read_state(|state| {
            if state.closed {
                Err(Error::Closed {
                    title: state.title.clone(),
                })
            } else {
                Ok(())
            }
        })
    }

    fn read_state<T>(&self, f: impl FnOnce(&DocumentState) -> T) -> T {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Apply `f` unless the document is closed. The lock is released before returning.
    fn update_state<T>(&self, f: impl FnOnce(&mut DocumentState) -> T) -> Result<T, Error> {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Error::Closed {
                title: state.title.clone(),
            });
        }
        Ok(f(&mut state))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Document {}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.read_state(|state| {
            f.debug_struct("Document")
                .field("id", &self.inner.id)
                .field("title", &state.title)
                .field("has_changes", &state.has_changes)
                .field("source", &state.source)
                .field("closed", &state.closed)
                .finish()
        })
    }
}

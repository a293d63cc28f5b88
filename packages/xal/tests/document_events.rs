use std::sync::{Arc, Mutex};

use xal::data::DataAdaptor;
use xal::messaging::{DispatchMode, SourceId, TargetResult};
use xal::records::{Attributes, Record, RecordSchema, RecordStore, StoreListener, Value};
use xal::{Document, DocumentListener, Error, Toolkit, ToolkitConfig};

struct Window {
    name: &'static str,
    fail: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl Window {
    fn record(&self, event: String) -> TargetResult {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, event));
        if self.fail {
            return Err("window is gone".into());
        }
        Ok(())
    }
}

impl DocumentListener for Window {
    fn title_changed(&self, _document: &Document, title: &str) -> TargetResult {
        self.record(format!("title={}", title))
    }

    fn has_changes_changed(&self, _document: &Document, has_changes: bool) -> TargetResult {
        self.record(format!("dirty={}", has_changes))
    }

    fn document_will_close(&self, document: &Document) -> TargetResult {
        assert!(!document.is_closed());
        self.record("will_close".to_string())
    }

    fn document_has_closed(&self, document: &Document) -> TargetResult {
        assert!(document.is_closed());
        self.record("has_closed".to_string())
    }
}

fn window(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Window> {
    Arc::new(Window {
        name,
        fail: false,
        log: log.clone(),
    })
}

fn magnets() -> RecordStore {
    let schema = RecordSchema::builder("magnets")
        .attribute("id", "string")
        .attribute("field", "double")
        .key("id")
        .build()
        .unwrap();
    RecordStore::new(schema)
}

fn magnet(id: &str, field: f64) -> Attributes {
    let mut values = Attributes::new();
    values.insert("id".to_string(), Value::from(id));
    values.insert("field".to_string(), Value::from(field));
    values
}

#[test]
fn test_title_reaches_document_and_wildcard_listeners() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = toolkit.new_document();

    let own = window("own", &log);
    let any = window("any", &log);
    assert!(document.add_listener(own.clone()));
    assert!(!document.add_listener(own.clone()));
    toolkit
        .directory()
        .register::<xal::DocumentEvents>(any, None);

    document.set_title("Orbit").unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["own:title=Orbit".to_string(), "any:title=Orbit".to_string()]
    );
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = toolkit.new_document();

    document.add_listener(Arc::new(Window {
        name: "broken",
        fail: true,
        log: log.clone(),
    }));
    document.add_listener(window("healthy", &log));

    document.set_has_changes(true).unwrap();
    assert!(document.has_changes());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["broken:dirty=true".to_string(), "healthy:dirty=true".to_string()]
    );
}

#[test]
fn test_listeners_of_other_documents_stay_silent() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = toolkit.new_document();
    let second = toolkit.new_document();
    first.add_listener(window("first", &log));

    second.set_title("Other").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_removed_listener_hears_nothing() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = toolkit.new_document();
    let listener: Arc<dyn DocumentListener> = window("gone", &log);

    document.add_listener(listener.clone());
    assert!(document.remove_listener(&listener));
    document.set_title("Quiet").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_close_sequence() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = toolkit.new_document();
    document.add_listener(window("w", &log));

    document.close().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["w:will_close".to_string(), "w:has_closed".to_string()]
    );
    assert!(matches!(document.set_title("late"), Err(Error::Closed { .. })));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_save_as_adopts_source_and_round_trips() {
    let toolkit = Toolkit::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = toolkit.new_document();
    document.add_listener(window("w", &log));

    let store = magnets();
    store.insert(magnet("QH01", 1.25)).unwrap();
    store.insert(magnet("QV02", -0.5)).unwrap();
    document.set_has_changes(true).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("magnets.xml");
    document.save_as(&path, &store).unwrap();

    assert_eq!(document.title(), "magnets.xml");
    assert_eq!(document.source().as_deref(), Some(path.as_path()));
    assert!(!document.has_changes());
    assert!(log.lock().unwrap().contains(&"w:title=magnets.xml".to_string()));
    assert!(log.lock().unwrap().contains(&"w:dirty=false".to_string()));

    let content = document.read_source().unwrap();
    let restored = magnets();
    let table = content.child_adaptor("magnets").unwrap();
    assert_eq!(restored.load_from(table).unwrap().len(), 2);
    let quad = restored.lookup("QH01").unwrap();
    assert_eq!(quad.double_for("field").unwrap(), 1.25);
}

#[test]
fn test_open_document_uses_file_name_as_title() {
    let toolkit = Toolkit::default();
    let store = magnets();
    store.insert(magnet("DH01", 0.75)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bends.xml");
    toolkit.new_document().save_as(&path, &store).unwrap();

    let (document, content) = toolkit.open_document(&path).unwrap();
    assert_eq!(document.title(), "bends.xml");
    assert!(!document.has_changes());
    assert_eq!(content.root_element().unwrap().name(), "magnets");
}

#[derive(Default)]
struct Changes {
    seen: Mutex<Vec<String>>,
}

impl StoreListener for Changes {
    fn record_changed(
        &self,
        record: &Record,
        attribute: &str,
        _old: Option<&Value>,
        new: &Value,
    ) -> TargetResult {
        let id = record.string_for("id").unwrap_or_default();
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}.{}={}", id, attribute, new));
        Ok(())
    }
}

#[test]
fn test_store_events_published_for_a_source() {
    let toolkit = Toolkit::default();
    let source = SourceId::new();
    let changes = Arc::new(Changes::default());
    toolkit
        .directory()
        .register::<xal::records::StoreEvents>(changes.clone(), Some(source));

    let store = magnets();
    let dispatcher = toolkit
        .publish_store(&store, Some(source), DispatchMode::Synchronous)
        .unwrap();
    let quad = store.insert(magnet("QH01", 1.0)).unwrap();
    quad.set("field", 2.0).unwrap();
    assert_eq!(*changes.seen.lock().unwrap(), vec!["QH01.field=2".to_string()]);

    dispatcher.terminate();
    quad.set("field", 3.0).unwrap();
    assert_eq!(changes.seen.lock().unwrap().len(), 1);
}

#[test]
fn test_toolkit_from_json_config() {
    let config = ToolkitConfig::from_json_str(
        r#"{ "dispatch": { "pool_size": 2 }, "xml": { "indent": 2, "dtd_uri": "magnets.dtd" } }"#,
    )
    .unwrap();
    let toolkit = Toolkit::new(config).unwrap();
    assert_eq!(toolkit.config().dispatch.pool_size, 2);

    let store = magnets();
    store.insert(magnet("QH01", 1.0)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("magnets.xml");
    toolkit.new_document().save_as(&path, &store).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("<!DOCTYPE magnets SYSTEM \"magnets.dtd\">"));
    assert!(text.contains("\n  <record"));

    let asynchronous = toolkit
        .dispatcher::<xal::DocumentEvents>(None, DispatchMode::Asynchronous)
        .unwrap();
    assert_eq!(asynchronous.mode(), DispatchMode::Asynchronous);
    asynchronous.terminate();
}

#[test]
fn test_invalid_dispatch_config_is_rejected() {
    let result = ToolkitConfig::from_json_str(r#"{ "dispatch": { "pool_size": 0 } }"#);
    assert!(matches!(result, Err(Error::Config { .. })));
}

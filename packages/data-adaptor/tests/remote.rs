#![cfg(feature = "remote")]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xal_data_adaptor::{DataAdaptor, DataAdaptorExt, Error, XmlDocument};

#[tokio::test]
async fn test_load_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/optics/lattice.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<lattice name="HEBT"><magnet id="Q1" length="0.4"/></lattice>"#),
        )
        .mount(&server)
        .await;

    let url = format!("{}/optics/lattice.xml", server.uri());

    let doc = tokio::task::spawn_blocking(move || XmlDocument::from_url(&url, false).unwrap())
        .await
        .unwrap();

    let root = doc.child_adaptor("lattice").unwrap();
    assert_eq!(root.string_value("name"), Some("HEBT"));
    let magnet = root.child_adaptor("magnet").unwrap();
    assert_eq!(magnet.double_value("length").unwrap(), 0.4);
}

#[tokio::test]
async fn test_http_404_is_resource_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.xml", server.uri());

    let result = tokio::task::spawn_blocking(move || XmlDocument::from_url(&url, false))
        .await
        .unwrap();

    assert!(matches!(result, Err(Error::ResourceNotFound { .. })));
}

#[tokio::test]
async fn test_http_server_error_is_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = format!("{}/broken.xml", server.uri());

    let result = tokio::task::spawn_blocking(move || XmlDocument::from_url(&url, false))
        .await
        .unwrap();

    assert!(matches!(result, Err(Error::Fetch { .. })));
}

#[tokio::test]
async fn test_malformed_remote_document_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<lattice>"))
        .mount(&server)
        .await;

    let url = format!("{}/bad.xml", server.uri());

    let result = tokio::task::spawn_blocking(move || XmlDocument::from_url(&url, false))
        .await
        .unwrap();

    assert!(matches!(result, Err(Error::Parse { .. })));
}

/// Integration tests for the object-storage client against a mocked service
use loan_intake_api::errors::AppError;
use loan_intake_api::storage_client::ObjectStorageClient;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ObjectStorageClient {
    ObjectStorageClient::new(
        server.uri(),
        "documents".to_string(),
        "test-token".to_string(),
    )
    .expect("client should build")
}

#[tokio::test]
async fn upload_returns_the_reported_location() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/objects/documents/ine-frontal.jpg"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Content-Type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "location": "https://cdn.example.com/documents/ine-frontal.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let url = client
        .upload("ine-frontal.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
        .await
        .expect("upload should succeed");

    assert_eq!(url, "https://cdn.example.com/documents/ine-frontal.jpg");
}

#[tokio::test]
async fn upload_failure_surfaces_as_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/objects/documents/broken.jpg"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .upload("broken.jpg", "image/jpeg", vec![1, 2, 3])
        .await
        .expect_err("upload should fail");

    assert!(matches!(err, AppError::StorageError(_)));
}

#[tokio::test]
async fn fetch_returns_bytes_and_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/objects/documents/selfie.png"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(vec![0x89, 0x50, 0x4E, 0x47]),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (bytes, content_type) = client.fetch("selfie.png").await.expect("fetch should succeed");

    assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47]);
    assert_eq!(content_type, "image/png");
}

#[tokio::test]
async fn fetch_defaults_content_type_when_header_is_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/objects/documents/raw.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (_, content_type) = client.fetch("raw.bin").await.expect("fetch should succeed");

    assert_eq!(content_type, "application/octet-stream");
}

#[tokio::test]
async fn fetch_missing_object_is_a_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/objects/documents/nope.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch("nope.jpg").await.expect_err("fetch should fail");

    assert!(matches!(err, AppError::StorageError(_)));
}

#[tokio::test]
async fn delete_sends_authorized_request() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/objects/documents/old.jpg"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete("old.jpg").await.expect("delete should succeed");
}

#[tokio::test]
async fn signed_url_parses_the_url_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/objects/documents/comprobante.pdf/signed-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://cdn.example.com/signed/comprobante.pdf?sig=abc"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let url = client
        .signed_url("comprobante.pdf")
        .await
        .expect("signed url should succeed");

    assert_eq!(url, "https://cdn.example.com/signed/comprobante.pdf?sig=abc");
}

#[tokio::test]
async fn signed_url_with_malformed_body_is_a_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/objects/documents/comprobante.pdf/signed-url"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .signed_url("comprobante.pdf")
        .await
        .expect_err("signed url should fail");

    assert!(matches!(err, AppError::StorageError(_)));
}

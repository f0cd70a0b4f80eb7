//! DocumentClient against a wiremock server standing in for the personal
//! data server.

use bodypace_client::{ClientError, DocumentClient};
use bodypace_crypto::{envelope, unwrap_key, wrap, CryptoError, PersonalKey};
use wiremock::matchers::{any, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-access-token";

fn personal_key() -> PersonalKey {
    PersonalKey::from_bytes([42u8; 32])
}

fn client_for(server: &MockServer) -> DocumentClient {
    DocumentClient::new(&server.uri()).unwrap()
}

/// A listing entry for `name`/`content` sealed under `key`, plus the sealed
/// content the fetch-one endpoint should serve.
fn sealed_entry(id: i64, name: &str, content: &[u8], key: &PersonalKey) -> (serde_json::Value, Vec<u8>) {
    let sealed = wrap(name, content, key).unwrap();
    let entry = serde_json::json!({
        "id": id,
        "name": sealed.encrypted_name,
        "keys": sealed.wrapped_key,
        "userId": 1,
    });
    (entry, sealed.encrypted_content)
}

async fn mount_listing(server: &MockServer, entries: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/documents"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(server)
        .await;
}

async fn forbid_any_request(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn assert_no_requests(server: &MockServer) {
    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty(), "expected no requests, got {}", received.len());
    server.verify().await;
}

// --- Listing ---

#[tokio::test]
async fn list_without_decrypt_returns_wire_fields() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, _) = sealed_entry(1, "report.pdf", b"PDF-DATA", &key);
    mount_listing(&server, vec![entry.clone()]).await;

    let docs = client_for(&server)
        .list_documents(None, TOKEN, false)
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, 1);
    assert_eq!(docs[0].name, entry["name"].as_str().unwrap());
    assert_eq!(docs[0].keys, entry["keys"].as_str().unwrap());
    assert_eq!(docs[0].metadata.get("userId"), Some(&serde_json::json!(1)));
}

#[tokio::test]
async fn list_with_decrypt_replaces_name_and_keys_without_fetching_content() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (a, _) = sealed_entry(1, "report.pdf", b"PDF-DATA", &key);
    let (b, _) = sealed_entry(2, "scan.png", b"PNG", &key);
    let wrapped_a = a["keys"].as_str().unwrap().to_string();
    mount_listing(&server, vec![a, b]).await;

    Mock::given(path_regex(r"^/documents/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let docs = client_for(&server)
        .list_documents(Some(&key), TOKEN, true)
        .await
        .unwrap();

    assert_eq!(docs[0].name, "report.pdf");
    assert_eq!(docs[1].name, "scan.png");

    let expected_key = unwrap_key(&wrapped_a, &key).unwrap();
    assert_eq!(docs[0].keys, expected_key.to_base64());

    server.verify().await;
}

#[tokio::test]
async fn list_decrypt_without_personal_key_sends_nothing() {
    let server = MockServer::start().await;
    forbid_any_request(&server).await;

    let err = client_for(&server)
        .list_documents(None, TOKEN, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MissingKey));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn list_fails_whole_when_one_entry_does_not_unwrap() {
    let server = MockServer::start().await;
    let key = personal_key();
    let stranger = PersonalKey::from_bytes([7u8; 32]);
    let (good, _) = sealed_entry(1, "mine.txt", b"x", &key);
    let (foreign, _) = sealed_entry(2, "theirs.txt", b"y", &stranger);
    mount_listing(&server, vec![good, foreign]).await;

    let err = client_for(&server)
        .list_documents(Some(&key), TOKEN, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Crypto(CryptoError::KeyUnwrap)));
}

#[tokio::test]
async fn list_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_documents(None, TOKEN, false)
        .await
        .unwrap_err();

    match err {
        ClientError::Server { status } => assert_eq!(status, 401),
        other => panic!("expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Nothing listens on port 1
    let client = DocumentClient::new("http://127.0.0.1:1").unwrap();
    let err = client.list_documents(None, TOKEN, false).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}

// --- Fetch one ---

#[tokio::test]
async fn get_document_decrypts_name_content_and_key() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, content) = sealed_entry(3, "report.pdf", b"PDF-DATA", &key);
    let encrypted_name = entry["name"].as_str().unwrap().to_string();
    let wrapped_key = entry["keys"].as_str().unwrap().to_string();
    mount_listing(&server, vec![entry]).await;

    Mock::given(method("GET"))
        .and(path("/documents/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    format!("attachment; filename=\"{encrypted_name}\"").as_str(),
                )
                .set_body_bytes(content),
        )
        .expect(1)
        .mount(&server)
        .await;

    let doc = client_for(&server)
        .get_document(Some(&key), TOKEN, 3, true)
        .await
        .unwrap();

    assert!(doc.decrypted);
    assert_eq!(doc.filename, "report.pdf");
    assert_eq!(doc.content, b"PDF-DATA");
    assert_eq!(doc.keys, unwrap_key(&wrapped_key, &key).unwrap().to_base64());
}

#[tokio::test]
async fn get_document_without_decrypt_returns_wire_form() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, content) = sealed_entry(3, "report.pdf", b"PDF-DATA", &key);
    let encrypted_name = entry["name"].as_str().unwrap().to_string();
    let wrapped_key = entry["keys"].as_str().unwrap().to_string();
    mount_listing(&server, vec![entry]).await;

    Mock::given(method("GET"))
        .and(path("/documents/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    format!("attachment; filename=\"{encrypted_name}\"").as_str(),
                )
                .set_body_bytes(content.clone()),
        )
        .mount(&server)
        .await;

    let doc = client_for(&server)
        .get_document(None, TOKEN, 3, false)
        .await
        .unwrap();

    assert!(!doc.decrypted);
    assert_eq!(doc.filename, encrypted_name);
    assert_eq!(doc.content, content);
    assert_eq!(doc.keys, wrapped_key);
}

#[tokio::test]
async fn get_document_unknown_id_fails_before_download() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, _) = sealed_entry(1, "report.pdf", b"PDF-DATA", &key);
    mount_listing(&server, vec![entry]).await;

    Mock::given(path("/documents/2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_document(Some(&key), TOKEN, 2, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::NotFound(2)));
    server.verify().await;
}

#[tokio::test]
async fn get_document_decrypt_without_personal_key_sends_nothing() {
    let server = MockServer::start().await;
    forbid_any_request(&server).await;

    let err = client_for(&server)
        .get_document(None, TOKEN, 1, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MissingKey));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn get_document_without_disposition_is_missing_filename() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, content) = sealed_entry(4, "report.pdf", b"PDF-DATA", &key);
    mount_listing(&server, vec![entry]).await;

    Mock::given(method("GET"))
        .and(path("/documents/4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_document(Some(&key), TOKEN, 4, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MissingFilename));
}

#[tokio::test]
async fn get_document_tampered_content_is_rejected() {
    let server = MockServer::start().await;
    let key = personal_key();
    let (entry, mut content) = sealed_entry(5, "report.pdf", b"PDF-DATA", &key);
    let encrypted_name = entry["name"].as_str().unwrap().to_string();
    mount_listing(&server, vec![entry]).await;
    let last = content.len() - 1;
    content[last] ^= 0x01;

    Mock::given(method("GET"))
        .and(path("/documents/5"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    format!("attachment; filename=\"{encrypted_name}\"").as_str(),
                )
                .set_body_bytes(content),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_document(Some(&key), TOKEN, 5, true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Crypto(CryptoError::ContentDecrypt)));
}

// --- Upload ---

/// Pull the value of multipart field `field` out of a captured request.
fn multipart_field(request: &wiremock::Request, field: &str) -> Vec<u8> {
    let content_type = request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let boundary = content_type.split("boundary=").nth(1).unwrap().trim();
    let delimiter = format!("\r\n--{boundary}");

    let body = &request.body;
    let marker = format!("name=\"{field}\"");
    let start = find(body, marker.as_bytes()).unwrap();
    let value_start = start + find(&body[start..], b"\r\n\r\n").unwrap() + 4;
    let value_len = find(&body[value_start..], delimiter.as_bytes()).unwrap();
    body[value_start..value_start + value_len].to_vec()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn upload_plain_sends_name_bytes_and_placeholder_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .upload_document(TOKEN, None, b"hello".to_vec(), "notes.txt", false)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(multipart_field(&requests[0], "name"), b"notes.txt");
    assert_eq!(multipart_field(&requests[0], "file"), b"hello");
    assert_eq!(multipart_field(&requests[0], "keys"), b"nothing");
}

#[tokio::test]
async fn upload_encrypted_sends_only_ciphertext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let key = personal_key();
    client_for(&server)
        .upload_document(TOKEN, Some(&key), b"PDF-DATA".to_vec(), "report.pdf", true)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert!(find(&request.body, b"report.pdf").is_none());
    assert!(find(&request.body, b"PDF-DATA").is_none());

    let name = String::from_utf8(multipart_field(request, "name")).unwrap();
    let keys = String::from_utf8(multipart_field(request, "keys")).unwrap();
    let file = multipart_field(request, "file");

    let (document_key, plain_name) = envelope::unwrap(&name, &keys, &key).unwrap();
    assert_eq!(plain_name, "report.pdf");
    assert_eq!(envelope::unwrap_content(&file, &document_key).unwrap(), b"PDF-DATA");
}

#[tokio::test]
async fn upload_encrypted_without_personal_key_sends_nothing() {
    let server = MockServer::start().await;
    forbid_any_request(&server).await;

    let err = client_for(&server)
        .upload_document(TOKEN, None, b"x".to_vec(), "x.txt", true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MissingKey));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn upload_rejected_by_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_document(TOKEN, None, b"x".to_vec(), "x.txt", false)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Server { status } if status == 413));
}

// --- Delete ---

#[tokio::test]
async fn delete_document_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/9"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_document(TOKEN, 9).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn delete_missing_document_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_document(TOKEN, 9).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status } if status == 404));
}

// --- Accounts ---

#[tokio::test]
async fn login_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .and(wiremock::matchers::body_json(serde_json::json!({
            "username": "alice",
            "password": "hunter2",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "tok" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = client_for(&server)
        .login("alice", &secrecy::SecretString::from("hunter2"))
        .await
        .unwrap();
    assert_eq!(token, "tok");
}

#[tokio::test]
async fn login_accepts_numeric_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": 12345 })),
        )
        .mount(&server)
        .await;

    let token = client_for(&server)
        .login("alice", &secrecy::SecretString::from("pw"))
        .await
        .unwrap();
    assert_eq!(token, "12345");
}

#[tokio::test]
async fn login_without_token_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("alice", &secrecy::SecretString::from("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials));
}

#[tokio::test]
async fn login_rejected_with_401_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Unauthorized",
            "statusCode": 401,
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("alice", &secrecy::SecretString::from("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials));
}

#[tokio::test]
async fn login_forbidden_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("alice", &secrecy::SecretString::from("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials));
}

#[tokio::test]
async fn login_server_failure_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("alice", &secrecy::SecretString::from("pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Server { status } if status == 500));
}

#[tokio::test]
async fn login_non_json_body_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("alice", &secrecy::SecretString::from("pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn whoami_returns_subject() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "sub": 17 })))
        .mount(&server)
        .await;

    let sub = client_for(&server).whoami(TOKEN).await.unwrap();
    assert_eq!(sub, "17");
}

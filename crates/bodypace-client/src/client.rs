//! HTTP client for the personal data server.
//!
//! Every document call is a single request/response, except
//! [`DocumentClient::get_document`], which first lists documents to find the
//! wrapped key of the requested id. Nothing is retried or cached.

use bodypace_core::config::ServerConfig;
use bodypace_core::types::{
    value_to_text, AccountInfo, Document, FetchedDocument, LoginRequest, LoginResponse,
    KEYS_PLACEHOLDER,
};
use bodypace_crypto::{envelope, PersonalKey};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::disposition;
use crate::error::{ClientError, ClientResult};

/// Client for one personal data server.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    http: Client,
    base_url: String,
}

impl DocumentClient {
    /// Build a client for `base_url` with no request timeout.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ClientError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url))
    }

    /// Build a client from the `[server]` config section.
    ///
    /// Plaintext `http://` URLs are refused when `enforce_tls` is set and
    /// logged as a warning otherwise.
    pub fn from_config(server: &ServerConfig) -> ClientResult<Self> {
        if server.url.starts_with("http://") {
            if server.enforce_tls {
                return Err(ClientError::Config(format!(
                    "server URL uses plaintext HTTP ({}), but enforce_tls is enabled. \
                     Use an HTTPS URL or set server.enforce_tls = false for local development.",
                    server.url
                )));
            }
            tracing::warn!(
                url = %server.url,
                "server URL uses plaintext HTTP; the access token and credentials are sent unencrypted"
            );
        }

        let mut builder = Client::builder();
        if let Some(secs) = server.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self::with_http(http, &server.url))
    }

    fn with_http(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and turn any non-2xx status into `ClientError::Server`.
    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url().path(), %status, "server responded");
        if !status.is_success() {
            return Err(ClientError::Server { status });
        }
        Ok(response)
    }

    // ── Documents ──

    /// List all documents of the token's owner.
    ///
    /// With `decrypt`, every entry's `name` and `keys` are replaced by the
    /// plaintext filename and the base64 document key. Content is never
    /// fetched. One undecryptable entry fails the whole listing.
    pub async fn list_documents(
        &self,
        personal_key: Option<&PersonalKey>,
        access_token: &str,
        decrypt: bool,
    ) -> ClientResult<Vec<Document>> {
        let personal_key = if decrypt {
            Some(personal_key.ok_or(ClientError::MissingKey)?)
        } else {
            None
        };

        let mut documents: Vec<Document> = self
            .send(self.http.get(self.url("/documents")).bearer_auth(access_token))
            .await?
            .json()
            .await?;
        debug!(count = documents.len(), decrypt, "listed documents");

        if let Some(personal_key) = personal_key {
            for document in &mut documents {
                let (document_key, name) =
                    envelope::unwrap(&document.name, &document.keys, personal_key)?;
                document.name = name;
                document.keys = document_key.to_base64();
            }
        }

        Ok(documents)
    }

    /// Download one document.
    ///
    /// The id is first resolved against the (encrypted) listing to obtain the
    /// document's wrapped key; an unknown id fails with `NotFound` before the
    /// download is attempted.
    pub async fn get_document(
        &self,
        personal_key: Option<&PersonalKey>,
        access_token: &str,
        document_id: i64,
        decrypt: bool,
    ) -> ClientResult<FetchedDocument> {
        if decrypt && personal_key.is_none() {
            return Err(ClientError::MissingKey);
        }

        let listed = self
            .list_documents(None, access_token, false)
            .await?
            .into_iter()
            .find(|doc| doc.id == document_id)
            .ok_or(ClientError::NotFound(document_id))?;

        let response = self
            .send(
                self.http
                    .get(self.url(&format!("/documents/{document_id}")))
                    .bearer_auth(access_token),
            )
            .await?;

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition::filename)
            .ok_or(ClientError::MissingFilename)?;

        let content = response.bytes().await?.to_vec();
        debug!(document_id, bytes = content.len(), decrypt, "fetched document");

        match personal_key.filter(|_| decrypt) {
            Some(personal_key) => {
                let (document_key, filename) =
                    envelope::unwrap(&filename, &listed.keys, personal_key)?;
                let content = envelope::unwrap_content(&content, &document_key)?;
                Ok(FetchedDocument {
                    filename,
                    content,
                    keys: document_key.to_base64(),
                    decrypted: true,
                })
            }
            None => Ok(FetchedDocument {
                filename,
                content,
                keys: listed.keys,
                decrypted: false,
            }),
        }
    }

    /// Upload one document as a multipart form of `name`, `file` and `keys`.
    ///
    /// With `encrypt`, all three fields are ciphertext produced under a fresh
    /// document key. Without it the name and bytes are sent as given and
    /// `keys` carries a placeholder.
    pub async fn upload_document(
        &self,
        access_token: &str,
        personal_key: Option<&PersonalKey>,
        content: Vec<u8>,
        name: &str,
        encrypt: bool,
    ) -> ClientResult<()> {
        let (name, content, keys) = if encrypt {
            let personal_key = personal_key.ok_or(ClientError::MissingKey)?;
            let sealed = envelope::wrap(name, &content, personal_key)?;
            (
                sealed.encrypted_name,
                sealed.encrypted_content,
                sealed.wrapped_key,
            )
        } else {
            (name.to_string(), content, KEYS_PLACEHOLDER.to_string())
        };

        let bytes = content.len();
        // The server only treats a part as an uploaded file when it has a filename.
        let file = Part::bytes(content)
            .file_name("blob")
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("name", name)
            .part("file", file)
            .text("keys", keys);

        self.send(
            self.http
                .post(self.url("/documents"))
                .bearer_auth(access_token)
                .multipart(form),
        )
        .await?;
        debug!(bytes, encrypt, "uploaded document");
        Ok(())
    }

    /// Remove one document from the server.
    pub async fn delete_document(&self, access_token: &str, document_id: i64) -> ClientResult<()> {
        self.send(
            self.http
                .delete(self.url(&format!("/documents/{document_id}")))
                .bearer_auth(access_token),
        )
        .await?;
        debug!(document_id, "deleted document");
        Ok(())
    }

    // ── Accounts ──

    /// Exchange a username and password for an access token.
    ///
    /// 401/403, or a success response without a token, is
    /// `InvalidCredentials`; any other non-2xx status is `Server`.
    pub async fn login(&self, username: &str, password: &SecretString) -> ClientResult<String> {
        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let response = self
            .http
            .post(self.url("/accounts/login"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        debug!(%status, "login responded");
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(ClientError::Server { status });
        }
        let response: LoginResponse = response.json().await?;

        let token = response
            .access_token
            .as_ref()
            .and_then(value_to_text)
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::InvalidCredentials)?;
        debug!(username, "logged in");
        Ok(token)
    }

    /// Ask the server who the access token belongs to.
    pub async fn whoami(&self, access_token: &str) -> ClientResult<String> {
        let info: AccountInfo = self
            .send(self.http.get(self.url("/accounts")).bearer_auth(access_token))
            .await?
            .json()
            .await?;
        value_to_text(&info.sub)
            .ok_or_else(|| ClientError::UnexpectedResponse("account has no subject".into()))
    }
}

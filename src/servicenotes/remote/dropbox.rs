use super::RemoteStore;
use crate::error::{NotesError, Result};
use crate::store::local::write_atomic;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";
const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct FileMetadata {
    server_modified: DateTime<Utc>,
}

/// Dropbox HTTP API v2 client for a single file.
///
/// A fresh blocking client is built per call so the remote can be shared
/// freely between threads and dropped from any context.
pub struct DropboxRemote {
    token: String,
    api_base: String,
    content_base: String,
}

impl DropboxRemote {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: API_BASE.to_string(),
            content_base: CONTENT_BASE.to_string(),
        }
    }

    /// Point the client at other hosts (proxies, test servers).
    pub fn with_base_urls(mut self, api_base: &str, content_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.content_base = content_base.trim_end_matches('/').to_string();
        self
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| NotesError::Remote(format!("http client setup failed: {e}")))
    }

    fn bearer(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| NotesError::Remote(format!("invalid auth header: {e}")))
    }

    fn check(response: Response, what: &str, path: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(NotesError::Remote(format!(
            "{what} failed status={status} path={path}: {}",
            body.trim()
        )))
    }
}

/// Dropbox requires the `Dropbox-API-Arg` header to be pure ASCII, so any
/// non-ASCII character in the JSON is written as a `\uXXXX` escape.
pub(crate) fn api_arg(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

impl RemoteStore for DropboxRemote {
    fn kind(&self) -> &'static str {
        "dropbox"
    }

    #[instrument(name = "dropbox_get_metadata", skip(self))]
    fn modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let response = self
            .client()?
            .post(format!("{}/files/get_metadata", self.api_base))
            .header(AUTHORIZATION, self.bearer()?)
            .json(&json!({ "path": path }))
            .send()
            .map_err(|e| NotesError::Remote(format!("get_metadata request failed: {e}")))?;
        let meta: FileMetadata = Self::check(response, "get_metadata", path)?
            .json()
            .map_err(|e| NotesError::Remote(format!("unexpected metadata body: {e}")))?;
        Ok(meta.server_modified)
    }

    #[instrument(name = "dropbox_download", skip(self, local))]
    fn download(&self, path: &str, local: &Path) -> Result<()> {
        let response = self
            .client()?
            .post(format!("{}/files/download", self.content_base))
            .header(AUTHORIZATION, self.bearer()?)
            .header(API_ARG_HEADER, api_arg(&json!({ "path": path })))
            .send()
            .map_err(|e| NotesError::Remote(format!("download request failed: {e}")))?;
        let bytes = Self::check(response, "download", path)?
            .bytes()
            .map_err(|e| NotesError::Remote(format!("read body failed: {e}")))?;
        write_atomic(local, &bytes)?;
        debug!(bytes = bytes.len(), "downloaded remote object");
        Ok(())
    }

    #[instrument(name = "dropbox_upload", skip(self, local))]
    fn upload(&self, local: &Path, path: &str) -> Result<()> {
        let body = fs::read(local)?;
        let len = body.len();
        let arg = json!({ "path": path, "mode": "overwrite", "mute": true });
        let response = self
            .client()?
            .post(format!("{}/files/upload", self.content_base))
            .header(AUTHORIZATION, self.bearer()?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(API_ARG_HEADER, api_arg(&arg))
            .body(body)
            .send()
            .map_err(|e| NotesError::Remote(format!("upload request failed: {e}")))?;
        Self::check(response, "upload", path)?;
        debug!(bytes = len, "uploaded local file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const TOKEN: &str = "test-token";
    const STORED: &[u8] = b"[{\"theme\":\"Gra\xc3\xa7a\"}]\n";

    /// Requests the fake Dropbox saw on the upload endpoint.
    #[derive(Default)]
    struct Seen {
        uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
            == Some(&format!("Bearer {}", TOKEN)[..])
    }

    fn api_arg_of(headers: &HeaderMap) -> String {
        headers
            .get(API_ARG_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn get_metadata(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if body["path"] != "/notes.json" {
            return Err(StatusCode::CONFLICT);
        }
        Ok(Json(json!({
            ".tag": "file",
            "name": "notes.json",
            "server_modified": "2024-01-07T10:30:00Z"
        })))
    }

    async fn download(headers: HeaderMap) -> std::result::Result<Vec<u8>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if api_arg_of(&headers) != r#"{"path":"/notes.json"}"# {
            return Err(StatusCode::CONFLICT);
        }
        Ok(STORED.to_vec())
    }

    async fn upload(
        State(seen): State<Arc<Seen>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.uploads
            .lock()
            .unwrap()
            .push((api_arg_of(&headers), content_type, body.to_vec()));
        Ok(Json(json!({ "name": "notes.json" })))
    }

    /// Serve the three endpoints on a background thread; returns the base URL.
    fn fake_dropbox() -> (String, Arc<Seen>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Seen::default());
        let app = Router::new()
            .route("/2/files/get_metadata", post(get_metadata))
            .route("/2/files/download", post(download))
            .route("/2/files/upload", post(upload))
            .with_state(seen.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        (format!("http://{}/2", addr), seen)
    }

    #[test]
    fn metadata_download_and_upload_against_a_local_server() {
        let (base, seen) = fake_dropbox();
        let remote = DropboxRemote::new(TOKEN).with_base_urls(&base, &base);

        assert_eq!(
            remote.modified("/notes.json").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 7, 10, 30, 0).unwrap()
        );

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("notes.json");
        remote.download("/notes.json", &local).unwrap();
        assert_eq!(fs::read(&local).unwrap(), STORED);

        fs::write(&local, b"[]\n").unwrap();
        remote.upload(&local, "/anota\u{e7}\u{f5}es.json").unwrap();
        let uploads = seen.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (arg, content_type, body) = &uploads[0];
        assert!(arg.is_ascii());
        let arg: Value = serde_json::from_str(arg).unwrap();
        assert_eq!(arg["path"], "/anota\u{e7}\u{f5}es.json");
        assert_eq!(arg["mode"], "overwrite");
        assert_eq!(content_type, "application/octet-stream");
        assert_eq!(body, b"[]\n");
    }

    #[test]
    fn rejected_token_and_missing_object_are_remote_errors() {
        let (base, _seen) = fake_dropbox();

        let wrong_token = DropboxRemote::new("nope").with_base_urls(&base, &base);
        let err = wrong_token.modified("/notes.json").unwrap_err();
        assert!(matches!(err, NotesError::Remote(ref m) if m.contains("401")), "{}", err);

        let remote = DropboxRemote::new(TOKEN).with_base_urls(&base, &base);
        assert!(matches!(
            remote.modified("/other.json"),
            Err(NotesError::Remote(_))
        ));

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("notes.json");
        assert!(remote.download("/other.json", &local).is_err());
        assert!(!local.exists());
    }

    #[test]
    fn api_arg_escapes_non_ascii() {
        let arg = api_arg(&json!({ "path": "/anotações.json" }));
        assert!(arg.is_ascii());
        assert_eq!(arg, r#"{"path":"/anota\u00e7\u00f5es.json"}"#);
    }

    #[test]
    fn api_arg_escapes_astral_chars_as_surrogate_pairs() {
        let arg = api_arg(&json!({ "path": "/✝🙏" }));
        assert_eq!(arg, r#"{"path":"/\u271d\ud83d\ude4f"}"#);
    }

    #[test]
    fn metadata_parses_server_modified() {
        let body = r#"{".tag":"file","name":"notes.json","server_modified":"2024-01-07T10:30:00Z","size":12}"#;
        let meta: FileMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(meta.server_modified.to_rfc3339(), "2024-01-07T10:30:00+00:00");
    }

    #[test]
    fn base_urls_drop_trailing_slash() {
        let remote =
            DropboxRemote::new("t").with_base_urls("http://localhost:9/api/", "http://localhost:9/c/");
        assert_eq!(remote.api_base, "http://localhost:9/api");
        assert_eq!(remote.content_base, "http://localhost:9/c");
        assert_eq!(remote.kind(), "dropbox");
    }

    #[test]
    fn unreachable_host_is_a_remote_error() {
        let remote = DropboxRemote::new("t").with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = remote.modified("/notes.json").unwrap_err();
        assert!(matches!(err, NotesError::Remote(_)));
    }
}

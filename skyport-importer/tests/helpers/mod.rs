//! Test helpers for skyport-importer API tests
//!
//! Fake remote service plus request builders for driving the router with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::util::ServiceExt;

use skyport_importer::config::ServiceConfig;
use skyport_importer::types::{
    AccountConnector, PostRecord, RecordRef, RecordWriter, RemoteAccount, RemoteError,
};
use skyport_importer::{build_router, AppState};

pub const HANDLE: &str = "alice.bsky.social";
pub const PASSWORD: &str = "app-password";
pub const CREATED_AT: &str = "Wed Oct 10 20:19:24 +0000 2018";
const BOUNDARY: &str = "skyport-test-boundary";

/// Record writer that stores what it was asked to create
///
/// With a gate, every write waits for a permit first.
pub struct FakeWriter {
    account: RemoteAccount,
    gate: Option<Semaphore>,
    created: Mutex<Vec<PostRecord>>,
}

impl FakeWriter {
    pub fn new() -> Self {
        Self {
            account: RemoteAccount {
                did: "did:plc:alice".to_string(),
                handle: HANDLE.to_string(),
            },
            gate: None,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn created(&self) -> Vec<PostRecord> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordWriter for FakeWriter {
    fn account(&self) -> &RemoteAccount {
        &self.account
    }

    async fn create_record(
        &self,
        collection: &str,
        record: &PostRecord,
    ) -> Result<RecordRef, RemoteError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| RemoteError::Network(e.to_string()))?
                .forget();
        }

        let mut created = self.created.lock().unwrap();
        created.push(record.clone());
        Ok(RecordRef {
            uri: format!("at://{}/{}/{}", self.account.did, collection, created.len()),
            cid: format!("cid{}", created.len()),
        })
    }
}

/// Connector that accepts `PASSWORD` and hands out one shared writer
pub struct FakeConnector {
    writer: Arc<FakeWriter>,
}

#[async_trait::async_trait]
impl AccountConnector for FakeConnector {
    async fn connect(
        &self,
        _identifier: &str,
        password: &str,
    ) -> Result<Arc<dyn RecordWriter>, RemoteError> {
        if password != PASSWORD {
            return Err(RemoteError::Api {
                status: 401,
                error: "AuthenticationRequired".to_string(),
                message: "Invalid identifier or password".to_string(),
            });
        }
        let writer: Arc<dyn RecordWriter> = self.writer.clone();
        Ok(writer)
    }
}

/// Router wired to a fake remote service
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub writer: Arc<FakeWriter>,
    _temp_root: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_writer(FakeWriter::new())
    }

    pub fn with_writer(writer: FakeWriter) -> Self {
        let temp_root = tempfile::tempdir().expect("Failed to create temp dir");
        let config = ServiceConfig {
            temp_root: Some(temp_root.path().to_path_buf()),
            ..ServiceConfig::default()
        };
        let writer = Arc::new(writer);
        let connector = Arc::new(FakeConnector {
            writer: writer.clone(),
        });
        let state = AppState::new(config, connector);

        Self {
            router: build_router(state.clone()),
            state,
            writer,
            _temp_root: temp_root,
        }
    }

    /// Send a request, returning status, headers and the full body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    /// Log in and return the `Cookie` header value
    pub async fn login(&self) -> String {
        let (status, headers, _) = self
            .send(post_json("/login", None, json!({"handle": HANDLE, "password": PASSWORD})))
            .await;
        assert_eq!(status, StatusCode::OK);
        session_cookie(&headers).expect("login should set a session cookie")
    }

    pub async fn upload(&self, cookie: &str, filename: &str, content: &str) -> (StatusCode, Value) {
        self.send_json(multipart_upload(cookie, filename, content)).await
    }

    pub async fn start_import(&self, cookie: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(post_json("/import/start", Some(cookie), body)).await
    }

    /// Log in, upload `texts` and submit a selection; returns (cookie, handle)
    pub async fn prepare_import(&self, texts: &[&str], selection: Value) -> (String, String) {
        let cookie = self.login().await;
        let (status, _) = self.upload(&cookie, "tweets.js", &export_js(texts)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = self.start_import(&cookie, selection).await;
        assert_eq!(status, StatusCode::OK, "start_import failed: {}", json);
        let handle = json["selection"].as_str().unwrap().to_string();
        (cookie, handle)
    }
}

/// `name=value` part of the session Set-Cookie header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn multipart_upload(cookie: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/javascript\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Archive export file containing `texts`, all with the same timestamp
pub fn export_js(texts: &[&str]) -> String {
    let entries: Vec<Value> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({"tweet": {"id_str": i.to_string(), "full_text": text, "created_at": CREATED_AT}})
        })
        .collect();
    format!("window.YTD.tweets.part0 = {}", Value::Array(entries))
}

/// JSON payloads of the `data:` lines of an SSE body
pub fn sse_frames(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

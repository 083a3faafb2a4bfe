//! A fake Yandex Disk API for client tests: records every call it sees
//! and fails on demand.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};

/// Everything the fake Disk observed, plus knobs to make it misbehave.
#[derive(Debug, Default)]
pub struct DiskRecorder {
    /// Calls in arrival order: "mkdir {path}", "upload-url {path}
    /// overwrite={flag}", "write {path}"
    pub log: Mutex<Vec<String>>,
    /// Successfully written files as (path, bytes)
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    /// Answer folder creation with 409 instead of 201
    pub folders_exist: AtomicBool,
    /// Refuse folder creation with a 500
    pub fail_folders: AtomicBool,
    /// Refuse to hand out an upload URL (409, path taken)
    pub fail_upload_url: AtomicBool,
    /// Refuse the byte transfer with a 500
    pub fail_write: AtomicBool,
}

#[derive(Clone)]
struct ServerState {
    recorder: Arc<DiskRecorder>,
    addr: SocketAddr,
}

/// Bind the fake API to an ephemeral port. Returns the base URL to point
/// a client at and the shared recorder.
pub async fn spawn_fake_disk() -> (String, Arc<DiskRecorder>) {
    let recorder = Arc::new(DiskRecorder::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = ServerState {
        recorder: recorder.clone(),
        addr,
    };
    let app = Router::new()
        .route("/v1/disk/resources", put(create_folder))
        .route("/v1/disk/resources/upload", get(upload_url))
        .route("/upload/{*slot}", put(write_bytes))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/disk", addr), recorder)
}

async fn create_folder(
    State(st): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    let path = params.get("path").cloned().unwrap_or_default();
    st.recorder.log.lock().unwrap().push(format!("mkdir {}", path));

    if st.recorder.fail_folders.load(Ordering::SeqCst) {
        (StatusCode::INTERNAL_SERVER_ERROR, "mkdir refused")
    } else if st.recorder.folders_exist.load(Ordering::SeqCst) {
        (StatusCode::CONFLICT, "folder already exists")
    } else {
        (StatusCode::CREATED, "")
    }
}

async fn upload_url(
    State(st): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let path = params.get("path").cloned().unwrap_or_default();
    let overwrite = params.get("overwrite").cloned().unwrap_or_default();
    st.recorder
        .log
        .lock()
        .unwrap()
        .push(format!("upload-url {} overwrite={}", path, overwrite));

    if st.recorder.fail_upload_url.load(Ordering::SeqCst) {
        return (StatusCode::CONFLICT, "resource already exists").into_response();
    }

    let href = format!("http://{}/upload/{}", st.addr, path);
    Json(serde_json::json!({
        "href": href,
        "method": "PUT",
        "templated": false,
    }))
    .into_response()
}

async fn write_bytes(
    State(st): State<ServerState>,
    Path(slot): Path<String>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    st.recorder.log.lock().unwrap().push(format!("write {}", slot));

    if st.recorder.fail_write.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "write failed");
    }
    st.recorder
        .uploads
        .lock()
        .unwrap()
        .push((slot, body.to_vec()));
    (StatusCode::CREATED, "")
}

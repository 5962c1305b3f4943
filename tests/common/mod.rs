//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Multipart;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use image_relay::config::RelayConfig;
use image_relay::http::HttpServer;
use image_relay::lifecycle::Shutdown;
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;

/// One multipart part as the mock downstream received it.
#[derive(Debug, Clone)]
pub struct ReceivedImage {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub request_id: Option<String>,
}

/// What the mock downstream has seen so far.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<AtomicUsize>,
    images: Arc<Mutex<Vec<ReceivedImage>>>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn images(&self) -> Vec<ReceivedImage> {
        self.images.lock().unwrap().clone()
    }
}

/// A running mock downstream.
pub struct MockDownstream {
    pub url: String,
    pub recorder: Recorder,
}

/// Start a programmable downstream at `/process`.
///
/// `f` sees the first multipart part of each call and returns the status
/// and JSON text to answer with.
pub async fn start_programmable_downstream<F, Fut>(f: F) -> MockDownstream
where
    F: Fn(ReceivedImage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorder = Recorder::default();
    let f = Arc::new(f);

    let rec = recorder.clone();
    let app = Router::new().route(
        "/process",
        post(move |headers: HeaderMap, mut multipart: Multipart| {
            let f = f.clone();
            let rec = rec.clone();
            async move {
                rec.calls.fetch_add(1, Ordering::SeqCst);

                let field = multipart
                    .next_field()
                    .await
                    .unwrap()
                    .expect("downstream call carried no parts");
                let image = ReceivedImage {
                    field: field.name().unwrap_or_default().to_string(),
                    file_name: field.file_name().map(str::to_string),
                    content_type: field.content_type().map(str::to_string),
                    request_id: headers
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    bytes: field.bytes().await.unwrap().to_vec(),
                };
                rec.images.lock().unwrap().push(image.clone());

                let (status, body) = f(image).await;
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }
        }),
    );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockDownstream {
        url: format!("http://{}/process", addr),
        recorder,
    }
}

/// Start a downstream that always answers with the same status and body.
pub async fn start_fixed_downstream(status: u16, body: &'static str) -> MockDownstream {
    start_programmable_downstream(move |_| async move { (status, body.to_string()) }).await
}

/// An address nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/process", addr)
}

/// Relay config pointing at `downstream_url` and staging into `upload_dir`.
pub fn relay_config(downstream_url: &str, upload_dir: &Path) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.downstream.url = downstream_url.to_string();
    config.upload.directory = upload_dir.to_path_buf();
    config
}

/// A running relay under test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    shutdown: Shutdown,
}

impl TestRelay {
    pub fn endpoint(&self) -> String {
        format!("http://{}/api/process-image", self.addr)
    }

    /// Files currently staged in the upload directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        staged_files(&self.upload_dir)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let upload_dir = config.upload.directory.clone();
    image_relay::lifecycle::prepare_upload_dir(&upload_dir)
        .await
        .unwrap();

    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestRelay {
        addr,
        upload_dir,
        shutdown,
    }
}

pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// A form with one file part under `image`.
pub fn image_form(bytes: &'static [u8], file_name: &str, mime: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap();
    Form::new().part("image", part)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR fake image payload";

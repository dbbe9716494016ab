#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use media_squeeze::video::{VideoEncodeParams, VideoEncoder};
use media_squeeze::{router, AppState, CompressionError, ServerConfig};
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "media-squeeze-test-boundary";

/// Stands in for the external encoder; writes `output_len` bytes.
pub struct FakeEncoder {
    pub available: bool,
    pub failure: Option<String>,
    pub output_len: usize,
    pub calls: Mutex<Vec<VideoEncodeParams>>,
}

impl FakeEncoder {
    pub fn working(output_len: usize) -> Self {
        Self {
            available: true,
            failure: None,
            output_len,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::working(0)
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::working(0)
        }
    }
}

impl VideoEncoder for FakeEncoder {
    fn probe(&self) -> media_squeeze::Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(CompressionError::BackendUnavailable(
                "FFmpeg is not installed. Please install FFmpeg to compress videos.".into(),
            ))
        }
    }

    fn encode(
        &self,
        _input: &Path,
        output: &Path,
        params: &VideoEncodeParams,
    ) -> media_squeeze::Result<()> {
        self.calls.lock().unwrap().push(params.clone());
        if let Some(message) = &self.failure {
            return Err(CompressionError::BackendFailure(message.clone()));
        }
        std::fs::write(output, vec![7u8; self.output_len])?;
        Ok(())
    }
}

pub struct TestApp {
    router: Router,
    pub dir: TempDir,
    pub encoder: Arc<FakeEncoder>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_encoder(FakeEncoder::working(100))
    }

    pub fn with_encoder(encoder: FakeEncoder) -> Self {
        Self::with_config(encoder, |_| {})
    }

    pub fn with_config(encoder: FakeEncoder, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = ServerConfig::for_root(dir.path());
        tweak(&mut config);
        config.store().ensure_dirs().unwrap();

        let encoder = Arc::new(encoder);
        let state = AppState::new(config, encoder.clone());
        Self {
            router: router(state),
            dir,
            encoder,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn compressed_dir(&self) -> PathBuf {
        self.dir.path().join("compressed")
    }

    pub fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn upload(&self, filename: &str, file_type: Option<&str>, bytes: &[u8]) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(filename, file_type, bytes)))
            .unwrap();
        self.send(request).await
    }
}

pub fn multipart_body(filename: &str, file_type: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(kind) = file_type {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file_type\"\r\n\r\n{}\r\n",
                BOUNDARY, kind
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A PNG with a horizontal gradient and partial transparency.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, if x % 2 == 0 { 255 } else { 90 }])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

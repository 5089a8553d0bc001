//! # エンドポイントテスト用共通ヘルパー

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use base64::Engine;
use image::{Rgb, RgbImage};
use photomint_core::image_codec::{self, b64, OutputFormat};
use photomint_core::BlockDctTransport;

use crate::config::{ServiceConfig, ServiceState};

/// BlockDctTransportとデフォルト設定で共有状態を構築する。
pub fn test_state() -> Arc<ServiceState> {
    Arc::new(ServiceState {
        transport: Box::new(BlockDctTransport::default()),
        config: ServiceConfig::default(),
    })
}

pub fn test_photo() -> RgbImage {
    RgbImage::from_fn(256, 256, |x, y| {
        Rgb([(40 + x % 150) as u8, (60 + y % 120) as u8, 110])
    })
}

pub fn test_photo_png() -> Vec<u8> {
    image_codec::encode_image(&test_photo(), OutputFormat::Png, 95).unwrap()
}

/// テスト画像をPNGでエンコードしたBase64文字列。
pub fn test_photo_b64() -> String {
    b64().encode(test_photo_png())
}

const BOUNDARY: &str = "photomint-test-boundary";

/// テキストフィールドと任意の `file` パートを持つ `multipart/form-data` リクエスト。
pub fn multipart_request(uri: &str, fields: &[(&str, &str)], file: Option<&[u8]>) -> Request {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, value: serde_json::Value) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

//! # リクエストボディの受け口
//!
//! `/embed` と `/extract` はJSON（画像はBase64文字列）と
//! `multipart/form-data`（画像は `file` パート）の両方を受け付ける。
//! どちらの形でも同じリクエスト型に正規化してハンドラへ渡す。

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use photomint_core::image_codec::b64;
use photomint_types::{EmbedRequest, ExtractRequest};
use serde::de::DeserializeOwned;

use crate::error::ServiceError;

/// フォームのフィールドからリクエスト型を組み立てるためのトレイト。
pub trait FormFields: Default {
    /// `file` パートのバイト列をBase64化して画像として設定する。
    fn set_image(&mut self, image_b64: String);

    /// テキストフィールドを設定する。未知のフィールドは無視する。
    fn set_field(&mut self, name: &str, value: String) -> Result<(), ServiceError>;
}

impl FormFields for EmbedRequest {
    fn set_image(&mut self, image_b64: String) {
        self.image = Some(image_b64);
    }

    fn set_field(&mut self, name: &str, value: String) -> Result<(), ServiceError> {
        match name {
            "token_id" => self.token_id = Some(value),
            "creator_address" => self.creator_address = Some(value),
            "custom_data" => self.custom_data = Some(value),
            "output_format" => self.output_format = Some(value),
            "quality" => self.quality = parse_number(name, &value)?,
            _ => {}
        }
        Ok(())
    }
}

impl FormFields for ExtractRequest {
    fn set_image(&mut self, image_b64: String) {
        self.image = Some(image_b64);
    }

    fn set_field(&mut self, name: &str, value: String) -> Result<(), ServiceError> {
        if name == "expected_payload_size" {
            self.expected_payload_size = parse_number(name, &value)?;
        }
        Ok(())
    }
}

/// 空文字列は未指定として扱う。
fn parse_number<N: std::str::FromStr>(name: &str, value: &str) -> Result<Option<N>, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ServiceError::BadRequest(format!("{name}が不正です: {value}")))
}

/// Content-Typeを見てJSONかフォームかを振り分けるエクストラクタ。
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + FormFields + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(value));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        read_form(&mut multipart)
            .await
            .map(Self)
            .map_err(IntoResponse::into_response)
    }
}

async fn read_form<T: FormFields>(multipart: &mut Multipart) -> Result<T, ServiceError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ServiceError::BadRequest(format!("フォームの読み取りに失敗しました: {e}"))
    };

    let mut request = T::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(malformed)?;
                if !bytes.is_empty() {
                    request.set_image(b64().encode(&bytes));
                }
            }
            "image" => {
                let text = field.text().await.map_err(malformed)?;
                request.set_image(text);
            }
            _ => {
                let text = field.text().await.map_err(malformed)?;
                request.set_field(&name, text)?;
            }
        }
    }
    Ok(request)
}

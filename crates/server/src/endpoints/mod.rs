//! # HTTPエンドポイント
//!
//! - `GET /health` — 稼働確認
//! - `POST /embed` — 来歴ペイロードの埋め込み
//! - `POST /extract` — 透かしの抽出
//! - `POST /verify` — 多段階検証
//!
//! `/embed` と `/extract` はJSONと `multipart/form-data` の両方を受け付ける。
//! 画像処理はCPUバウンドのため `spawn_blocking` で実行する。

pub mod embed;
pub mod extract;
pub mod health;
pub mod request;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use embed::handle_embed;
pub use extract::handle_extract;
pub use health::handle_health;
pub use request::JsonOrForm;
pub use verify::handle_verify;

use image::RgbImage;
use photomint_core::image_codec;

use crate::error::ServiceError;

/// リクエストの `image` フィールドを必須チェックする。
fn require_image(image: Option<String>) -> Result<String, ServiceError> {
    image
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("画像が指定されていません".into()))
}

/// Base64画像をデコードしてRGBラスタにする。
fn decode_request_image(image_b64: &str) -> Result<RgbImage, ServiceError> {
    let bytes = image_codec::decode_base64_image(image_b64)?;
    Ok(image_codec::decode_image(&bytes)?)
}

/// CPUバウンドな処理をブロッキングスレッドで実行する。
async fn run_blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("ワーカースレッドが異常終了しました: {e}")))?
}

//! # /embed ハンドラ
//!
//! 1. 必須項目（image, token_id, creator_address）を検証
//! 2. 画像をデコード
//! 3. 来歴ペイロードを生成して埋め込み
//! 4. 指定フォーマットで再エンコードしBase64で返却

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::Engine;
use photomint_core::image_codec::b64;
use photomint_core::{embed_watermark, EmbedParams, OutputFormat};
use photomint_types::{EmbedRequest, EmbedResponse};

use crate::config::ServiceState;
use crate::error::ServiceError;

use super::{decode_request_image, require_image, run_blocking, JsonOrForm};

/// POST /embed
pub async fn handle_embed(
    State(state): State<Arc<ServiceState>>,
    JsonOrForm(request): JsonOrForm<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ServiceError> {
    let image_b64 = require_image(request.image)?;
    let (token_id, creator_address) = match (request.token_id, request.creator_address) {
        (Some(t), Some(c)) if !t.is_empty() && !c.is_empty() => (t, c),
        _ => {
            return Err(ServiceError::BadRequest(
                "token_idとcreator_addressは必須です".into(),
            ))
        }
    };
    let custom_data = request.custom_data.unwrap_or_default();
    let format = request
        .output_format
        .as_deref()
        .map(OutputFormat::parse)
        .unwrap_or(state.config.default_format);
    let quality = request.quality.unwrap_or(state.config.default_quality);

    let worker = Arc::clone(&state);
    let outcome = run_blocking(move || {
        let image = decode_request_image(&image_b64)?;
        let params = EmbedParams {
            token_id: &token_id,
            creator_address: &creator_address,
            custom_data: &custom_data,
            format,
            quality,
        };
        Ok(embed_watermark(
            worker.transport.as_ref(),
            &worker.config.method,
            &image,
            &params,
        )?)
    })
    .await?;

    tracing::info!(
        payload_size = outcome.payload_size,
        format = outcome.format.as_str(),
        "透かしの埋め込みが完了しました"
    );

    Ok(Json(EmbedResponse {
        success: true,
        watermarked_image: b64().encode(&outcome.watermarked_bytes),
        payload: outcome.payload,
        payload_size: outcome.payload_size,
        method: outcome.method,
        original_sha256: outcome.original_sha256,
        watermarked_sha256: outcome.watermarked_sha256,
        format: outcome.format.as_str().to_string(),
        timestamp: outcome.timestamp,
    }))
}

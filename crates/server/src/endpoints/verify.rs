//! # /verify ハンドラ
//!
//! 画像と任意の期待値（SHA-256、tokenId、creator）を受け取り、
//! 多段階検証の結果をそのまま返す。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use photomint_core::verify_image;
use photomint_types::{VerificationResult, VerifyRequest};

use crate::config::ServiceState;
use crate::error::ServiceError;

use super::{decode_request_image, require_image, run_blocking};

/// POST /verify
pub async fn handle_verify(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerificationResult>, ServiceError> {
    let image_b64 = require_image(request.image)?;
    let expectations = request.expectations;

    let worker = Arc::clone(&state);
    let result = run_blocking(move || {
        let image = decode_request_image(&image_b64)?;
        Ok(verify_image(
            worker.transport.as_ref(),
            &worker.config.method,
            &image,
            &expectations,
        ))
    })
    .await?;

    tracing::info!(
        overall_result = ?result.overall_result,
        confidence = result.confidence,
        "検証が完了しました"
    );
    Ok(Json(result))
}

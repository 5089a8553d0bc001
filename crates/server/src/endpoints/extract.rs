//! # /extract ハンドラ
//!
//! 透かしが見つからない場合もHTTP 200で `watermark_found: false` を返す。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use photomint_core::{extract_watermark, ExtractOutcome};
use photomint_types::{ExtractRequest, ExtractResponse, MAX_PAYLOAD_SIZE};

use crate::config::ServiceState;
use crate::error::ServiceError;

use super::{decode_request_image, require_image, run_blocking, JsonOrForm};

/// POST /extract
pub async fn handle_extract(
    State(state): State<Arc<ServiceState>>,
    JsonOrForm(request): JsonOrForm<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ServiceError> {
    let image_b64 = require_image(request.image)?;
    let expected_len = request.expected_payload_size.unwrap_or(MAX_PAYLOAD_SIZE);
    if !(1..=MAX_PAYLOAD_SIZE).contains(&expected_len) {
        return Err(ServiceError::BadRequest(format!(
            "expected_payload_sizeは1〜{MAX_PAYLOAD_SIZE}である必要があります: {expected_len}"
        )));
    }

    let worker = Arc::clone(&state);
    let outcome = run_blocking(move || {
        let image = decode_request_image(&image_b64)?;
        Ok(extract_watermark(
            worker.transport.as_ref(),
            &worker.config.method,
            &image,
            expected_len,
        ))
    })
    .await?;

    let method = state.config.method.clone();
    let extraction_timestamp = Utc::now().timestamp();
    let response = match outcome {
        ExtractOutcome::Found { payload, parsed } => {
            let error = parsed
                .is_none()
                .then(|| "Invalid payload format or checksum mismatch".to_string());
            ExtractResponse {
                success: true,
                watermark_found: true,
                payload: Some(payload),
                parsed,
                error,
                method,
                extraction_timestamp,
            }
        }
        ExtractOutcome::NotFound { error } => ExtractResponse {
            success: true,
            watermark_found: false,
            payload: None,
            parsed: None,
            error: Some(format!("No watermark detected: {error}")),
            method,
            extraction_timestamp,
        },
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::embed::handle_embed;
    use crate::endpoints::test_helpers::{multipart_request, test_photo_b64, test_state};
    use axum::extract::FromRequest;
    use base64::Engine;
    use photomint_core::image_codec::b64;
    use photomint_types::EmbedRequest;

    async fn embedded_png_b64() -> String {
        let request = EmbedRequest {
            image: Some(test_photo_b64()),
            token_id: Some("42".into()),
            creator_address: Some("0xABCDEF1234567890".into()),
            custom_data: Some("demo".into()),
            output_format: Some("PNG".into()),
            quality: None,
        };
        let Json(res) = handle_embed(State(test_state()), JsonOrForm(request)).await.unwrap();
        res.watermarked_image
    }

    #[tokio::test]
    async fn test_extract_parses_embedded_payload() {
        let request = ExtractRequest {
            image: Some(embedded_png_b64().await),
            expected_payload_size: None,
        };
        let Json(res) = handle_extract(State(test_state()), JsonOrForm(request)).await.unwrap();

        assert!(res.success);
        assert!(res.watermark_found);
        assert!(res.error.is_none());
        let parsed = res.parsed.unwrap();
        assert!(parsed.valid);
        assert_eq!(parsed.token_id, "42");
        assert_eq!(parsed.creator_address, "0xABCDEF12");
        assert_eq!(parsed.custom_data, "demo");
        assert_eq!(res.payload.unwrap().split('|').count(), 6);
    }

    #[tokio::test]
    async fn test_extract_without_watermark() {
        let request = ExtractRequest {
            image: Some(test_photo_b64()),
            expected_payload_size: Some(64),
        };
        let Json(res) = handle_extract(State(test_state()), JsonOrForm(request)).await.unwrap();
        assert!(res.success);
        assert!(!res.watermark_found);
        assert!(res.payload.is_none());
        assert!(res.error.unwrap().starts_with("No watermark detected"));
    }

    #[tokio::test]
    async fn test_extract_rejects_missing_image_and_bad_size() {
        let err = handle_extract(
            State(test_state()),
            JsonOrForm(ExtractRequest {
                image: None,
                expected_payload_size: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = handle_extract(
            State(test_state()),
            JsonOrForm(ExtractRequest {
                image: Some(test_photo_b64()),
                expected_payload_size: Some(0),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = handle_extract(
            State(test_state()),
            JsonOrForm(ExtractRequest {
                image: Some(test_photo_b64()),
                expected_payload_size: Some(MAX_PAYLOAD_SIZE + 1),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_extract_accepts_multipart_upload() {
        let png = b64().decode(embedded_png_b64().await).unwrap();
        let req = multipart_request(
            "/extract",
            &[("expected_payload_size", "64")],
            Some(png.as_slice()),
        );
        let form = JsonOrForm::<ExtractRequest>::from_request(req, &()).await.unwrap();
        let Json(res) = handle_extract(State(test_state()), form).await.unwrap();

        assert!(res.watermark_found);
        let parsed = res.parsed.unwrap();
        assert!(parsed.valid);
        assert_eq!(parsed.token_id, "42");
        assert_eq!(parsed.custom_data, "demo");
    }

    #[tokio::test]
    async fn test_multipart_extract_validates_expected_size() {
        let png = b64().decode(test_photo_b64()).unwrap();
        let req = multipart_request(
            "/extract",
            &[("expected_payload_size", "65")],
            Some(png.as_slice()),
        );
        let form = JsonOrForm::<ExtractRequest>::from_request(req, &()).await.unwrap();
        let err = handle_extract(State(test_state()), form).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }
}

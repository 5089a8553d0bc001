//! # サービスエラー型
//!
//! 全エンドポイントで共通のエラー型。レスポンスボディは `{"error": "..."}`。

use axum::http::StatusCode;
use axum::Json;
use photomint_core::{CoreError, TransportError};
use photomint_types::ErrorResponse;

/// サービスエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// 不正なリクエスト（必須項目の欠落、Base64・画像デコード失敗）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 内部エラー（エンコード失敗、ワーカー異常終了）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        match &e {
            CoreError::MissingField(_)
            | CoreError::InvalidImage(_)
            | CoreError::InvalidBase64(_)
            | CoreError::Transport(TransportError::ImageTooSmall { .. }) => {
                ServiceError::BadRequest(e.to_string())
            }
            CoreError::ImageEncode(_) | CoreError::Transport(_) => {
                ServiceError::Internal(e.to_string())
            }
        }
    }
}

impl axum::response::IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "リクエスト処理に失敗しました");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            ServiceError::from(CoreError::MissingField("token_id")),
            ServiceError::BadRequest(_)
        ));
        assert!(matches!(
            ServiceError::from(CoreError::Transport(TransportError::ImageTooSmall {
                required: 600,
                available: 4
            })),
            ServiceError::BadRequest(_)
        ));
        assert!(matches!(
            ServiceError::from(CoreError::ImageEncode("x".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        let res = ServiceError::BadRequest("x".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = ServiceError::Internal("x".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

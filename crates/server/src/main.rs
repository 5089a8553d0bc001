//! # PhotoMint 透かしサービス
//!
//! 来歴ペイロードの埋め込み・抽出・多段階検証をHTTP JSON APIとして公開する。
//!
//! ## API エンドポイント
//! - `GET /health` — 稼働確認
//! - `POST /embed` — 透かし埋め込み
//! - `POST /extract` — 透かし抽出
//! - `POST /verify` — 多段階検証

mod config;
mod endpoints;
mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use photomint_core::BlockDctTransport;

use crate::config::{ServiceConfig, ServiceState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        method = %config.method,
        default_format = config.default_format.as_str(),
        default_quality = config.default_quality,
        "設定を読み込みました"
    );

    let bind_addr = config.bind_addr.clone();
    let max_body_bytes = config.max_body_bytes;

    let state = Arc::new(ServiceState {
        transport: Box::new(BlockDctTransport::default()),
        config,
    });

    let app = axum::Router::new()
        .route("/health", axum::routing::get(endpoints::handle_health))
        .route("/embed", axum::routing::post(endpoints::handle_embed))
        .route("/extract", axum::routing::post(endpoints::handle_extract))
        .route("/verify", axum::routing::post(endpoints::handle_verify))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    tracing::info!("透かしサービスを {} で起動します", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

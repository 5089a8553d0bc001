//! # サービス設定・共有状態
//!
//! 起動時に環境変数から一度だけ読み込み、axumの `State` として各ハンドラへ注入する。

use anyhow::Context;
use photomint_core::image_codec::DEFAULT_JPEG_QUALITY;
use photomint_core::{OutputFormat, WatermarkTransport};
use photomint_types::DEFAULT_WATERMARK_METHOD;

/// デフォルトの待ち受けアドレス。
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5001";

/// リクエストボディの上限（Base64画像を含むため大きめ）。
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// サービス設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// 待ち受けアドレス（`BIND_ADDR`）
    pub bind_addr: String,
    /// 透かしアルゴリズム識別子（`WATERMARK_METHOD`）
    pub method: String,
    /// リクエストで省略されたときの出力フォーマット（`DEFAULT_OUTPUT_FORMAT`）
    pub default_format: OutputFormat,
    /// リクエストで省略されたときのJPEG品質（`DEFAULT_JPEG_QUALITY`）
    pub default_quality: u8,
    /// リクエストボディの上限バイト数（`MAX_BODY_BYTES`）
    pub max_body_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            method: DEFAULT_WATERMARK_METHOD.to_string(),
            default_format: OutputFormat::Jpeg,
            default_quality: DEFAULT_JPEG_QUALITY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServiceConfig {
    /// 環境変数から構築する。未設定の項目はデフォルト値を使う。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から構築する。
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let default_quality = match lookup("DEFAULT_JPEG_QUALITY") {
            Some(v) => {
                let quality: u8 = v
                    .parse()
                    .with_context(|| format!("DEFAULT_JPEG_QUALITYが不正です: {v}"))?;
                anyhow::ensure!(
                    (1..=100).contains(&quality),
                    "DEFAULT_JPEG_QUALITYは1〜100である必要があります: {quality}"
                );
                quality
            }
            None => defaults.default_quality,
        };

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("MAX_BODY_BYTESが不正です: {v}"))?,
            None => defaults.max_body_bytes,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            method: lookup("WATERMARK_METHOD")
                .filter(|m| !m.is_empty())
                .unwrap_or(defaults.method),
            default_format: lookup("DEFAULT_OUTPUT_FORMAT")
                .map(|f| OutputFormat::parse(&f))
                .unwrap_or(defaults.default_format),
            default_quality,
            max_body_bytes,
        })
    }
}

/// サービスの共有状態。
pub struct ServiceState {
    /// 透かしTransport実装
    pub transport: Box<dyn WatermarkTransport>,
    /// 起動時に確定した設定
    pub config: ServiceConfig,
}

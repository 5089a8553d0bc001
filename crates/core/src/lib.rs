//! # PhotoMint Core
//!
//! 画像に埋め込む来歴ペイロードのコーデックと、多段階の真正性検証を実装する。
//!
//! ## 処理フロー
//! 1. ミント時: 来歴レコードをエンコードし、Transportで画像に埋め込む
//! 2. 検証時: 再エンコード画像のSHA-256を比較する（Tier 1）
//! 3. 透かしを抽出し、ペイロードを検証・照合する（Tier 2）
//! 4. 知覚ハッシュ比較（Tier 3、現状は参照値がないため利用不可）
//! 5. 確信度の最大値から最終判定を下す

pub mod embed;
pub mod image_codec;
pub mod payload;
pub mod transport;
pub mod verify;

pub use embed::{
    embed_watermark, extract_default, extract_watermark, EmbedOutcome, EmbedParams,
    ExtractOutcome,
};
pub use image_codec::OutputFormat;
pub use payload::{decode_payload, encode_payload, encode_payload_at};
pub use transport::{BlockDctTransport, TransportError, WatermarkTransport};
pub use verify::{score_watermark, verdict_for, verify_image};

/// Coreモジュールのエラー型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// 必須フィールドの欠落
    #[error("必須フィールドがありません: {0}")]
    MissingField(&'static str),
    /// 画像デコードエラー
    #[error("画像のデコードに失敗しました: {0}")]
    InvalidImage(String),
    /// 画像エンコードエラー
    #[error("画像のエンコードに失敗しました: {0}")]
    ImageEncode(String),
    /// Base64デコードエラー
    #[error("Base64デコードに失敗しました: {0}")]
    InvalidBase64(String),
    /// 透かしTransportエラー
    #[error("透かしの埋め込みに失敗しました: {0}")]
    Transport(#[from] TransportError),
}

//! # 透かしTransport抽象化
//!
//! 画像ピクセルへの不透明なバイト列の埋め込み・抽出を抽象化するトレイト。
//! Payload CodecとVerification Engineはこのトレイトにのみ依存し、
//! 具体的なアルゴリズムは差し替え可能とする。
//!
//! 現在のTransport実装:
//! - `block_dct` — 8x8ブロックのDC係数に量子化インデックス変調で埋め込む

pub mod block_dct;

pub use block_dct::BlockDctTransport;

use image::RgbImage;

/// Transportのエラー型。
/// いずれもVerification Engineでは「透かしなし」として扱われる。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// 同期マーカーが見つからない（透かしが存在しない）
    #[error("透かしが検出されませんでした")]
    NotFound,
    /// 画像のブロック数がフレームのビット数に満たない
    #[error("画像が小さすぎます: {required}ブロック必要ですが{available}ブロックしかありません")]
    ImageTooSmall {
        /// 必要なブロック数
        required: usize,
        /// 画像から取れるブロック数
        available: usize,
    },
    /// ペイロード長が `MAX_PAYLOAD_SIZE` を超えている
    #[error("ペイロードが大きすぎます: {len}バイト（上限{max}バイト）")]
    PayloadTooLarge {
        len: usize,
        max: usize,
    },
}

/// 透かしTransportのトレイト。
///
/// `method` はアルゴリズム識別子（例: "dwtDct"）で、設定からそのまま渡される。
pub trait WatermarkTransport: Send + Sync {
    /// ペイロードを埋め込んだ画像を返す。元画像と視覚的に区別できないこと。
    fn embed(
        &self,
        image: &RgbImage,
        payload: &[u8],
        method: &str,
    ) -> Result<RgbImage, TransportError>;

    /// `expected_len` バイトのペイロードを復元する。
    /// 埋め込み時と異なる長さを指定した場合の結果は保証しない。
    fn decode(
        &self,
        image: &RgbImage,
        expected_len: usize,
        method: &str,
    ) -> Result<Vec<u8>, TransportError>;
}

//! # 透かしの埋め込みと抽出
//!
//! Payload Codec + Transport + 画像コーデックを組み合わせた、
//! ミント時の埋め込み処理と単体の抽出処理。

use chrono::Utc;
use image::RgbImage;
use photomint_types::{ProvenanceRecord, MAX_PAYLOAD_SIZE};

use crate::image_codec::{self, OutputFormat};
use crate::payload;
use crate::transport::WatermarkTransport;
use crate::CoreError;

/// 埋め込みの入力パラメータ。
#[derive(Debug, Clone)]
pub struct EmbedParams<'a> {
    pub token_id: &'a str,
    pub creator_address: &'a str,
    pub custom_data: &'a str,
    pub format: OutputFormat,
    /// JPEG品質
    pub quality: u8,
}

/// 埋め込み結果。
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    /// 透かし入り画像（エンコード済み）
    pub watermarked_bytes: Vec<u8>,
    /// 埋め込んだペイロード文字列
    pub payload: String,
    /// パディング前のペイロードのバイト数
    pub payload_size: usize,
    pub method: String,
    /// 元画像をJPEG品質95で再エンコードしたもののSHA-256
    pub original_sha256: String,
    /// 透かし入り画像バイト列のSHA-256
    pub watermarked_sha256: String,
    pub format: OutputFormat,
    pub timestamp: i64,
}

/// 抽出結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Transportが透かしを検出できなかった
    NotFound {
        /// Transportのエラー内容
        error: String,
    },
    /// 透かしを検出した（`parsed` がNoneならチェックサム不一致等）
    Found {
        payload: String,
        parsed: Option<ProvenanceRecord>,
    },
}

/// 来歴ペイロードを生成し、画像に埋め込む。
///
/// tokenIdとcreatorAddressは必須。ペイロードは `MAX_PAYLOAD_SIZE` バイトの
/// フレームにパディングしてからTransportへ渡す。
pub fn embed_watermark(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
    params: &EmbedParams<'_>,
) -> Result<EmbedOutcome, CoreError> {
    if params.token_id.is_empty() {
        return Err(CoreError::MissingField("token_id"));
    }
    if params.creator_address.is_empty() {
        return Err(CoreError::MissingField("creator_address"));
    }

    let timestamp = Utc::now().timestamp();
    let payload_bytes = payload::encode_payload_at(
        params.token_id,
        params.creator_address,
        params.custom_data,
        timestamp,
    );
    let payload_text = payload::payload_to_text(&payload_bytes);
    tracing::info!(payload = %payload_text, method, "透かしを埋め込みます");

    let frame = payload::pad_to_frame(&payload_bytes);
    let watermarked = transport.embed(image, &frame, method)?;
    let watermarked_bytes = image_codec::encode_image(&watermarked, params.format, params.quality)?;

    let original_sha256 = image_codec::reencoded_digest(image)?;
    let watermarked_sha256 = photomint_crypto::sha256_hex(&watermarked_bytes);

    Ok(EmbedOutcome {
        watermarked_bytes,
        payload: payload_text,
        payload_size: payload_bytes.len(),
        method: method.to_string(),
        original_sha256,
        watermarked_sha256,
        format: params.format,
        timestamp,
    })
}

/// 画像から透かしを抽出し、ペイロードを解析する。
///
/// `expected_len` は埋め込み時のフレーム長（通常 `MAX_PAYLOAD_SIZE`）と一致させること。
pub fn extract_watermark(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
    expected_len: usize,
) -> ExtractOutcome {
    match transport.decode(image, expected_len, method) {
        Ok(bytes) => {
            let parsed = payload::decode_payload(&bytes);
            if parsed.is_none() {
                tracing::warn!("ペイロードの形式が不正、またはチェックサムが一致しません");
            }
            ExtractOutcome::Found {
                payload: payload::payload_to_text(&bytes),
                parsed,
            }
        }
        Err(e) => {
            tracing::info!(error = %e, "透かしの抽出に失敗しました");
            ExtractOutcome::NotFound {
                error: e.to_string(),
            }
        }
    }
}

/// 埋め込み時と同じフレーム長で抽出する。
pub fn extract_default(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
) -> ExtractOutcome {
    extract_watermark(transport, method, image, MAX_PAYLOAD_SIZE)
}

//! # 多段階検証エンジン
//!
//! 証拠の強さの順にTierを実行し、最初に決定的な結果が出た時点で打ち切る。
//!
//! | Tier | 手法 | 確信度 |
//! |------|------|--------|
//! | 1 | 再エンコード画像のSHA-256完全一致 | 100 |
//! | 2 | 透かしペイロード（有効85 / tokenId一致90 / creator前方一致95） | 0〜95 |
//! | 3 | 知覚ハッシュ（参照値がないため常に利用不可） | 0 |
//!
//! Tier間でスコアを混ぜることはせず、最大値のみを採用する。

use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use image::RgbImage;
use photomint_types::{
    ExactHashLevel, PerceptualHashLevel, ProvenanceRecord, VerificationLevels, VerificationResult,
    Verdict, VerifyExpectations, WatermarkLevel, MAX_PAYLOAD_SIZE,
};

use crate::image_codec;
use crate::payload;
use crate::transport::WatermarkTransport;
use crate::CoreError;

/// Tier 1の手法名。
pub const EXACT_HASH_METHOD: &str = "SHA-256";
/// Tier 3の手法名。
pub const PERCEPTUAL_HASH_METHOD: &str = "pHash";
/// Tier 3が利用不可である理由。
pub const PERCEPTUAL_HASH_NOTE: &str = "Requires reference pHash for comparison";

const CONFIDENCE_EXACT_MATCH: u8 = 100;
const CONFIDENCE_VALID_WATERMARK: u8 = 85;
const CONFIDENCE_TOKEN_MATCH: u8 = 90;
const CONFIDENCE_CREATOR_MATCH: u8 = 95;

/// Tier 2でこれ以上なら即座にverifiedとする。
const WATERMARK_SHORT_CIRCUIT: u8 = 85;
/// 集約時のverified閾値。
const VERIFIED_THRESHOLD: u8 = 80;
/// 集約時のpartial閾値。
const PARTIAL_THRESHOLD: u8 = 50;

/// 画像の真正性を多段階で検証する。
///
/// 低レベルの失敗（再エンコード失敗、透かしなし、不正ペイロード）はエラーとして返さず、
/// 該当Tierの確信度0とエラー文字列として記録する。
pub fn verify_image(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
    expectations: &VerifyExpectations,
) -> VerificationResult {
    let current_digest = image_codec::reencoded_digest(image);
    verify_with_digest(transport, method, image, expectations, current_digest)
}

/// 算出済みの現在ダイジェスト（またはその失敗）を受け取って検証する。
fn verify_with_digest(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
    expectations: &VerifyExpectations,
    current_digest: Result<String, CoreError>,
) -> VerificationResult {
    let mut levels = VerificationLevels::default();

    // Tier 1: 完全一致ダイジェスト
    if let Some(expected) = expectations.sha256() {
        let level = exact_hash_level(expected, &current_digest);
        tracing::debug!(matched = level.matched, "Tier 1 (SHA-256) 完了");
        let matched = level.matched;
        levels.exact_hash = Some(level);
        if matched {
            return conclude(current_digest, levels, CONFIDENCE_EXACT_MATCH, Verdict::Verified);
        }
    }

    // Tier 2: 透かしペイロード
    let level = watermark_level(transport, method, image, expectations);
    tracing::debug!(
        found = level.found,
        valid = level.valid,
        confidence = level.confidence,
        "Tier 2 (透かし) 完了"
    );
    let watermark_confidence = level.confidence;
    let conclusive = level.valid && watermark_confidence >= WATERMARK_SHORT_CIRCUIT;
    levels.watermark = Some(level);
    if conclusive {
        return conclude(current_digest, levels, watermark_confidence, Verdict::Verified);
    }

    // Tier 3: 知覚ハッシュ（参照値が必要なため未実装）
    levels.perceptual_hash = Some(PerceptualHashLevel {
        method: PERCEPTUAL_HASH_METHOD.to_string(),
        available: false,
        note: PERCEPTUAL_HASH_NOTE.to_string(),
    });

    let confidence = levels.max_confidence();
    conclude(current_digest, levels, confidence, verdict_for(confidence))
}

/// 有効なペイロードを期待値と照合し、(確信度, 一致フラグ) を返す。
///
/// creatorの照合はtokenIdの後に行い、一致すれば確信度を上書きする。
/// 埋め込み側でcreatorが切り詰められているため、期待値がデコード値で始まるかを
/// 大文字小文字を区別せずに判定する。
pub fn score_watermark(record: &ProvenanceRecord, expectations: &VerifyExpectations) -> (u8, bool) {
    let mut confidence = CONFIDENCE_VALID_WATERMARK;
    let mut matched = false;

    if let Some(token_id) = expectations.token_id() {
        if record.token_id == token_id {
            confidence = CONFIDENCE_TOKEN_MATCH;
            matched = true;
        }
    }

    if let Some(creator) = expectations.creator() {
        if creator
            .to_lowercase()
            .starts_with(&record.creator_address.to_lowercase())
        {
            confidence = CONFIDENCE_CREATOR_MATCH;
            matched = true;
        }
    }

    (confidence, matched)
}

/// 集約後の確信度から最終判定を決める。
pub fn verdict_for(confidence: u8) -> Verdict {
    if confidence >= VERIFIED_THRESHOLD {
        Verdict::Verified
    } else if confidence >= PARTIAL_THRESHOLD {
        Verdict::Partial
    } else {
        Verdict::Unverified
    }
}

fn conclude(
    current_digest: Result<String, CoreError>,
    levels: VerificationLevels,
    confidence: u8,
    verdict: Verdict,
) -> VerificationResult {
    VerificationResult {
        current_sha256: current_digest.ok(),
        verification_levels: levels,
        overall_result: verdict,
        confidence,
        timestamp: Utc::now().timestamp(),
    }
}

fn exact_hash_level(
    expected: &str,
    current_digest: &Result<String, CoreError>,
) -> ExactHashLevel {
    match current_digest {
        Ok(actual) => {
            let matched = photomint_crypto::digest_eq_ignore_case(actual, expected);
            ExactHashLevel {
                method: EXACT_HASH_METHOD.to_string(),
                matched,
                confidence: if matched { CONFIDENCE_EXACT_MATCH } else { 0 },
                expected: expected.to_string(),
                actual: Some(actual.clone()),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "再エンコード画像のダイジェスト算出に失敗しました");
            ExactHashLevel {
                method: EXACT_HASH_METHOD.to_string(),
                matched: false,
                confidence: 0,
                expected: expected.to_string(),
                actual: None,
                error: Some(e.to_string()),
            }
        }
    }
}

fn watermark_level(
    transport: &dyn WatermarkTransport,
    method: &str,
    image: &RgbImage,
    expectations: &VerifyExpectations,
) -> WatermarkLevel {
    let not_found = |error: String| WatermarkLevel {
        method: method.to_string(),
        found: false,
        valid: false,
        matched: false,
        confidence: 0,
        extracted_data: None,
        error: Some(error),
    };

    // Transport内部のパニックはTier境界で遮断し、残りのTierを続行する
    let decoded = panic::catch_unwind(AssertUnwindSafe(|| {
        transport.decode(image, MAX_PAYLOAD_SIZE, method)
    }));

    let bytes = match decoded {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return not_found(e.to_string()),
        Err(_) => {
            tracing::warn!("透かしデコード中にパニックが発生しました");
            return not_found("透かしデコード中にパニックが発生しました".to_string());
        }
    };

    match payload::decode_payload(&bytes) {
        Some(record) => {
            let (confidence, matched) = score_watermark(&record, expectations);
            WatermarkLevel {
                method: method.to_string(),
                found: true,
                valid: true,
                matched,
                confidence,
                extracted_data: Some(record),
                error: None,
            }
        }
        None => WatermarkLevel {
            method: method.to_string(),
            found: true,
            valid: false,
            matched: false,
            confidence: 0,
            extracted_data: None,
            error: Some("Invalid watermark payload".to_string()),
        },
    }
}

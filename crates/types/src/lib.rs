//! # PhotoMint 共有型定義
//!
//! 透かしペイロード・検証結果・HTTPリクエスト/レスポンスのデータ構造を
//! Rust構造体として提供する。
//!
//! ## エンコーディング規則
//! - Base64: 画像バイナリ（STANDARDエンジン、data URLプレフィックス許容）
//! - Hex: SHA-256ダイジェスト（小文字64桁）、CRC32チェックサム（小文字8桁）

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// プロトコル定数
// ---------------------------------------------------------------------------

/// ペイロードのプロトコルバージョン。
pub const PAYLOAD_VERSION: &str = "v1";

/// 透かしに埋め込むペイロードの最大バイト数。
/// 埋め込み側と抽出側で必ず同じ値を使うこと。異なる値で抽出すると復元に失敗する。
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// ペイロードのフィールド区切り文字。
pub const FIELD_DELIMITER: char = '|';

/// デフォルトの透かしアルゴリズム識別子（Transportへそのまま渡される）。
pub const DEFAULT_WATERMARK_METHOD: &str = "dwtDct";

/// サービス名（/health で返却）。
pub const SERVICE_NAME: &str = "PhotoMint Watermarking Service";

// ---------------------------------------------------------------------------
// 来歴レコード
// ---------------------------------------------------------------------------

/// 透かしペイロードをデコードした来歴レコード。
///
/// `creator_address` は埋め込み時に先頭8〜10文字へ切り詰められているため、
/// 完全なアドレスとの比較は前方一致で行うこと。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// プロトコルバージョン（"v1"）
    pub version: String,
    /// トークンID（そのまま格納）
    pub token_id: String,
    /// 切り詰められたクリエイターアドレス
    pub creator_address: String,
    /// 発行時刻（UNIX秒）
    pub timestamp: i64,
    /// 任意データ（最大10文字、空文字は省略を意味する）
    pub custom_data: String,
    /// チェックサム検証に成功したか（デコード成功時は常にtrue）
    pub valid: bool,
    /// 発行時刻のRFC 3339表現（UTC）
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// 検証結果
// ---------------------------------------------------------------------------

/// 最終判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// 真正と判定
    Verified,
    /// 部分的な証拠のみ
    Partial,
    /// 真正性を確認できない
    Unverified,
    /// 未判定（検証開始前の初期値）
    Unknown,
}

/// Tier 1: 完全一致ダイジェストの結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactHashLevel {
    /// 手法名（"SHA-256"）
    pub method: String,
    /// 期待値と一致したか
    #[serde(rename = "match")]
    pub matched: bool,
    /// Tier内の確信度（0 or 100）
    pub confidence: u8,
    /// 呼び出し側が指定した期待ダイジェスト
    pub expected: String,
    /// 再エンコード後画像のダイジェスト（算出失敗時はNone）
    pub actual: Option<String>,
    /// Tier内で発生したエラー
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tier 2: 透かしペイロードの結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkLevel {
    /// Transportのアルゴリズム識別子
    pub method: String,
    /// 透かしが検出されたか
    pub found: bool,
    /// ペイロードが構造的に妥当か（チェックサム一致）
    pub valid: bool,
    /// 期待値（tokenId / creator）と一致したか
    #[serde(rename = "match")]
    pub matched: bool,
    /// Tier内の確信度
    pub confidence: u8,
    /// デコードされた来歴レコード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ProvenanceRecord>,
    /// 検出・解析に失敗した理由
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tier 3: 知覚ハッシュの結果。参照pHashが無いため現状は常に利用不可。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptualHashLevel {
    /// 手法名（"pHash"）
    pub method: String,
    /// 比較が実行可能か
    pub available: bool,
    /// 補足
    pub note: String,
}

/// 各Tierの結果。実行されなかったTierはNone。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationLevels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_hash: Option<ExactHashLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<PerceptualHashLevel>,
}

impl VerificationLevels {
    /// 記録済みTierの確信度の最大値。未実行のTierは0として扱う。
    pub fn max_confidence(&self) -> u8 {
        let exact = self.exact_hash.as_ref().map_or(0, |l| l.confidence);
        let watermark = self.watermark.as_ref().map_or(0, |l| l.confidence);
        exact.max(watermark)
    }
}

/// 1リクエスト分の検証結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// 再エンコード後画像のSHA-256（算出失敗時はNone）
    pub current_sha256: Option<String>,
    /// Tierごとの結果
    pub verification_levels: VerificationLevels,
    /// 最終判定
    pub overall_result: Verdict,
    /// 集約された確信度（0〜100）
    pub confidence: u8,
    /// 検証時刻（UNIX秒）
    pub timestamp: i64,
}

/// 検証時に呼び出し側が主張する期待値。空文字列は未指定として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyExpectations {
    /// 期待するSHA-256（大文字小文字は区別しない）
    #[serde(default)]
    pub expected_sha256: Option<String>,
    /// 期待するトークンID（JSONでは文字列・数値どちらも可）
    #[serde(default, deserialize_with = "deserialize_opt_string_or_number")]
    pub expected_token_id: Option<String>,
    /// 期待するクリエイターアドレス（完全形）
    #[serde(default)]
    pub expected_creator: Option<String>,
}

impl VerifyExpectations {
    /// 空文字列をNoneに正規化した期待SHA-256。
    pub fn sha256(&self) -> Option<&str> {
        non_empty(self.expected_sha256.as_deref())
    }

    /// 空文字列をNoneに正規化した期待トークンID。
    pub fn token_id(&self) -> Option<&str> {
        non_empty(self.expected_token_id.as_deref())
    }

    /// 空文字列をNoneに正規化した期待クリエイター。
    pub fn creator(&self) -> Option<&str> {
        non_empty(self.expected_creator.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// HTTP API リクエスト/レスポンス
// ---------------------------------------------------------------------------

/// GET /health レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// ペイロードのプロトコルバージョン
    pub version: String,
    /// 透かしアルゴリズム識別子
    pub method: String,
    pub max_payload_size: usize,
}

/// POST /embed リクエスト。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Base64エンコードされた画像（data URL可）
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string_or_number")]
    pub token_id: Option<String>,
    #[serde(default)]
    pub creator_address: Option<String>,
    #[serde(default)]
    pub custom_data: Option<String>,
    /// 出力フォーマット（"JPEG" / "PNG"）
    #[serde(default)]
    pub output_format: Option<String>,
    /// JPEG品質（1〜100）
    #[serde(default)]
    pub quality: Option<u8>,
}

/// POST /embed レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub success: bool,
    /// Base64エンコードされた透かし入り画像
    pub watermarked_image: String,
    /// 埋め込んだペイロード文字列
    pub payload: String,
    /// ペイロードのバイト数（パディング前）
    pub payload_size: usize,
    pub method: String,
    /// 元画像（JPEG再エンコード後）のSHA-256
    pub original_sha256: String,
    /// 透かし入り画像のSHA-256
    pub watermarked_sha256: String,
    /// 出力フォーマット
    pub format: String,
    pub timestamp: i64,
}

/// POST /extract リクエスト。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub image: Option<String>,
    /// 期待ペイロード長（省略時は MAX_PAYLOAD_SIZE）
    #[serde(default)]
    pub expected_payload_size: Option<usize>,
}

/// POST /extract レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub watermark_found: bool,
    /// 抽出されたペイロード文字列（パディング除去済み）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// 解析済みレコード（チェックサム不一致時はNone）
    #[serde(default)]
    pub parsed: Option<ProvenanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub method: String,
    pub extraction_timestamp: i64,
}

/// POST /verify リクエスト。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub expectations: VerifyExpectations,
}

/// エラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// serdeヘルパー
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

/// 文字列・数値のどちらでも受け付け、文字列として保持する。
fn deserialize_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

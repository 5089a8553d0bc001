//! # PhotoMint ハッシュ・チェックサム
//!
//! 透かし検証で使用するダイジェストとチェックサムを提供する。
//!
//! ## アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 画像ダイジェスト（Tier 1） | SHA-256 |
//! | ペイロード完全性 | CRC32 (IEEE) |

use sha2::{Digest, Sha256};

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA-256ダイジェストを小文字hex文字列（64桁）で返す。
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// 2つのhexダイジェストを大文字小文字を区別せずに比較する。
pub fn digest_eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// CRC32 (IEEE) チェックサム。
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC32を小文字hex8桁（ゼロ埋め）で返す。
pub fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32(data))
}

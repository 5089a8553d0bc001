//! # 透かしペイロードコーデック
//!
//! 来歴レコードを `MAX_PAYLOAD_SIZE` バイト以内の文字列にエンコードし、
//! 抽出されたバイト列から検証付きでデコードする。
//!
//! ## ワイヤフォーマット
//! ```text
//! v1|<tokenId>|<creatorShort>|<timestamp>[|<customData>]|<crc32hex8>
//! ```
//! チェックサムは末尾フィールドを除いたパイプ連結文字列に対するCRC32。
//! Transportへは `MAX_PAYLOAD_SIZE` バイトまでNULでパディングしたフレームを渡す。

use chrono::{DateTime, SecondsFormat, Utc};
use photomint_types::{ProvenanceRecord, FIELD_DELIMITER, MAX_PAYLOAD_SIZE, PAYLOAD_VERSION};

/// CRC32チェックサムのhex桁数。
const CHECKSUM_HEX_LEN: usize = 8;

/// customDataの最大文字数。
const CUSTOM_DATA_MAX_CHARS: usize = 10;

/// `0x` 付きアドレスの保持文字数。
const HEX_ADDRESS_CHARS: usize = 10;

/// それ以外のアドレスの保持文字数。
const PLAIN_ADDRESS_CHARS: usize = 8;

/// customData省略時のフィールド数。
const MIN_FIELDS: usize = 5;

/// フレームのパディングバイト。
const FRAME_PADDING: u8 = 0x00;

/// 現在時刻で来歴ペイロードをエンコードする。
///
/// 入力がどれだけ長くても失敗せず、常に `MAX_PAYLOAD_SIZE` バイト以下を返す。
pub fn encode_payload(token_id: &str, creator_address: &str, custom_data: &str) -> Vec<u8> {
    encode_payload_at(token_id, creator_address, custom_data, Utc::now().timestamp())
}

/// 指定したタイムスタンプで来歴ペイロードをエンコードする。
///
/// サイズ超過時は以下の順に切り詰め、毎回チェックサムを再計算する:
/// 1. customDataを残り容量まで切り詰める
/// 2. 残り容量がなければcustomDataを削除する
/// 3. それでも超過する場合はtokenId、次にcreatorを切り詰める
pub fn encode_payload_at(
    token_id: &str,
    creator_address: &str,
    custom_data: &str,
    timestamp: i64,
) -> Vec<u8> {
    let creator_short = shorten_creator(creator_address);
    let custom = take_chars(custom_data, CUSTOM_DATA_MAX_CHARS);
    let timestamp = timestamp.to_string();

    let full = seal(token_id, creator_short, &timestamp, custom);
    if full.len() <= MAX_PAYLOAD_SIZE {
        return full.into_bytes();
    }

    // customDataを除いた固定部分: "v1|token|creator|ts||" + checksum
    let fixed = PAYLOAD_VERSION.len()
        + token_id.len()
        + creator_short.len()
        + timestamp.len()
        + 5
        + CHECKSUM_HEX_LEN;
    if fixed < MAX_PAYLOAD_SIZE {
        let custom = truncate_bytes(custom, MAX_PAYLOAD_SIZE - fixed);
        if !custom.is_empty() {
            let truncated = seal(token_id, creator_short, &timestamp, custom);
            if truncated.len() <= MAX_PAYLOAD_SIZE {
                return truncated.into_bytes();
            }
        }
    }

    let without_custom = seal(token_id, creator_short, &timestamp, "");
    if without_custom.len() <= MAX_PAYLOAD_SIZE {
        return without_custom.into_bytes();
    }

    // tokenId自体が予算を超える場合。creator+timestamp+区切り+checksumを残して詰める。
    let overhead = PAYLOAD_VERSION.len() + timestamp.len() + 4 + CHECKSUM_HEX_LEN;
    let creator_room = MAX_PAYLOAD_SIZE.saturating_sub(overhead);
    let creator_short = truncate_bytes(creator_short, creator_room);
    let token_room = creator_room - creator_short.len();
    let token_id = truncate_bytes(token_id, token_room);
    seal(token_id, creator_short, &timestamp, "").into_bytes()
}

/// 抽出されたバイト列をデコード・検証する。
///
/// 不正なUTF-8シーケンスは読み飛ばし、末尾のNULパディングは除去する。
/// フィールド不足・数値解析失敗・チェックサム不一致のいずれでもNoneを返す。
pub fn decode_payload(bytes: &[u8]) -> Option<ProvenanceRecord> {
    let text = payload_to_text(bytes);
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if parts.len() < MIN_FIELDS {
        return None;
    }

    let (version, token_id, creator_address, timestamp_str) =
        (parts[0], parts[1], parts[2], parts[3]);

    // 5フィールド: customDataなし / 6フィールド以上: 5番目がcustomData
    let (custom_data, checksum_hex) = if parts.len() == MIN_FIELDS {
        ("", parts[4])
    } else {
        (parts[4], parts[5])
    };

    let timestamp: i64 = timestamp_str.trim().parse().ok()?;
    let actual = u32::from_str_radix(checksum_hex.trim(), 16).ok()?;

    let base = join_base(version, token_id, creator_address, timestamp_str, custom_data);
    if photomint_crypto::crc32(base.as_bytes()) != actual {
        return None;
    }

    let created_at =
        DateTime::<Utc>::from_timestamp(timestamp, 0)?.to_rfc3339_opts(SecondsFormat::Secs, true);

    Some(ProvenanceRecord {
        version: version.to_string(),
        token_id: token_id.to_string(),
        creator_address: creator_address.to_string(),
        timestamp,
        custom_data: custom_data.to_string(),
        valid: true,
        created_at,
    })
}

/// ペイロードを `MAX_PAYLOAD_SIZE` バイトのフレームにNULパディングする。
pub fn pad_to_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = payload[..payload.len().min(MAX_PAYLOAD_SIZE)].to_vec();
    frame.resize(MAX_PAYLOAD_SIZE, FRAME_PADDING);
    frame
}

/// バイト列を表示用文字列に変換する（不正なUTF-8は除去、末尾NULは削除）。
pub fn payload_to_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    let trimmed = text.trim_end_matches(char::from(FRAME_PADDING)).len();
    text.truncate(trimmed);
    text
}

/// クリエイターアドレスを切り詰める（`0x` 付きなら10文字、それ以外は8文字）。
pub fn shorten_creator(creator_address: &str) -> &str {
    if creator_address.starts_with("0x") {
        take_chars(creator_address, HEX_ADDRESS_CHARS)
    } else {
        take_chars(creator_address, PLAIN_ADDRESS_CHARS)
    }
}

fn seal(token_id: &str, creator_short: &str, timestamp: &str, custom: &str) -> String {
    let base = join_base(PAYLOAD_VERSION, token_id, creator_short, timestamp, custom);
    let checksum = photomint_crypto::crc32_hex(base.as_bytes());
    format!("{base}{FIELD_DELIMITER}{checksum}")
}

fn join_base(
    version: &str,
    token_id: &str,
    creator: &str,
    timestamp: &str,
    custom: &str,
) -> String {
    const D: char = FIELD_DELIMITER;
    let mut base = format!("{version}{D}{token_id}{D}{creator}{D}{timestamp}");
    if !custom.is_empty() {
        base.push(FIELD_DELIMITER);
        base.push_str(custom);
    }
    base
}

/// 先頭 `n` 文字を返す。
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// 文字境界を保ったまま `max` バイト以内に切り詰める。
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TS: i64 = 1_700_000_000;

    fn encode_str(token: &str, creator: &str, custom: &str) -> String {
        String::from_utf8(encode_payload_at(token, creator, custom, TS)).unwrap()
    }

    #[test]
    fn test_encode_example_scenario() {
        let payload = encode_str("42", "0xABCDEF1234567890", "demo");
        let base = format!("v1|42|0xABCDEF12|{TS}|demo");
        let expected = format!("{base}|{}", photomint_crypto::crc32_hex(base.as_bytes()));
        assert_eq!(payload, expected);

        let record = decode_payload(payload.as_bytes()).unwrap();
        assert_eq!(record.token_id, "42");
        assert_eq!(record.creator_address, "0xABCDEF12");
        assert_eq!(record.custom_data, "demo");
        assert_eq!(record.version, "v1");
        assert_eq!(record.timestamp, TS);
        assert!(record.valid);
        assert_eq!(record.created_at, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_encode_without_custom_data_has_five_fields() {
        let payload = encode_str("7", "alice-wallet-address", "");
        assert_eq!(payload.split('|').count(), 5);

        let record = decode_payload(payload.as_bytes()).unwrap();
        assert_eq!(record.creator_address, "alice-wa");
        assert_eq!(record.custom_data, "");
    }

    #[test]
    fn test_custom_data_truncated_to_ten_chars() {
        let payload = encode_str("1", "0x1234", "abcdefghijklmnop");
        let record = decode_payload(payload.as_bytes()).unwrap();
        assert_eq!(record.custom_data, "abcdefghij");
        assert_eq!(record.creator_address, "0x1234");
    }

    #[test]
    fn test_overflow_truncates_custom_data_to_remaining_space() {
        // 全体 = 2+20+10+10+10 + 区切り5 + 8 = 65
        let token = "t".repeat(20);
        let payload = encode_str(&token, "0xABCDEF1234567890", "0123456789");
        assert_eq!(payload.len(), MAX_PAYLOAD_SIZE);

        let record = decode_payload(payload.as_bytes()).unwrap();
        assert_eq!(record.token_id, token);
        let fixed = 2 + 20 + 10 + 10 + 5 + 8;
        assert_eq!(record.custom_data, &"0123456789"[..MAX_PAYLOAD_SIZE - fixed]);
    }

    #[test]
    fn test_overflow_drops_custom_data_when_no_space() {
        // customDataを除いた固定部分だけで 2+30+10+10+5+8 = 65
        let token = "t".repeat(30);
        let payload = encode_str(&token, "0xABCDEF1234567890", "demo");
        assert_eq!(payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(payload.split('|').count(), 5);

        let record = decode_payload(payload.as_bytes()).unwrap();
        assert_eq!(record.token_id, token);
        assert_eq!(record.custom_data, "");
    }

    #[test]
    fn test_pathological_token_id_is_truncated() {
        let token = "9".repeat(500);
        let payload = encode_payload_at(&token, "0xABCDEF1234567890", "demo", TS);
        assert_eq!(payload.len(), MAX_PAYLOAD_SIZE);

        let record = decode_payload(&payload).unwrap();
        assert!(token.starts_with(&record.token_id));
        assert_eq!(record.creator_address, "0xABCDEF12");
    }

    #[test]
    fn test_multibyte_truncation_stays_on_char_boundary() {
        let token = "あ".repeat(12);
        let payload = encode_payload_at(&token, "0xABCDEF1234567890", "日本語のカスタムデータ", TS);
        assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        assert!(decode_payload(&payload).is_some());
    }

    #[test]
    fn test_checksum_sensitivity_on_every_base_char() {
        let payload = encode_str("42", "0xABCDEF1234567890", "demo");
        let checksum_start = payload.rfind('|').unwrap();

        for (idx, ch) in payload[..checksum_start].char_indices() {
            if ch == '|' {
                continue;
            }
            let replacement = if ch == 'Y' { 'Z' } else { 'Y' };
            let mut tampered = payload.clone();
            tampered.replace_range(idx..idx + ch.len_utf8(), &replacement.to_string());
            assert!(
                decode_payload(tampered.as_bytes()).is_none(),
                "改ざんが検出されなかった: {tampered}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_too_few_fields() {
        assert!(decode_payload(b"v1|42|0xABCDEF12|1700000000").is_none());
        assert!(decode_payload(b"").is_none());
    }

    #[test]
    fn test_decode_rejects_non_numeric_timestamp() {
        let base = "v1|42|0xABCDEF12|yesterday";
        let payload = format!("{base}|{}", photomint_crypto::crc32_hex(base.as_bytes()));
        assert!(decode_payload(payload.as_bytes()).is_none());
    }

    #[test]
    fn test_decode_rejects_non_hex_checksum() {
        assert!(decode_payload(b"v1|42|0xABCDEF12|1700000000|demo|zzzzzzzz").is_none());
    }

    #[test]
    fn test_decode_accepts_uppercase_checksum() {
        let original = encode_str("42", "0xABCDEF1234567890", "demo");
        let (base, checksum) = original.rsplit_once('|').unwrap();
        let upper = format!("{base}|{}", checksum.to_uppercase());
        assert!(decode_payload(upper.as_bytes()).is_some());
    }

    #[test]
    fn test_decode_strips_frame_padding() {
        let payload = encode_payload_at("42", "0xABCDEF1234567890", "demo", TS);
        let frame = pad_to_frame(&payload);
        assert_eq!(frame.len(), MAX_PAYLOAD_SIZE);

        let record = decode_payload(&frame).unwrap();
        assert_eq!(record.custom_data, "demo");
    }

    #[test]
    fn test_decode_drops_invalid_utf8() {
        let payload = encode_payload_at("42", "0xABCDEF1234567890", "", TS);
        let mut corrupted = vec![0xff, 0xfe];
        corrupted.extend_from_slice(&payload);
        corrupted.push(0xc3);
        assert!(decode_payload(&corrupted).is_some());
    }

    #[test]
    fn test_decode_ignores_fields_after_checksum() {
        let payload = encode_str("42", "0xABCDEF1234567890", "demo");
        let extended = format!("{payload}|trailing");
        let record = decode_payload(extended.as_bytes()).unwrap();
        assert_eq!(record.custom_data, "demo");
    }

    #[test]
    fn test_shorten_creator() {
        assert_eq!(shorten_creator("0xABCDEF1234567890"), "0xABCDEF12");
        assert_eq!(shorten_creator("ABCDEF1234567890"), "ABCDEF12");
        assert_eq!(shorten_creator("0x12"), "0x12");
    }

    #[test]
    fn test_payload_to_text() {
        assert_eq!(payload_to_text(b"v1|a\0\0\0"), "v1|a");
        assert_eq!(payload_to_text(&[b'o', 0xff, b'k']), "ok");
    }

    proptest! {
        /// Property: どんな入力でもMAX_PAYLOAD_SIZEを超えない
        #[test]
        fn prop_encoded_size_is_bounded(
            token in "\\PC{0,120}",
            creator in "\\PC{0,80}",
            custom in "\\PC{0,80}",
            ts in -62_000_000_000i64..253_000_000_000i64,
        ) {
            let payload = encode_payload_at(&token, &creator, &custom, ts);
            prop_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        }

        /// Property: 制限内の入力はデコードで元に戻る
        #[test]
        fn prop_roundtrip_within_limits(
            token in "[A-Za-z0-9]{1,12}",
            creator in "(0x[0-9a-fA-F]{0,40})|([a-z]{1,20})",
            custom in "[a-z0-9]{0,15}",
            ts in 0i64..4_000_000_000i64,
        ) {
            let payload = encode_payload_at(&token, &creator, &custom, ts);
            let record = decode_payload(&payload).unwrap();
            prop_assert_eq!(record.token_id, token);
            prop_assert_eq!(record.creator_address, shorten_creator(&creator));
            prop_assert_eq!(record.custom_data, take_chars(&custom, CUSTOM_DATA_MAX_CHARS));
            prop_assert_eq!(record.timestamp, ts);
        }

        /// Property: 任意のバイト列でもパニックしない
        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let _ = decode_payload(&bytes);
        }
    }
}

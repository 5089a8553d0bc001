//! # 画像コーデック変換
//!
//! バイト列 ⇔ ラスタ画像の変換と、Base64入力の復号。
//! Tier 1のダイジェストは常に「JPEG品質95で再エンコードしたバイト列」に対して計算する。

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::CoreError;

/// デフォルトのJPEG品質。
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Base64エンジン（Standard）
pub fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// 出力画像フォーマット。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// 大文字小文字を区別せずに解釈する。未知の値はJPEGとして扱う。
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("png") {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    /// レスポンスに載せるフォーマット名。
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
        }
    }
}

/// 画像バイト列をRGB8ラスタにデコードする。フォーマットはマジックバイトから判定する。
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, CoreError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| CoreError::InvalidImage(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

/// RGB8ラスタを指定フォーマットでエンコードする。`quality` はJPEGのみ有効（1〜100に丸める）。
pub fn encode_image(
    image: &RgbImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    let (width, height) = image.dimensions();
    let result = match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::Adaptive)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
    };
    result.map_err(|e| CoreError::ImageEncode(e.to_string()))?;
    Ok(buf)
}

/// 画像をJPEG品質95で再エンコードし、そのSHA-256を返す。
pub fn reencoded_digest(image: &RgbImage) -> Result<String, CoreError> {
    let bytes = encode_image(image, OutputFormat::Jpeg, DEFAULT_JPEG_QUALITY)?;
    Ok(photomint_crypto::sha256_hex(&bytes))
}

/// Base64文字列（`data:<mime>;base64,` プレフィックス可）をデコードする。
pub fn decode_base64_image(data: &str) -> Result<Vec<u8>, CoreError> {
    let encoded = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => data,
    };
    b64()
        .decode(encoded.trim())
        .map_err(|e| CoreError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample() -> RgbImage {
        RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 7) as u8, (y * 9) as u8, 128]))
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("png"), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("webp"), OutputFormat::Jpeg);
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let image = sample();
        let bytes = encode_image(&image, OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();
        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        assert_eq!(decode_image(&bytes).unwrap(), image);
    }

    #[test]
    fn test_jpeg_encode_produces_jpeg() {
        let bytes = encode_image(&sample(), OutputFormat::Jpeg, 0).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
        assert_eq!(decode_image(&bytes).unwrap().dimensions(), (32, 24));
    }

    #[test]
    fn test_reencoded_digest_is_deterministic() {
        let image = sample();
        let a = reencoded_digest(&image).unwrap();
        let b = reencoded_digest(&image).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(CoreError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_decode_base64_accepts_data_url() {
        let encoded = b64().encode(b"hello");
        assert_eq!(decode_base64_image(&encoded).unwrap(), b"hello");
        assert_eq!(
            decode_base64_image(&format!("data:image/png;base64,{encoded}")).unwrap(),
            b"hello"
        );
        assert!(matches!(
            decode_base64_image("%%%"),
            Err(CoreError::InvalidBase64(_))
        ));
    }
}

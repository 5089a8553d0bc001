//! # ブロックDC係数Transport
//!
//! 輝度の8x8ブロックごとのDC係数（ブロック平均）を量子化インデックス変調（QIM）で
//! 偏移させ、1ブロックに1ビットを埋め込む。
//!
//! - フレーム: 同期マーカー4バイト + ペイロード
//! - 全ブロックにフレームのビットを巡回的に割り当て、抽出時は多数決で復元する
//! - ブロック境界をJPEGの8x8グリッドに揃えるため、高品質の再圧縮には耐える
//!
//! 幾何変換・切り抜き・低品質再圧縮への耐性は対象外。

use image::{Rgb, RgbImage};
use photomint_types::MAX_PAYLOAD_SIZE;

use super::{TransportError, WatermarkTransport};

/// ブロックの一辺（ピクセル）。
const BLOCK_SIZE: u32 = 8;

/// デフォルトの量子化ステップ（輝度値）。
const DEFAULT_STEP: f64 = 12.0;

/// フレーム先頭の同期マーカー。
const SYNC_MARKER: [u8; 4] = *b"PMWM";

/// ブロックDC係数QIMによるTransport実装。
#[derive(Debug, Clone)]
pub struct BlockDctTransport {
    /// 量子化ステップ。大きいほど頑健だが画質劣化も大きい。
    step: f64,
}

impl Default for BlockDctTransport {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}

impl BlockDctTransport {
    /// 量子化ステップを指定して作成する。
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    fn target_mean(&self, mean: f64, bit: bool) -> f64 {
        let offset = if bit { self.step / 2.0 } else { 0.0 };
        let mut k = ((mean - offset) / self.step).round();
        let mut target = k * self.step + offset;
        if target > 255.0 {
            k -= 1.0;
            target = k * self.step + offset;
        } else if target < 0.0 {
            k += 1.0;
            target = k * self.step + offset;
        }
        target
    }

    fn read_bit(&self, mean: f64) -> bool {
        let r = mean.rem_euclid(self.step);
        let dist_zero = r.min(self.step - r);
        let dist_one = (r - self.step / 2.0).abs();
        dist_one < dist_zero
    }
}

impl WatermarkTransport for BlockDctTransport {
    fn embed(
        &self,
        image: &RgbImage,
        payload: &[u8],
        method: &str,
    ) -> Result<RgbImage, TransportError> {
        check_len(payload.len())?;
        let bits = frame_bits(payload);
        let blocks = blocks(image);
        if blocks.len() < bits.len() {
            return Err(TransportError::ImageTooSmall {
                required: bits.len(),
                available: blocks.len(),
            });
        }

        tracing::debug!(method, bits = bits.len(), blocks = blocks.len(), "透かしを埋め込みます");

        let mut out = image.clone();
        for (idx, &(bx, by)) in blocks.iter().enumerate() {
            let bit = bits[idx % bits.len()];
            let mean = block_mean(&out, bx, by);
            let delta = (self.target_mean(mean, bit) - mean).round() as i16;
            shift_block(&mut out, bx, by, delta);
        }
        Ok(out)
    }

    fn decode(
        &self,
        image: &RgbImage,
        expected_len: usize,
        method: &str,
    ) -> Result<Vec<u8>, TransportError> {
        check_len(expected_len)?;
        let frame_len = SYNC_MARKER.len() + expected_len;
        let bit_count = frame_len * 8;
        let blocks = blocks(image);
        if blocks.len() < bit_count {
            return Err(TransportError::ImageTooSmall {
                required: bit_count,
                available: blocks.len(),
            });
        }

        // (1の票数, 総票数)
        let mut votes = vec![(0u32, 0u32); bit_count];
        for (idx, &(bx, by)) in blocks.iter().enumerate() {
            let vote = &mut votes[idx % bit_count];
            if self.read_bit(block_mean(image, bx, by)) {
                vote.0 += 1;
            }
            vote.1 += 1;
        }

        let mut frame = vec![0u8; frame_len];
        for (i, &(ones, total)) in votes.iter().enumerate() {
            if ones * 2 > total {
                frame[i / 8] |= 0x80u8 >> (i % 8);
            }
        }

        if frame[..SYNC_MARKER.len()] != SYNC_MARKER {
            tracing::debug!(method, "同期マーカーが一致しません");
            return Err(TransportError::NotFound);
        }
        Ok(frame.split_off(SYNC_MARKER.len()))
    }
}

fn check_len(len: usize) -> Result<(), TransportError> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(TransportError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// 同期マーカー + ペイロードをMSB先頭のビット列にする。
fn frame_bits(payload: &[u8]) -> Vec<bool> {
    SYNC_MARKER
        .iter()
        .chain(payload)
        .flat_map(|&byte| (0..8).map(move |i| byte & (0x80u8 >> i) != 0))
        .collect()
}

/// 画像内の完全な8x8ブロックの座標（ラスタ順）。
fn blocks(image: &RgbImage) -> Vec<(u32, u32)> {
    let (cols, rows) = (image.width() / BLOCK_SIZE, image.height() / BLOCK_SIZE);
    (0..rows)
        .flat_map(|by| (0..cols).map(move |bx| (bx, by)))
        .collect()
}

/// ITU-R BT.601 輝度。
fn luma(pixel: &Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

fn block_mean(image: &RgbImage, bx: u32, by: u32) -> f64 {
    let mut sum = 0.0;
    for y in by * BLOCK_SIZE..(by + 1) * BLOCK_SIZE {
        for x in bx * BLOCK_SIZE..(bx + 1) * BLOCK_SIZE {
            sum += luma(image.get_pixel(x, y));
        }
    }
    sum / f64::from(BLOCK_SIZE * BLOCK_SIZE)
}

/// ブロック内の全画素のRGBに同じ値を加算する（輝度もほぼ同量だけ動く）。
fn shift_block(image: &mut RgbImage, bx: u32, by: u32, delta: i16) {
    if delta == 0 {
        return;
    }
    for y in by * BLOCK_SIZE..(by + 1) * BLOCK_SIZE {
        for x in bx * BLOCK_SIZE..(bx + 1) * BLOCK_SIZE {
            let pixel = image.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut() {
                *channel = (i16::from(*channel) + delta).clamp(0, 255) as u8;
            }
        }
    }
}

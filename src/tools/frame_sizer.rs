//! 縮圖格尺寸計算
//!
//! 由原始尺寸與壓縮比例決定單一縮圖格的像素大小：
//! `round(dim · compress)`，再夾取到可讀下限與畫布上限之間。
//! 高度邊界由寬度邊界按原始長寬比換算（無條件進位）。

use anyhow::{Result, bail};

/// 可讀性下限
pub const MIN_FRAME_WIDTH: u32 = 30;
/// 畫布寬度上限（8K），除以欄數即單格上限
pub const MAX_CANVAS_WIDTH: u32 = 7680;

/// 單一縮圖格的像素尺寸
///
/// 每支影片只計算一次，之後由影片聚合體持有。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCell {
    pub width: u32,
    pub height: u32,
}

impl FrameCell {
    /// 只套用下限的初步尺寸，供欄數搜尋使用
    ///
    /// 上限依賴欄數、欄數又依賴格子尺寸；以這個初步尺寸
    /// 先決定欄數，再由 [`FrameCell::compute`] 套用上限。
    pub fn scaled(original: (u32, u32), compress: f64) -> Result<Self> {
        let (width, height) = checked_original(original)?;
        let min_height = min_height(width, height);

        Ok(Self {
            width: scale(width, compress).max(MIN_FRAME_WIDTH),
            height: scale(height, compress).max(min_height),
        })
    }

    /// 套用欄數決定的畫布上限後的最終尺寸
    pub fn compute(original: (u32, u32), compress: f64, columns: usize) -> Result<Self> {
        let (width, height) = checked_original(original)?;

        let min_width = MIN_FRAME_WIDTH;
        let min_height = min_height(width, height);
        let max_width = MAX_CANVAS_WIDTH / columns.max(1) as u32;
        let max_height = (max_width as u64 * height as u64).div_ceil(width as u64) as u32;

        // 先套下限再套上限，上限在兩者衝突時勝出
        Ok(Self {
            width: scale(width, compress).max(min_width).min(max_width),
            height: scale(height, compress).max(min_height).min(max_height),
        })
    }
}

fn checked_original(original: (u32, u32)) -> Result<(u32, u32)> {
    let (width, height) = original;
    if width == 0 || height == 0 {
        bail!("原始尺寸不可為零: {width}x{height}");
    }
    Ok((width, height))
}

fn scale(dimension: u32, compress: f64) -> u32 {
    (dimension as f64 * compress).round() as u32
}

fn min_height(width: u32, height: u32) -> u32 {
    (MIN_FRAME_WIDTH as u64 * height as u64).div_ceil(width as u64) as u32
}

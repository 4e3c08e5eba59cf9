//! 鑲嵌版面計算
//!
//! 為 N 個縮圖格找出欄數，使整張精靈圖的長寬比不超過 16:9，
//! 並提供每一格在畫布上的座標（列優先）。

use crate::tools::frame_sizer::FrameCell;

/// 鑲嵌圖的長寬比上限
pub const MOSAIC_ASPECT: f64 = 16.0 / 9.0;

/// 貪婪搜尋最適欄數
///
/// 從 1 開始遞增，一旦 `(C·w)/(ceil(N/C)·h)` 嚴格大於 16:9 就停止，
/// 回傳最後一個仍滿足上限的欄數。這不是封閉形式的最佳解，
/// 邊界比較必須用嚴格大於，結果才能與既有版面一致。
#[must_use]
pub fn calc_columns(frames_count: usize, width: u32, height: u32) -> usize {
    // 短影片的搜尋迴圈根本不會執行
    if frames_count <= 1 {
        return 1;
    }

    let mut best = 1;
    for columns in 1..frames_count {
        let rows = frames_count.div_ceil(columns);
        let ratio = (columns as f64 * f64::from(width)) / (rows as f64 * f64::from(height));
        if ratio > MOSAIC_ASPECT {
            break;
        }
        best = columns;
    }
    best
}

/// 決定後的鑲嵌版面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridLayout {
    #[must_use]
    pub fn new(columns: usize, frames_count: usize, cell: FrameCell) -> Self {
        let columns = columns.max(1);
        Self {
            columns,
            rows: frames_count.max(1).div_ceil(columns),
            cell_width: cell.width,
            cell_height: cell.height,
        }
    }

    /// 畫布尺寸 `(w·C, h·ceil(N/C))`
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.cell_width * self.columns as u32,
            self.cell_height * self.rows as u32,
        )
    }

    /// 列優先索引 i 的格子原點 `(w·(i mod C), h·(i div C))`
    #[must_use]
    pub fn position(&self, index: usize) -> (u32, u32) {
        (
            self.cell_width * (index % self.columns) as u32,
            self.cell_height * (index / self.columns) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(columns: usize, frames_count: usize, width: u32, height: u32) -> f64 {
        let rows = frames_count.div_ceil(columns);
        (columns as f64 * f64::from(width)) / (rows as f64 * f64::from(height))
    }

    #[test]
    fn test_single_frame_gets_one_column() {
        assert_eq!(calc_columns(0, 320, 180), 1);
        assert_eq!(calc_columns(1, 320, 180), 1);
    }

    #[test]
    fn test_columns_bound_and_maximality() {
        // 代表性的格子尺寸集合
        let cells = [(320, 180), (300, 200), (160, 120), (480, 270)];
        for &(width, height) in &cells {
            for frames_count in 1..=50 {
                let columns = calc_columns(frames_count, width, height);

                assert!(columns >= 1);
                assert!(
                    frames_count <= 1 || ratio(columns, frames_count, width, height) <= MOSAIC_ASPECT,
                    "N={frames_count} cell={width}x{height} C={columns} 超出 16:9"
                );

                // 最大性：C+1 要不超過上限，要不超出搜尋範圍
                if frames_count > 1 && columns + 1 < frames_count {
                    assert!(
                        ratio(columns + 1, frames_count, width, height) > MOSAIC_ASPECT,
                        "N={frames_count} cell={width}x{height} C={columns} 不是最大欄數"
                    );
                }
            }
        }
    }

    #[test]
    fn test_wide_cell_stays_single_column() {
        // 單欄就已超過 16:9 的扁長格子
        let columns = calc_columns(10, 1600, 80);
        assert_eq!(columns, 1);
    }

    #[test]
    fn test_canvas_size() {
        let cell = FrameCell {
            width: 320,
            height: 180,
        };
        let layout = GridLayout::new(3, 7, cell);
        assert_eq!(layout.rows, 3);
        assert_eq!(layout.canvas_size(), (960, 540));
    }

    #[test]
    fn test_positions_are_row_major() {
        let cell = FrameCell {
            width: 320,
            height: 180,
        };
        let layout = GridLayout::new(3, 6, cell);
        assert_eq!(layout.position(0), (0, 0));
        assert_eq!(layout.position(1), (320, 0));
        assert_eq!(layout.position(2), (640, 0));
        assert_eq!(layout.position(3), (0, 180));
        assert_eq!(layout.position(5), (640, 180));
    }

    #[test]
    fn test_all_positions_inside_canvas() {
        let cell = FrameCell {
            width: 300,
            height: 200,
        };
        for frames_count in 1..=50 {
            let columns = calc_columns(frames_count, cell.width, cell.height);
            let layout = GridLayout::new(columns, frames_count, cell);
            let (canvas_width, canvas_height) = layout.canvas_size();

            for index in 0..frames_count {
                let (x, y) = layout.position(index);
                assert!(x + cell.width <= canvas_width);
                assert!(y + cell.height <= canvas_height);
            }
        }
    }
}

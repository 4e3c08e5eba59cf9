//! 影片聚合體
//!
//! 以組合的方式把中繼資料與縮圖格尺寸綁在一支影片上：
//! 探測一次、尺寸與版面各算一次，之後的擷取與格式化
//! 都借用這個聚合體。

use crate::error::{Result, ThumbnailError};
use crate::options::GeneratorOptions;
use crate::tools::{FrameCell, GridLayout, VideoMetadata, calc_columns, probe_video};
use log::debug;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Video {
    path: PathBuf,
    metadata: VideoMetadata,
    interval: f64,
    /// 每支影片只計算一次的格子尺寸
    cell: FrameCell,
    layout: GridLayout,
}

impl Video {
    /// 探測影片並一次性推導格子尺寸與版面
    ///
    /// 欄數上限與格子尺寸互相依賴，分兩步解開：先以只套下限的
    /// 初步尺寸搜尋欄數，再以該欄數套畫布上限得到最終尺寸。
    pub fn probe(path: &Path, options: &GeneratorOptions) -> Result<Self> {
        let metadata = probe_video(path, options.fps_source, options.check_duration)?;

        let original = (metadata.width, metadata.height);
        let frames_count = sample_count(metadata.duration_seconds, options.interval);

        let to_unavailable = |error: anyhow::Error| ThumbnailError::MetadataUnavailable {
            path: path.to_path_buf(),
            reason: format!("{error:#}"),
        };

        let scaled = FrameCell::scaled(original, options.compress).map_err(to_unavailable)?;
        let columns = calc_columns(frames_count, scaled.width, scaled.height);
        let cell =
            FrameCell::compute(original, options.compress, columns).map_err(to_unavailable)?;
        let layout = GridLayout::new(columns, frames_count, cell);

        debug!(
            "影片 {}: {:.1}s {}x{} -> {} 格 {}x{}，{} 欄",
            path.display(),
            metadata.duration_seconds,
            metadata.width,
            metadata.height,
            frames_count,
            cell.width,
            cell.height,
            columns
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            interval: options.interval,
            cell,
            layout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    #[must_use]
    pub fn cell(&self) -> FrameCell {
        self.cell
    }

    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// 半開區間 `[0, duration)` 內以 interval 為步長的取樣時間點
    #[must_use]
    pub fn sample_offsets(&self) -> Vec<f64> {
        arange(self.metadata.duration_seconds, self.interval)
    }

    #[must_use]
    pub fn frames_count(&self) -> usize {
        sample_count(self.metadata.duration_seconds, self.interval)
    }
}

/// `[0, stop)` 的浮點數列，與取樣數的定義共用同一個累加方式
fn arange(stop: f64, step: f64) -> Vec<f64> {
    let mut offsets = Vec::new();
    let mut current = 0.0;
    while current < stop {
        offsets.push(current);
        current += step;
    }
    offsets
}

fn sample_count(duration: f64, interval: f64) -> usize {
    arange(duration, interval).len()
}

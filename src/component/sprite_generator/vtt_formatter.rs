//! WebVTT 格式器
//!
//! 把所有幀合成為單張精靈圖，再寫出逐磚的提示點檔。
//! 播放器透過 `#xywh` 媒體片段從精靈圖裁出對應的縮圖。

use crate::component::sprite_generator::formatter::{
    ThumbnailFormatter, ThumbnailPlan, format_cue_time, write_atomic,
};
use crate::error::{Result, ThumbnailError};
use crate::tools::{ensure_directory_exists, extract_name, relative_to_cwd, to_posix};
use image::imageops::FilterType;
use image::{GenericImage, GenericImageView, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub struct VttFormatter;

impl VttFormatter {
    fn sprite_path(plan: &ThumbnailPlan) -> PathBuf {
        plan.thumbnail_dir
            .join(format!("{}.png", extract_name(&plan.video_path)))
    }

    /// 提示點引用精靈圖的路徑
    ///
    /// 有 base 時以 base 為前綴組 URL；否則用相對於工作目錄的
    /// POSIX 路徑，方便直接丟給網頁伺服器。
    fn route(plan: &ThumbnailPlan, sprite: &Path) -> String {
        match &plan.base {
            Some(base) => {
                let name = sprite
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}", base.trim_end_matches('/'), name)
            }
            None => to_posix(&relative_to_cwd(sprite)),
        }
    }
}

impl ThumbnailFormatter for VttFormatter {
    /// 把幀依版面座標貼進精靈圖畫布
    fn prepare_frames(&self, plan: &ThumbnailPlan) -> Result<()> {
        ensure_directory_exists(&plan.thumbnail_dir)?;

        let (canvas_width, canvas_height) = plan.layout.canvas_size();
        let mut canvas = RgbaImage::new(canvas_width, canvas_height);

        for tile in &plan.tiles {
            let frame = image::open(&tile.frame).map_err(|source| ThumbnailError::Image {
                path: tile.frame.clone(),
                source,
            })?;
            // 解碼器輸出的尺寸照理與格尺寸相同，防守性地補一次縮放
            let frame = if frame.width() != plan.cell.width || frame.height() != plan.cell.height {
                frame.resize_exact(plan.cell.width, plan.cell.height, FilterType::Lanczos3)
            } else {
                frame
            };
            canvas
                .copy_from(&frame.to_rgba8(), tile.x, tile.y)
                .map_err(|source| ThumbnailError::Image {
                    path: tile.frame.clone(),
                    source,
                })?;
        }

        let sprite = Self::sprite_path(plan);
        let mut encoded = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|source| ThumbnailError::Image {
                path: sprite.clone(),
                source,
            })?;
        write_atomic(&sprite, &encoded)?;
        log::debug!("精靈圖已寫入: {}", sprite.display());
        Ok(())
    }

    /// 寫出 WEBVTT 標頭與逐磚提示點
    fn generate(&self, plan: &ThumbnailPlan) -> Result<()> {
        let route = Self::route(plan, &Self::sprite_path(plan));

        let mut content = String::from("WEBVTT\n\n");
        for tile in &plan.tiles {
            content.push_str(&format!(
                "{} --> {}\n{}#xywh={},{},{},{}\n\n",
                format_cue_time(tile.start),
                format_cue_time(tile.end),
                route,
                tile.x,
                tile.y,
                plan.cell.width,
                plan.cell.height,
            ));
        }

        write_atomic(&plan.metadata_path, content.as_bytes())?;
        log::info!("VTT 已寫入: {}", plan.metadata_path.display());
        Ok(())
    }
}

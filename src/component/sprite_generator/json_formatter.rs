//! JSON 格式器
//!
//! 幀以個別檔案落在影片專屬的子目錄，索引檔以起始秒數為鍵，
//! 值帶幀路徑與顯示寬度。

use crate::component::sprite_generator::formatter::{
    ThumbnailFormatter, ThumbnailPlan, write_atomic,
};
use crate::error::{Result, ThumbnailError};
use crate::tools::{ensure_directory_exists, relative_to_cwd, to_posix};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonCue {
    src: String,
    width: String,
}

pub struct JsonFormatter;

impl JsonFormatter {
    /// 幀在索引中的引用路徑
    ///
    /// 幀落在以影片名稱命名的子目錄，base 前綴後還要接上
    /// 該子目錄名，連結才會解析到實際的幀檔。
    fn route(plan: &ThumbnailPlan, frame: &Path) -> String {
        let name = frame
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &plan.base {
            Some(base) => {
                let directory = plan
                    .thumbnail_dir
                    .file_name()
                    .map(|dir| dir.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}/{}", base.trim_end_matches('/'), directory, name)
            }
            None => to_posix(&relative_to_cwd(&plan.thumbnail_dir.join(name))),
        }
    }
}

impl ThumbnailFormatter for JsonFormatter {
    /// 清空並重建幀目錄，再把幀從暫存區搬進來
    ///
    /// 重建而非合併：殘留的舊幀會讓索引與目錄內容不一致。
    fn prepare_frames(&self, plan: &ThumbnailPlan) -> Result<()> {
        if plan.thumbnail_dir.exists() {
            fs::remove_dir_all(&plan.thumbnail_dir).map_err(|source| {
                ThumbnailError::FormatWrite {
                    path: plan.thumbnail_dir.clone(),
                    source,
                }
            })?;
        }
        ensure_directory_exists(&plan.thumbnail_dir)?;

        for tile in &plan.tiles {
            let name = tile
                .frame
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            fs::copy(&tile.frame, plan.thumbnail_dir.join(&name)).map_err(|source| {
                ThumbnailError::FormatWrite {
                    path: tile.frame.clone(),
                    source,
                }
            })?;
        }
        log::debug!(
            "{} 張幀已寫入: {}",
            plan.tiles.len(),
            plan.thumbnail_dir.display()
        );
        Ok(())
    }

    /// 以起始秒數為鍵寫出索引檔
    fn generate(&self, plan: &ThumbnailPlan) -> Result<()> {
        let mut index: BTreeMap<u64, JsonCue> = BTreeMap::new();
        for tile in &plan.tiles {
            index.insert(
                tile.start.floor() as u64,
                JsonCue {
                    src: Self::route(plan, &tile.frame),
                    width: format!("{}px", plan.cell.width),
                },
            );
        }

        let content =
            serde_json::to_string_pretty(&index).map_err(|source| ThumbnailError::FormatWrite {
                path: plan.metadata_path.clone(),
                source: source.into(),
            })?;
        write_atomic(&plan.metadata_path, content.as_bytes())?;
        log::info!("JSON 已寫入: {}", plan.metadata_path.display());
        Ok(())
    }
}

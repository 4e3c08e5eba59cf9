//! 縮圖輸出格式
//!
//! 兩種格式器共用同一份輸入：排序後的磚列表加上版面配置。
//! 格式以靜態的標籤聯集表示，啟動後即唯讀，跨執行緒讀取不需要鎖。

use crate::component::sprite_generator::frame_extractor::offset_from_file_name;
use crate::component::sprite_generator::json_formatter::JsonFormatter;
use crate::component::sprite_generator::video::Video;
use crate::component::sprite_generator::vtt_formatter::VttFormatter;
use crate::error::{Result, ThumbnailError};
use crate::options::GeneratorOptions;
use crate::tools::{FrameCell, GridLayout, extract_name, metadata_path};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 輸出格式的標籤聯集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// 精靈圖 + WebVTT 提示點
    #[default]
    Vtt,
    /// 幀目錄 + JSON 索引
    Json,
}

impl Format {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vtt" => Some(Self::Vtt),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vtt => "vtt",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub fn formatter(self) -> &'static dyn ThumbnailFormatter {
        match self {
            Self::Vtt => &VttFormatter,
            Self::Json => &JsonFormatter,
        }
    }

    /// 縮圖輸出目錄
    ///
    /// VTT 的精靈圖直接放在輸出目錄；JSON 的個別幀放在
    /// 以影片名稱命名的子目錄。
    #[must_use]
    pub fn thumbnail_dir(self, video_path: &Path, output: Option<&Path>) -> PathBuf {
        let base_dir = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| video_path.parent().unwrap_or(Path::new(".")).to_path_buf());
        match self {
            Self::Vtt => base_dir,
            Self::Json => base_dir.join(extract_name(video_path)),
        }
    }
}

/// 單一縮圖磚：幀檔案、時間範圍與畫布座標
#[derive(Debug, Clone)]
pub struct Tile {
    pub frame: PathBuf,
    pub start: f64,
    pub end: f64,
    pub x: u32,
    pub y: u32,
}

/// 格式器的完整輸入
#[derive(Debug, Clone)]
pub struct ThumbnailPlan {
    pub video_path: PathBuf,
    pub tiles: Vec<Tile>,
    pub cell: FrameCell,
    pub layout: GridLayout,
    pub base: Option<String>,
    pub thumbnail_dir: PathBuf,
    pub metadata_path: PathBuf,
}

impl ThumbnailPlan {
    /// 由暫存目錄中的幀組出磚列表
    ///
    /// 依檔名排序（字典序即時間序）；時間範圍從檔名中的毫秒數還原，
    /// 所以擷取失敗造成的缺格不會影響其餘磚的時間。
    pub fn build(
        video: &Video,
        scratch_dir: &Path,
        options: &GeneratorOptions,
    ) -> Result<Self> {
        let mut frames: Vec<PathBuf> = fs::read_dir(scratch_dir)
            .map_err(|source| ThumbnailError::FormatWrite {
                path: scratch_dir.to_path_buf(),
                source,
            })?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        frames.sort();

        let layout = video.layout();
        let interval = video.interval();
        let tiles = frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let start = frame
                    .file_name()
                    .and_then(|name| offset_from_file_name(&name.to_string_lossy()))
                    .unwrap_or(index as f64 * interval);
                let (x, y) = layout.position(index);
                Tile {
                    frame,
                    start,
                    end: start + interval,
                    x,
                    y,
                }
            })
            .collect();

        Ok(Self {
            video_path: video.path().to_path_buf(),
            tiles,
            cell: video.cell(),
            layout,
            base: options.base.clone(),
            thumbnail_dir: options.format.thumbnail_dir(video.path(), options.output.as_deref()),
            metadata_path: metadata_path(
                video.path(),
                options.output.as_deref(),
                options.format.extension(),
            ),
        })
    }
}

/// 縮圖格式器策略
///
/// `prepare_frames` 處理幀本身（合成或搬移），`generate` 寫出
/// 中繼資料。兩者都以暫存位置寫入後改名，中途當機不會留下
/// 半成品的目的檔。
pub trait ThumbnailFormatter: Sync {
    fn prepare_frames(&self, plan: &ThumbnailPlan) -> Result<()>;
    fn generate(&self, plan: &ThumbnailPlan) -> Result<()>;
}

/// 便宜的前置檢查，必須在任何昂貴的擷取工作之前執行
///
/// 目的中繼資料已存在且要求跳過時，回傳 `ThumbnailExists`
/// 控制訊號（不是錯誤），整個工作跳過。
pub fn perform_skip(metadata_path: &Path, skip: bool) -> Result<()> {
    if skip && metadata_path.exists() {
        return Err(ThumbnailError::ThumbnailExists(metadata_path.to_path_buf()));
    }
    Ok(())
}

/// `HH:MM:SS.mmm`，零填補、毫秒截斷
#[must_use]
pub fn format_cue_time(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).floor().max(0.0) as u64;
    let hours = total_millis / 3_600_000;
    let minutes = total_millis / 60_000 % 60;
    let secs = total_millis / 1000 % 60;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// 原子寫入：先寫同目錄下的暫存檔，再改名到目的路徑
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_write_error = |source: std::io::Error| ThumbnailError::FormatWrite {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().unwrap_or(Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(to_write_error)?;
    file.write_all(bytes).map_err(to_write_error)?;
    file.persist(path)
        .map_err(|error| to_write_error(error.error))?;
    Ok(())
}

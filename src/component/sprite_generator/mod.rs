//! 縮圖生成元件
//!
//! 四階段流程：
//! A. 解析輸入（檔案清單或資料夾展開）
//! B. 探測影片中繼資料並計算版面
//! C. 平行擷取取樣幀
//! D. 依格式（VTT 精靈圖或 JSON 幀目錄）合成輸出

mod formatter;
mod frame_extractor;
mod json_formatter;
mod main;
mod video;
mod vtt_formatter;

pub use formatter::{
    Format, ThumbnailFormatter, ThumbnailPlan, Tile, format_cue_time, perform_skip,
};
pub use frame_extractor::{
    ExtractionResult, ExtractionTask, create_extraction_tasks, extract_frame,
    extract_frames_parallel, offset_file_name, offset_from_file_name,
};
pub use json_formatter::JsonFormatter;
pub use main::{GenerationReport, Generator, JobOutcome, JobReport, resolve_inputs};
pub use video::Video;
pub use vtt_formatter::VttFormatter;

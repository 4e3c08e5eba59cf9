mod admission_gate;
mod diagnostic_parser;
mod frame_sizer;
mod grid_layout;
mod media_probe;
mod path_tools;

pub use admission_gate::{AdmissionGate, AdmissionPermit, cpu_resource_check};
pub use diagnostic_parser::{
    ChapterInfo, FpsSource, InputFileInfo, MediaInfo, StreamInfo, StreamKind, parse_diagnostics,
};
pub use frame_sizer::{FrameCell, MAX_CANVAS_WIDTH, MIN_FRAME_WIDTH};
pub use grid_layout::{GridLayout, MOSAIC_ASPECT, calc_columns};
pub use media_probe::{VideoMetadata, probe_video};
pub use path_tools::{
    ensure_directory_exists, expand_directory, extract_name, metadata_path, relative_to_cwd,
    to_posix,
};

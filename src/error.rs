use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// 縮圖生成的錯誤分類
///
/// 除了 `ThumbnailExists`（控制訊號）與 `Cancelled` 之外，
/// 所有錯誤都只對單一工作有效，批次會繼續處理其餘輸入。
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// 探測失敗 — 跳過該影片，批次繼續
    #[error("無法取得影片中繼資料 {path}: {reason}")]
    MetadataUnavailable { path: PathBuf, reason: String },

    /// 選項超出定義域 — 在任何擷取工作開始前拒絕
    #[error("無效的選項: {0}")]
    InvalidOption(String),

    /// 輸入混合了檔案與資料夾
    #[error("輸入必須全部為檔案，或全部為資料夾")]
    InvalidInput,

    /// 控制訊號，非錯誤 — skip 模式下目標中繼資料已存在
    #[error("縮圖中繼資料已存在: {0}")]
    ThumbnailExists(PathBuf),

    /// 所有取樣時間點的擷取（含重試）均失敗
    #[error("沒有任何取樣幀擷取成功: {0}")]
    NoFramesExtracted(PathBuf),

    /// 收到中斷訊號
    #[error("操作已取消")]
    Cancelled,

    /// 磁碟或權限問題 — 僅對該工作致命
    #[error("無法寫入輸出 {path}: {source}")]
    FormatWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 幀影像讀取或合成失敗
    #[error("無法處理幀影像 {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 無法啟動外部解碼程序
    #[error("無法執行外部程序 {program}: {source}")]
    Process {
        program: String,
        #[source]
        source: io::Error,
    },
}

use crate::component::sprite_generator::Format;
use crate::error::{Result, ThumbnailError};
use crate::tools::FpsSource;
use std::path::PathBuf;

pub const DEFAULT_COMPRESS: f64 = 1.0;
pub const DEFAULT_INTERVAL: f64 = 1.0;

/// 一個批次解析完成後的生成選項
///
/// 前端（CLI）負責收集這些欄位，`validate` 在任何擷取工作
/// 開始前檢查定義域。
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// 縮圖壓縮比例，範圍 (0, 1]
    pub compress: f64,
    /// 取樣間隔（秒），必須大於 0
    pub interval: f64,
    /// 中繼資料中縮圖路徑的前綴；None 時使用相對路徑
    pub base: Option<String>,
    /// 輸出資料夾；None 時輸出到影片所在目錄
    pub output: Option<PathBuf>,
    /// 輸出格式
    pub format: Format,
    /// 目標中繼資料已存在時跳過整個工作
    pub skip: bool,
    /// 工作執行緒數；None 時自動推算
    pub workers: Option<usize>,
    /// 幀率欄位的偏好來源
    pub fps_source: FpsSource,
    /// 以解碼進度推定時長（容器時長不可靠時）
    pub check_duration: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            compress: DEFAULT_COMPRESS,
            interval: DEFAULT_INTERVAL,
            base: None,
            output: None,
            format: Format::Vtt,
            skip: false,
            workers: None,
            fps_source: FpsSource::Fps,
            check_duration: false,
        }
    }
}

impl GeneratorOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.compress > 0.0 && self.compress <= 1.0) {
            return Err(ThumbnailError::InvalidOption(format!(
                "compress 必須在 (0, 1] 範圍內，目前為 {}",
                self.compress
            )));
        }
        if !(self.interval > 0.0) {
            return Err(ThumbnailError::InvalidOption(format!(
                "interval 必須大於 0，目前為 {}",
                self.interval
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(GeneratorOptions::default().validate().is_ok());
    }

    #[test]
    fn test_compress_domain() {
        let mut options = GeneratorOptions {
            compress: 0.0,
            ..GeneratorOptions::default()
        };
        assert!(options.validate().is_err());

        options.compress = 1.000_001;
        assert!(options.validate().is_err());

        options.compress = 1.0;
        assert!(options.validate().is_ok());

        options.compress = f64::NAN;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_interval_domain() {
        let options = GeneratorOptions {
            interval: 0.0,
            ..GeneratorOptions::default()
        };
        assert!(options.validate().is_err());
    }
}

//! 影片中繼資料探測
//!
//! 快速路徑先以 ffprobe 查詢容器中繼資料；時長或畫面尺寸缺漏時，
//! 改以 `ffmpeg -hide_banner -i` 的診斷輸出作為後備來源。

use crate::error::{Result, ThumbnailError};
use crate::tools::diagnostic_parser::{FpsSource, InputFileInfo, MediaInfo, parse_diagnostics};
use anyhow::{Context, bail};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

/// 容器層級幀率缺漏時的保守預設值
const FALLBACK_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub bitrate_kbps: Option<u32>,
    /// floor(duration · fps)
    pub frame_count: u64,
    /// 檔案層級標籤（只有診斷輸出路徑會填入）
    pub metadata: HashMap<String, String>,
    /// 每個輸入檔案的串流與章節（只有診斷輸出路徑會填入）
    pub inputs: Vec<InputFileInfo>,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// 探測影片的中繼資料
///
/// 任一路徑失敗都對應 `MetadataUnavailable`，呼叫端跳過該影片即可，
/// 不影響批次中的其他工作。
pub fn probe_video(
    path: &Path,
    fps_source: FpsSource,
    check_duration: bool,
) -> Result<VideoMetadata> {
    // 要求以解碼進度校正時長時，容器宣告的值本來就不可信，
    // 不走 ffprobe 快速路徑
    if check_duration {
        return probe_diagnostics(path, fps_source, true);
    }

    match probe_container(path) {
        Ok(metadata) => Ok(metadata),
        Err(error) => {
            debug!(
                "容器中繼資料不完整（{error:#}），改用診斷輸出: {}",
                path.display()
            );
            probe_diagnostics(path, fps_source, false)
        }
    }
}

/// 快速路徑：ffprobe 的 JSON 輸出
fn probe_container(path: &Path) -> anyhow::Result<VideoMetadata> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let probe: FfprobeOutput =
        serde_json::from_str(&stdout).context("無法解析 ffprobe 輸出")?;

    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| anyhow::anyhow!("找不到視訊串流: {}", path.display()))?;

    let width = video_stream
        .width
        .ok_or_else(|| anyhow::anyhow!("無法取得影片寬度"))?;
    let height = video_stream
        .height
        .ok_or_else(|| anyhow::anyhow!("無法取得影片高度"))?;

    // 時長優先取 format，其次取 stream
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("無法取得影片時長"))?;

    let frame_rate = video_stream
        .r_frame_rate
        .as_ref()
        .and_then(|r| parse_rational_rate(r))
        .unwrap_or(FALLBACK_FRAME_RATE);

    let bitrate_kbps = probe
        .format
        .as_ref()
        .and_then(|f| f.bit_rate.as_ref())
        .and_then(|b| b.parse::<u64>().ok())
        .map(|bits| (bits / 1000) as u32);

    Ok(VideoMetadata {
        duration_seconds,
        width,
        height,
        frame_rate,
        bitrate_kbps,
        frame_count: (duration_seconds * frame_rate).floor() as u64,
        metadata: HashMap::new(),
        inputs: Vec::new(),
    })
}

/// 後備路徑：解析解碼器的診斷輸出
///
/// 每次探測只啟動一個短命的外部程序；`check_duration` 時解碼到
/// null 輸出以取得 `time=` 進度標記。
fn probe_diagnostics(
    path: &Path,
    fps_source: FpsSource,
    check_duration: bool,
) -> Result<VideoMetadata> {
    let mut command = Command::new("ffmpeg");
    command.args(["-hide_banner", "-i"]).arg(path);
    if check_duration {
        command.args(["-f", "null", "-"]);
    }

    let output = command.output().map_err(|source| ThumbnailError::Process {
        program: "ffmpeg".to_string(),
        source,
    })?;

    // 沒有輸出參數時 ffmpeg 以非零碼結束，診斷文字照樣在 stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    let info = parse_diagnostics(&stderr, fps_source, check_duration).map_err(|error| {
        ThumbnailError::MetadataUnavailable {
            path: path.to_path_buf(),
            reason: format!("{error:#}"),
        }
    })?;

    metadata_from_info(path, info)
}

/// 把解析結果定型為完整的中繼資料
///
/// 幀率後備值套用之後才推導幀數，兩個欄位才會一致。
fn metadata_from_info(path: &Path, info: MediaInfo) -> Result<VideoMetadata> {
    let unavailable = |reason: &str| ThumbnailError::MetadataUnavailable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if !info.has_video {
        return Err(unavailable("找不到可解析的視訊串流"));
    }
    let (width, height) = info
        .video_size
        .ok_or_else(|| unavailable("診斷輸出中沒有畫面尺寸"))?;
    let duration_seconds = info
        .duration
        .ok_or_else(|| unavailable("診斷輸出中沒有時長"))?;
    let frame_rate = info.video_fps.unwrap_or(FALLBACK_FRAME_RATE);

    Ok(VideoMetadata {
        duration_seconds,
        width,
        height,
        frame_rate,
        bitrate_kbps: info.video_bitrate_kbps.or(info.bitrate_kbps),
        frame_count: (duration_seconds * frame_rate).floor() as u64,
        metadata: info.metadata,
        inputs: info.inputs,
    })
}

/// 解析 `30/1`、`30000/1001` 這類分數幀率
fn parse_rational_rate(rate: &str) -> Option<f64> {
    if let Some((numerator, denominator)) = rate.split_once('/') {
        let numerator: f64 = numerator.parse().ok()?;
        let denominator: f64 = denominator.parse().ok()?;
        if denominator > 0.0 {
            return Some(numerator / denominator);
        }
        return None;
    }
    rate.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational_rate_fraction() {
        assert!((parse_rational_rate("30/1").unwrap() - 30.0).abs() < 1e-9);
        assert!((parse_rational_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_rational_rate_decimal() {
        assert!((parse_rational_rate("29.97").unwrap() - 29.97).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rational_rate_invalid() {
        assert!(parse_rational_rate("invalid").is_none());
        assert!(parse_rational_rate("30/0").is_none());
    }

    #[test]
    fn test_frame_count_follows_fallback_rate() {
        // 診斷輸出裡沒有幀率時，幀數要以後備幀率推導，不能是 0
        let info = MediaInfo {
            has_video: true,
            duration: Some(10.0),
            video_size: Some((640, 360)),
            video_fps: None,
            ..MediaInfo::default()
        };
        let metadata = metadata_from_info(Path::new("clip.mp4"), info).unwrap();
        assert_eq!(metadata.frame_rate, FALLBACK_FRAME_RATE);
        assert_eq!(metadata.frame_count, 300);
    }

    #[test]
    fn test_check_duration_probes_by_decoding() {
        if Command::new("ffmpeg").arg("-version").output().is_err() {
            println!("跳過測試：系統沒有 ffmpeg");
            return;
        }

        let temp = tempfile::tempdir().unwrap();
        let video = temp.path().join("clip.mp4");
        let created = Command::new("ffmpeg")
            .args(["-f", "lavfi", "-i", "color=c=black:s=64x64:d=2:r=10"])
            .args(["-pix_fmt", "yuv420p", "-y"])
            .arg(&video)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        if !created {
            println!("跳過測試：無法生成測試影片");
            return;
        }

        // check_duration 走診斷路徑，時長取自解碼進度標記
        let metadata = probe_video(&video, FpsSource::Fps, true).unwrap();
        assert!(
            metadata.duration_seconds > 1.0 && metadata.duration_seconds < 3.0,
            "解碼得出的時長應接近 2 秒，實際 {:.2}",
            metadata.duration_seconds
        );
        assert_eq!((metadata.width, metadata.height), (64, 64));
    }

    #[test]
    fn test_probe_missing_file_is_metadata_unavailable() {
        let result = probe_video(
            Path::new("/nonexistent/video.mp4"),
            FpsSource::Fps,
            false,
        );
        assert!(matches!(
            result,
            Err(ThumbnailError::MetadataUnavailable { .. }) | Err(ThumbnailError::Process { .. })
        ));
    }
}

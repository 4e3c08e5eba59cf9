//! 取樣幀擷取管線
//!
//! 每個取樣時間點各啟動一個短命的解碼程序（seek 後取一幀），
//! 以 rayon 平行處理並受許可閘節流。完成順序無關緊要，
//! 檔名以零填補的毫秒數編碼時間點，字典序即時間序。

use crate::signal::ShutdownToken;
use crate::tools::{AdmissionGate, FrameCell};
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 檔尾相對 seek 的重試偏移（秒）
const EOF_SEEK_BACK: f64 = 0.1;

/// 單一取樣時間點的擷取任務
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub video_path: PathBuf,
    pub offset: f64,
    pub output_path: PathBuf,
    pub index: usize,
}

/// 擷取結果；失敗只代表網格中的一個缺格，不會中止整個工作
#[derive(Debug)]
pub struct ExtractionResult {
    pub offset: f64,
    pub output_path: PathBuf,
    pub index: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

/// 時間點編碼成檔名：零填補毫秒數，字典序即時間序
#[must_use]
pub fn offset_file_name(offset: f64) -> String {
    format!("{:012}.png", (offset * 1000.0).round() as u64)
}

/// 從檔名還原取樣時間點
#[must_use]
pub fn offset_from_file_name(name: &str) -> Option<f64> {
    let millis: u64 = name.strip_suffix(".png")?.parse().ok()?;
    Some(millis as f64 / 1000.0)
}

#[must_use]
pub fn create_extraction_tasks(
    video_path: &Path,
    offsets: &[f64],
    scratch_dir: &Path,
) -> Vec<ExtractionTask> {
    offsets
        .iter()
        .enumerate()
        .map(|(index, &offset)| ExtractionTask {
            video_path: video_path.to_path_buf(),
            offset,
            output_path: scratch_dir.join(offset_file_name(offset)),
            index,
        })
        .collect()
}

/// 擷取單一取樣幀
///
/// 零位元組輸出代表 seek 落在最後一個關鍵幀之後（常見於影片
/// 結尾），此時改以檔尾相對的負向 seek 重試恰好一次。
#[must_use]
pub fn extract_frame(task: &ExtractionTask, cell: FrameCell) -> ExtractionResult {
    match extract_frame_inner(task, cell) {
        Ok(()) => ExtractionResult {
            offset: task.offset,
            output_path: task.output_path.clone(),
            index: task.index,
            success: true,
            error_message: None,
        },
        Err(error) => ExtractionResult {
            offset: task.offset,
            output_path: task.output_path.clone(),
            index: task.index,
            success: false,
            error_message: Some(format!("{error:#}")),
        },
    }
}

fn extract_frame_inner(task: &ExtractionTask, cell: FrameCell) -> Result<()> {
    run_decoder(task, cell, false)?;

    if is_zero_byte(&task.output_path) {
        debug!(
            "時間點 {:.3}s 的輸出為空，改以檔尾相對 seek 重試: {}",
            task.offset,
            task.video_path.display()
        );
        run_decoder(task, cell, true)?;

        if is_zero_byte(&task.output_path) {
            bail!("重試後輸出仍為空: {}", task.output_path.display());
        }
    }

    Ok(())
}

fn run_decoder(task: &ExtractionTask, cell: FrameCell, seek_from_eof: bool) -> Result<()> {
    let mut command = Command::new("ffmpeg");

    if seek_from_eof {
        command.args(["-sseof", &format!("-{EOF_SEEK_BACK}")]);
    } else {
        command.args(["-ss", &format!("{:.3}", task.offset)]);
    }

    command
        .arg("-i")
        .arg(&task.video_path)
        .args(["-loglevel", "error", "-vframes", "1", "-vf"])
        .arg(format!("scale={}:{}", cell.width, cell.height))
        .arg(&task.output_path)
        .arg("-y");

    let output = command
        .output()
        .with_context(|| format!("無法執行 ffmpeg 擷取幀: {}", task.video_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // 結束碼非零但輸出檔有內容時照常使用；零位元組由呼叫端處理
        debug!("ffmpeg 以非零碼結束: {}", stderr.trim());
    }

    Ok(())
}

/// 輸出檔缺失或為零位元組
fn is_zero_byte(path: &Path) -> bool {
    fs::metadata(path).map_or(true, |metadata| metadata.len() == 0)
}

/// 平行擷取所有取樣幀
///
/// 使用 rayon 的全域執行緒池（與影片層級的池互相獨立），
/// 每次啟動解碼程序前先通過許可閘。取消後不再啟動新程序。
pub fn extract_frames_parallel(
    tasks: &[ExtractionTask],
    cell: FrameCell,
    gate: &AdmissionGate,
    shutdown: &ShutdownToken,
) -> Vec<ExtractionResult> {
    tasks
        .par_iter()
        .map(|task| {
            if shutdown.is_cancelled() {
                return ExtractionResult {
                    offset: task.offset,
                    output_path: task.output_path.clone(),
                    index: task.index,
                    success: false,
                    error_message: Some("操作已取消".to_string()),
                };
            }

            let _permit = gate.acquire();
            let result = extract_frame(task, cell);

            if let Some(message) = result.error_message.as_ref().filter(|_| !result.success) {
                warn!(
                    "幀擷取失敗 [{:.3}s] {}: {}",
                    task.offset,
                    task.video_path.display(),
                    message
                );
            }

            result
        })
        .collect()
}

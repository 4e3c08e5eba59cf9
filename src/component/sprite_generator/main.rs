use super::formatter::{ThumbnailPlan, perform_skip};
use super::frame_extractor::{create_extraction_tasks, extract_frames_parallel};
use super::video::Video;
use crate::error::{Result, ThumbnailError};
use crate::options::GeneratorOptions;
use crate::signal::ShutdownToken;
use crate::tools::{AdmissionGate, cpu_resource_check, expand_directory, metadata_path};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 每部影片的工作上限，避免在大批輸入時開出過多執行緒
const MAX_WORKERS: usize = 32;

/// 啟動新解碼程序前的 CPU 使用率門檻（百分比）
const CPU_ADMISSION_THRESHOLD: f32 = 85.0;

/// 單一影片工作的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// 縮圖與中繼資料已寫出
    Generated,
    /// 中繼資料已存在且開啟跳過
    Skipped,
    /// 收到中斷信號，工作未完成
    Cancelled,
    /// 工作失敗，其餘影片不受影響
    Failed(String),
}

/// 單一影片工作的路徑與結果
#[derive(Debug, Clone)]
pub struct JobReport {
    pub path: PathBuf,
    pub outcome: JobOutcome,
}

/// 整批生成的摘要
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub jobs: Vec<JobReport>,
}

impl GenerationReport {
    #[must_use]
    pub fn generated(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Generated))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Skipped))
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Cancelled))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs
            .iter()
            .filter(|job| predicate(&job.outcome))
            .count()
    }
}

/// 縮圖生成器
///
/// 四階段流程：
/// A. 解析輸入（檔案清單或資料夾展開）
/// B. 探測影片中繼資料並計算版面
/// C. 平行擷取取樣幀到暫存目錄
/// D. 依格式合成輸出
///
/// 影片之間平行（專屬執行緒池），影片內的幀擷取也平行
/// （rayon 全域池），兩層共用同一個許可閘控制解碼程序總數。
pub struct Generator {
    inputs: Vec<PathBuf>,
    options: GeneratorOptions,
    shutdown: ShutdownToken,
    gate: Arc<AdmissionGate>,
}

impl Generator {
    pub fn new(
        inputs: &[PathBuf],
        options: GeneratorOptions,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        options.validate()?;
        let inputs = resolve_inputs(inputs)?;
        let limit = std::thread::available_parallelism().map_or(4, std::num::NonZero::get);
        let gate = Arc::new(AdmissionGate::with_resource_check(
            limit,
            cpu_resource_check(CPU_ADMISSION_THRESHOLD),
        ));
        Ok(Self {
            inputs,
            options,
            shutdown,
            gate,
        })
    }

    #[must_use]
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    /// 影片層級的平行度
    #[must_use]
    pub fn workers(&self) -> usize {
        if let Some(workers) = self.options.workers {
            return workers.max(1);
        }
        let parallelism = std::thread::available_parallelism().map_or(4, std::num::NonZero::get);
        MAX_WORKERS.min(self.inputs.len()).min(parallelism + 4).max(1)
    }

    /// 處理所有輸入影片，回傳逐部影片的結果
    ///
    /// 單部影片失敗不會中止整批；只有中斷信號會提前結束。
    pub fn generate(&self) -> Result<GenerationReport> {
        if self.inputs.is_empty() {
            warn!("沒有任何輸入影片");
            return Ok(GenerationReport::default());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers())
            .build()
            .map_err(|e| ThumbnailError::InvalidOption(format!("無法建立執行緒池: {e}")))?;

        let progress_bar = ProgressBar::new(self.inputs.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message("生成縮圖中...");

        let jobs: Vec<JobReport> = pool.install(|| {
            self.inputs
                .par_iter()
                .map(|path| {
                    let outcome = if self.shutdown.is_cancelled() {
                        JobOutcome::Cancelled
                    } else {
                        self.run_job(path)
                    };
                    progress_bar.inc(1);
                    JobReport {
                        path: path.clone(),
                        outcome,
                    }
                })
                .collect()
        });

        progress_bar.finish_with_message("完成");

        let report = GenerationReport { jobs };
        info!(
            "縮圖生成完成 - 成功: {}, 跳過: {}, 失敗: {}, 取消: {}",
            report.generated(),
            report.skipped(),
            report.failed(),
            report.cancelled()
        );
        Ok(report)
    }

    fn run_job(&self, path: &Path) -> JobOutcome {
        match self.run_job_stages(path) {
            Ok(()) => {
                info!("縮圖已建立: {}", path.display());
                JobOutcome::Generated
            }
            Err(ThumbnailError::ThumbnailExists(existing)) => {
                info!("縮圖已存在，跳過: {}", existing.display());
                JobOutcome::Skipped
            }
            Err(ThumbnailError::Cancelled) => JobOutcome::Cancelled,
            Err(e) => {
                error!("處理影片失敗 {}: {e}", path.display());
                JobOutcome::Failed(e.to_string())
            }
        }
    }

    fn run_job_stages(&self, path: &Path) -> Result<()> {
        // 跳過檢查必須在任何昂貴工作之前
        let metadata = metadata_path(
            path,
            self.options.output.as_deref(),
            self.options.format.extension(),
        );
        perform_skip(&metadata, self.options.skip)?;

        let video = Video::probe(path, &self.options)?;

        // 暫存目錄在 drop 時自動清除，失敗路徑不會殘留幀檔
        let scratch = tempfile::tempdir().map_err(|source| ThumbnailError::FormatWrite {
            path: path.to_path_buf(),
            source,
        })?;

        let tasks = create_extraction_tasks(path, &video.sample_offsets(), scratch.path());
        let results = extract_frames_parallel(&tasks, video.cell(), &self.gate, &self.shutdown);

        if self.shutdown.is_cancelled() {
            return Err(ThumbnailError::Cancelled);
        }
        if results.iter().all(|result| !result.success) {
            return Err(ThumbnailError::NoFramesExtracted(path.to_path_buf()));
        }

        let plan = ThumbnailPlan::build(&video, scratch.path(), &self.options)?;
        let formatter = self.options.format.formatter();
        formatter.prepare_frames(&plan)?;
        formatter.generate(&plan)?;
        Ok(())
    }
}

/// 把輸入路徑解析為影片檔案清單
///
/// 輸入必須全為檔案或全為資料夾，混用直接拒絕。資料夾會遞迴
/// 展開，並排除先前生成的產物（png/vtt/json），結果排序後回傳。
pub fn resolve_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let all_files = paths.iter().all(|path| path.is_file());
    let all_dirs = paths.iter().all(|path| path.is_dir());
    if !all_files && !all_dirs {
        return Err(ThumbnailError::InvalidInput);
    }

    let mut inputs = if all_files {
        paths.to_vec()
    } else {
        let artifact = Regex::new(r"(?i)\.(png|vtt|json)$").map_err(|e| {
            ThumbnailError::InvalidOption(format!("無效的過濾樣式: {e}"))
        })?;
        paths
            .iter()
            .flat_map(|directory| expand_directory(directory))
            .filter(|file| !artifact.is_match(&file.to_string_lossy()))
            .collect()
    };
    inputs.sort();
    inputs.dedup();
    Ok(inputs)
}

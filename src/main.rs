use anyhow::Result;
use clap::Parser;
use console::style;
use log::info;
use std::path::PathBuf;
use thumbgrid::component::sprite_generator::{Format, GenerationReport, Generator, JobOutcome};
use thumbgrid::options::{DEFAULT_COMPRESS, DEFAULT_INTERVAL, GeneratorOptions};
use thumbgrid::signal::ShutdownToken;
use thumbgrid::tools::FpsSource;

/// 為影片批次生成進度列預覽縮圖（精靈圖 + WebVTT，或幀目錄 + JSON）
#[derive(Debug, Parser)]
#[command(name = "thumbgrid", version, about)]
struct Cli {
    /// 輸入影片檔案或資料夾（兩者不可混用）
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 縮圖相對原始畫面的縮放比例，範圍 (0, 1]
    #[arg(short, long, default_value_t = DEFAULT_COMPRESS)]
    compress: f64,

    /// 取樣間隔（秒）
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL)]
    interval: f64,

    /// 中繼資料中引用縮圖時的路徑前綴（例如 CDN URL）
    #[arg(short, long)]
    base: Option<String>,

    /// 輸出資料夾，預設為影片所在資料夾
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 輸出格式：vtt 或 json
    #[arg(short = 'F', long, default_value = "vtt")]
    format: String,

    /// 中繼資料已存在時跳過該影片
    #[arg(short, long)]
    skip: bool,

    /// 影片層級的平行工作數，預設依輸入數量與 CPU 自動決定
    #[arg(short, long)]
    workers: Option<usize>,

    /// 幀率來源欄位：fps 或 tbr
    #[arg(long, default_value = "fps")]
    fps_source: String,

    /// 以實際解碼校正容器宣告的時長（較慢但較準）
    #[arg(long)]
    check_duration: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let options = build_options(&cli)?;

    let shutdown = ShutdownToken::new();
    shutdown.hook_ctrlc()?;

    let generator = Generator::new(&cli.inputs, options, shutdown)?;
    println!(
        "{}",
        style(format!("找到 {} 個影片檔案", generator.inputs().len())).green()
    );

    let report = generator.generate()?;
    print_summary(&report);

    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<GeneratorOptions> {
    let format = Format::from_name(&cli.format)
        .ok_or_else(|| anyhow::anyhow!("無效的輸出格式: {}（可用: vtt, json）", cli.format))?;
    let fps_source = FpsSource::from_name(&cli.fps_source)
        .ok_or_else(|| anyhow::anyhow!("無效的幀率來源: {}（可用: fps, tbr）", cli.fps_source))?;

    let options = GeneratorOptions {
        compress: cli.compress,
        interval: cli.interval,
        base: cli.base.clone(),
        output: cli.output.clone(),
        format,
        skip: cli.skip,
        workers: cli.workers,
        fps_source,
        check_duration: cli.check_duration,
    };
    options.validate()?;
    Ok(options)
}

fn print_summary(report: &GenerationReport) {
    println!();
    println!("{}", style("=== 縮圖生成摘要 ===").cyan().bold());

    for job in &report.jobs {
        let name = job
            .path
            .file_name()
            .map_or_else(|| job.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        match &job.outcome {
            JobOutcome::Generated => {
                println!("  {} {}", style("✓").green(), name);
            }
            JobOutcome::Skipped => {
                println!("  {} {} 已存在，跳過", style("⤳").dim(), name);
            }
            JobOutcome::Cancelled => {
                println!("  {} {} 已取消", style("⊘").yellow(), name);
            }
            JobOutcome::Failed(message) => {
                println!("  {} {} 失敗: {}", style("✗").red(), name, message);
            }
        }
    }

    println!("  總計: {} 個影片", report.jobs.len());
    println!("  成功: {} 個", style(report.generated()).green());
    if report.skipped() > 0 {
        println!("  跳過: {} 個", style(report.skipped()).yellow());
    }
    if report.cancelled() > 0 {
        println!("  取消: {} 個", style(report.cancelled()).yellow());
    }
    if report.failed() > 0 {
        println!("  失敗: {} 個", style(report.failed()).red());
    }

    info!(
        "摘要 - 成功: {}, 跳過: {}, 失敗: {}",
        report.generated(),
        report.skipped(),
        report.failed()
    );
}

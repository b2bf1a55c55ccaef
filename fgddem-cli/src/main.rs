use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fgddem::{collect_inputs, Converter, MergeStrategy, NodataPolicy, RunConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 入力XMLファイル、ZIPファイル、またはディレクトリ
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// 出力ディレクトリ（省略時は入力と同じ場所）
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// 出力形式（GDALドライバー名）
    #[arg(short = 'f', long = "format", value_name = "DRIVER", default_value = "GTiff")]
    format: String,

    /// 作成オプション（NAME=VALUE、複数指定可）
    #[arg(long = "co", value_name = "NAME=VALUE")]
    creation_options: Vec<String>,

    /// NoData値を-9999ではなく0で埋める
    #[arg(long)]
    replace_nodata_by_zero: bool,

    /// 複数タイルの結合方法
    #[arg(long, value_enum, default_value_t = MergerArg::External)]
    merger: MergerArg,

    /// 進捗を表示しない
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// 詳細を表示
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum MergerArg {
    /// gdalwarpを呼び出す
    External,
    /// プロセス内で合成する
    InProcess,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            nodata: NodataPolicy::from_replace_by_zero(self.replace_nodata_by_zero),
            driver: self.format.clone(),
            creation_options: self.creation_options.clone(),
            merge_strategy: match self.merger {
                MergerArg::External => MergeStrategy::External,
                MergerArg::InProcess => MergeStrategy::InProcess,
            },
            verbose: self.verbose,
            quiet: self.quiet,
            ..Default::default()
        }
    }

    fn log_level(&self) -> Level {
        if self.quiet {
            Level::WARN
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

fn main() -> ExitCode {
    // CLI引数の解析
    let args = Args::parse();

    // ログの初期化
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    let inputs = collect_inputs(&args.inputs).context("Failed to collect input files")?;
    if inputs.is_empty() {
        anyhow::bail!("No input files selected");
    }

    // 出力ディレクトリの作成
    if let Some(out_dir) = &args.out_dir {
        if !out_dir.exists() {
            fs::create_dir_all(out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            info!("Directory has been created: {}", out_dir.display());
        }
    }

    let converter = Converter::new(args.run_config()).context("Failed to set up converter")?;
    let report = converter.convert_all(&inputs, args.out_dir.as_deref());

    if !report.is_success() {
        error!(
            "Failed to process {} of {} files",
            report.failures.len(),
            inputs.len()
        );
    }

    // 処理時間を表示
    info!("Total processing time: {:?}", start_time.elapsed());

    Ok(report.is_success())
}

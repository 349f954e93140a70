use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use paper_scout::utils::logging;
use paper_scout::{App, Config};

/// 按主题检索 arXiv 论文并用 LLM 生成摘要
#[derive(Parser)]
#[command(name = "paper-scout", version, about)]
struct Cli {
    /// 研究主题；省略时进入交互模式
    topic: Option<String>,

    /// 最多检索的论文数
    #[arg(short = 'n', long)]
    max_results: Option<usize>,

    /// 同时处理的论文数
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// 单次摘要尝试的超时（秒）
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// 以 JSON 输出报告
    #[arg(long)]
    json: bool,

    /// TOML 配置文件
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let mut options = config.pipeline_options();
    if let Some(n) = cli.max_results {
        options = options.with_max_results(n);
    }
    if let Some(c) = cli.concurrency {
        options = options.with_concurrency(c);
    }
    if let Some(secs) = cli.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let app = App::initialize(config)?;

    match cli.topic {
        Some(topic) => {
            app.run_once(&topic, &options, cli.json).await?;
        }
        None => app.run_interactive(&options, cli.json).await?,
    }

    Ok(())
}

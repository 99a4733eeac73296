use std::sync::Arc;

use anyhow::Result;
use ecourts_case_fetch::utils::logging;
use ecourts_case_fetch::{api, ChromeLauncher, Config, RequestHandler, TesseractSolver};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let handler = RequestHandler::new(
        &config,
        Arc::new(ChromeLauncher::new(&config)),
        Arc::new(TesseractSolver::new(&config)),
    );

    api::serve(&config, Arc::new(handler)).await
}

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{BrowserError, BrowserResult};

/// 启动一个专属浏览器并打开空白页
///
/// `config.headless` 决定是否显示窗口
pub async fn launch_browser(config: &Config) -> BrowserResult<(Browser, JoinHandle<()>, Page)> {
    info!(
        "🚀 启动{}浏览器...",
        if config.headless { "无头" } else { "有界面" }
    );

    let mut builder = BrowserConfig::builder()
        .window_size(1920, 1080)
        .request_timeout(config.page_load_timeout())
        .args(vec![
            "--disable-gpu",           // 无头模式下禁用 GPU
            "--no-sandbox",            // 容器内没有沙盒权限
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--disable-blink-features=AutomationControlled",
        ]);
    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(path) = &config.chrome_executable {
        debug!("使用浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::ConfigurationFailed(e)
    })?;

    let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed {
            source: Box::new(e),
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            browser.close().await.ok();
            handler_task.abort();
            return Err(BrowserError::PageCreationFailed {
                source: Box::new(e),
            });
        }
    };

    Ok((browser, handler_task, page))
}

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{BrowserError, BrowserResult};

/// 连接到已运行的浏览器，并为本次请求新开一个标签页
///
/// 用于调试：浏览器由用户手动启动（`--remote-debugging-port`），可以看到整个过程
pub async fn attach_to_browser(port: u16) -> BrowserResult<(Browser, JoinHandle<()>, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            source: Box::new(e),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建新页面失败: {}", e);
            handler_task.abort();
            return Err(BrowserError::PageCreationFailed {
                source: Box::new(e),
            });
        }
    };

    Ok((browser, handler_task, page))
}

//! 基于 chromiumoxide 的浏览器会话

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::{Browser, Page};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::browser::{attach_to_browser, launch_browser, scripts};
use crate::config::Config;
use crate::error::{BrowserError, BrowserResult};
use crate::infrastructure::{BrowserSession, JsExecutor, PageSnapshot, SessionFactory};

/// 会话来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionMode {
    /// 自己启动的浏览器，关闭时结束进程
    Launched,
    /// 连接到已有浏览器，关闭时只关标签页
    Attached,
}

pub struct ChromeSession {
    browser: Browser,
    executor: Option<JsExecutor>,
    handler_task: JoinHandle<()>,
    mode: SessionMode,
    page_load_timeout: Duration,
    poll_interval: Duration,
}

impl ChromeSession {
    fn new(
        browser: Browser,
        handler_task: JoinHandle<()>,
        page: Page,
        mode: SessionMode,
        config: &Config,
    ) -> Self {
        Self {
            browser,
            executor: Some(JsExecutor::new(page)),
            handler_task,
            mode,
            page_load_timeout: config.page_load_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// 之后打开的每个文档都截获 alert / confirm
    async fn install_dialog_hook(&self) -> BrowserResult<()> {
        self.executor()?
            .page()
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                scripts::DIALOG_HOOK,
            ))
            .await?;
        Ok(())
    }

    fn executor(&self) -> BrowserResult<&JsExecutor> {
        self.executor.as_ref().ok_or(BrowserError::SessionClosed)
    }
}

#[derive(Debug, Deserialize)]
struct SelectResult {
    found: bool,
    option: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageState {
    found: bool,
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct HtmlResult {
    html: Option<String>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        let executor = self.executor()?;
        debug!("导航到: {}", url);
        match timeout(self.page_load_timeout, executor.page().goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BrowserError::navigation_failed(url, e)),
            Err(_) => return Err(BrowserError::timeout(url, self.page_load_timeout)),
        }
        // 导航前注册的脚本对当前文档也要生效
        executor.eval(scripts::DIALOG_HOOK).await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, limit: Duration) -> BrowserResult<()> {
        let executor = self.executor()?;
        let deadline = Instant::now() + limit;
        let script = scripts::is_visible(selector);
        loop {
            if executor.eval_as::<bool>(script.as_str()).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::timeout(selector, limit));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn select_option(
        &self,
        selector: &str,
        text_fragment: &str,
    ) -> BrowserResult<Option<String>> {
        let poll_ms = self.poll_interval.as_millis() as u64;
        let result: SelectResult = self
            .executor()?
            .eval_as(scripts::select_option(selector, text_fragment, poll_ms))
            .await?;
        if !result.found {
            return Err(BrowserError::element_not_found(selector));
        }
        Ok(result.option)
    }

    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()> {
        let found: bool = self
            .executor()?
            .eval_as(scripts::fill(selector, value))
            .await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::element_not_found(selector))
        }
    }

    async fn click(&self, selector: &str, text_fragment: Option<&str>) -> BrowserResult<bool> {
        self.executor()?
            .eval_as(scripts::click(selector, text_fragment))
            .await
    }

    async fn screenshot(&self, selector: &str) -> BrowserResult<Vec<u8>> {
        let executor = self.executor()?;
        let state: ImageState = executor.eval_as(scripts::image_ready(selector)).await?;
        if !state.found {
            return Err(BrowserError::element_not_found(selector));
        }
        if !state.ready {
            return Err(BrowserError::NotReady {
                selector: selector.to_string(),
            });
        }
        let element = executor.page().find_element(selector).await?;
        let bytes = element.screenshot(CaptureScreenshotFormat::Png).await?;
        debug!("截取 {} 图片 {} 字节", selector, bytes.len());
        Ok(bytes)
    }

    async fn snapshot(&self, markers: &[&str]) -> BrowserResult<PageSnapshot> {
        self.executor()?.eval_as(scripts::snapshot(markers)).await
    }

    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>> {
        let result: HtmlResult = self
            .executor()?
            .eval_as(scripts::outer_html(selector))
            .await?;
        Ok(result.html)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let Some(executor) = self.executor.take() else {
            return Ok(());
        };
        let result = match self.mode {
            SessionMode::Launched => {
                let closed = self.browser.close().await;
                if let Err(e) = self.browser.wait().await {
                    warn!("等待浏览器进程退出失败: {}", e);
                }
                closed.map(|_| ())
            }
            SessionMode::Attached => executor.into_page().close().await,
        };
        self.handler_task.abort();
        result.map_err(BrowserError::from)
    }
}

/// 按配置启动或连接浏览器
pub struct ChromeLauncher {
    config: Config,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let (browser, handler_task, page, mode) = match self.config.browser_debug_port {
            Some(port) => {
                let (browser, handler_task, page) = attach_to_browser(port).await?;
                (browser, handler_task, page, SessionMode::Attached)
            }
            None => {
                let (browser, handler_task, page) = launch_browser(&self.config).await?;
                (browser, handler_task, page, SessionMode::Launched)
            }
        };
        let mut session = ChromeSession::new(browser, handler_task, page, mode, &self.config);
        if let Err(e) = session.install_dialog_hook().await {
            warn!("注入对话框钩子失败，关闭浏览器: {}", e);
            session.close().await.ok();
            return Err(e);
        }
        Ok(Box::new(session))
    }
}

//! 浏览器会话 - 基础设施层
//!
//! 只暴露"操作一个页面"的能力，不认识案件、验证码或结果页

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BrowserResult;

/// 某一时刻页面的可观察状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// `document.body.innerText`
    #[serde(default)]
    pub body_text: String,
    /// 传入的标记选择器中当前可见的那些
    #[serde(default)]
    pub visible_markers: Vec<String>,
    /// 自上次快照以来弹出的 alert/confirm 文本
    #[serde(default)]
    pub dialogs: Vec<String>,
}

/// 单个浏览器会话
///
/// 每个请求独占一个会话；`close` 由 `SessionGuard` 保证恰好调用一次
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 打开地址并等待加载完成
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// 等待选择器对应的元素可见
    async fn wait_for(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// 在下拉框中选中文本包含 `text_fragment` 的选项，返回选项全文；没有匹配时返回 None
    async fn select_option(
        &self,
        selector: &str,
        text_fragment: &str,
    ) -> BrowserResult<Option<String>>;

    /// 清空并填入输入框
    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()>;

    /// 点击第一个可见的匹配元素（可按文本过滤），返回是否点到
    async fn click(&self, selector: &str, text_fragment: Option<&str>) -> BrowserResult<bool>;

    /// 截取元素图片（PNG）
    async fn screenshot(&self, selector: &str) -> BrowserResult<Vec<u8>>;

    /// 读取页面状态
    async fn snapshot(&self, markers: &[&str]) -> BrowserResult<PageSnapshot>;

    /// 第一个匹配元素的 outerHTML
    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// 释放浏览器资源
    async fn close(&mut self) -> BrowserResult<()>;
}

/// 会话工厂：每个请求从这里取得一个专属会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}

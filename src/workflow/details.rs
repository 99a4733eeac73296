//! 案件详情展开
//!
//! 验证码通过后点开 "View"，读取详情区域的 HTML 交给解析服务

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::BrowserSession;
use crate::workflow::case_ctx::CaseCtx;
use crate::workflow::page_outcome::ResultsKind;
use crate::workflow::portal_form::{DETAIL_READY, DETAIL_SOURCES, VIEW_LINK, VIEW_LINK_TEXT};

/// 取得案件详情 HTML
pub async fn fetch_case_html(
    session: &dyn BrowserSession,
    kind: ResultsKind,
    wait_limit: Duration,
    ctx: &CaseCtx,
) -> AppResult<String> {
    if kind == ResultsKind::NoRecords {
        return Err(AppError::malformed_page("门户返回查无此案"));
    }

    match session.click(VIEW_LINK, Some(VIEW_LINK_TEXT)).await {
        Ok(true) => {
            info!("{} 📂 展开案件详情...", ctx);
            if let Err(e) = session.wait_for(DETAIL_READY, wait_limit).await {
                warn!("{} 等待详情加载失败，直接读取当前页面: {}", ctx, e);
            }
        }
        Ok(false) => debug!("{} 没有 View 链接，详情可能已展开", ctx),
        Err(e) => debug!("{} 点击 View 失败，直接读取当前页面: {}", ctx, e),
    }

    for selector in DETAIL_SOURCES {
        if let Some(html) = session.outer_html(selector).await? {
            debug!("{} 从 {} 读取到 {} 字节 HTML", ctx, selector, html.len());
            return Ok(html);
        }
    }

    Err(AppError::malformed_page("结果页没有案件详情区域"))
}

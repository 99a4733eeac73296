//! 请求处理器 - 编排层
//!
//! ## 职责
//!
//! 接收一个案件查询，串起整条流水线：
//!
//! 1. **校验**：参数不合法时直接返回，不碰浏览器
//! 2. **导航**：取得专属会话，打开门户检索页
//! 3. **重试**：交给 SubmitRetryLoop 通过验证码
//! 4. **解析**：展开详情并交给 ResultExtractor
//! 5. **渲染**：释放浏览器后交给 ReportRenderer
//!
//! ## 资源
//!
//! - 每个请求独占一个会话，由 SessionGuard 保证恰好释放一次
//! - Semaphore 限制同时存在的浏览器数量
//! - 请求之间没有共享的可变状态（请求编号只是计数器）

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError, ErrorKind};
use crate::infrastructure::{BrowserSession, SessionFactory, SessionGuard};
use crate::models::{CaseQuery, CaseQueryRequest, CaseRecord, Report};
use crate::services::{CaptchaSolver, ReportRenderer, ResultExtractor};
use crate::workflow::portal_form::CASE_TYPE_SELECT;
use crate::workflow::{fetch_case_html, CaseCtx, SubmitRetryLoop};

/// 请求所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerState {
    Idle,
    Navigating,
    Retrying,
    Extracting,
    Rendering,
    Done,
    Failed(ErrorKind),
}

impl HandlerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandlerState::Done | HandlerState::Failed(_))
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerState::Failed(kind) => write!(f, "Failed({})", kind),
            other => write!(f, "{:?}", other),
        }
    }
}

/// 一次请求的完整结果：经过的阶段和最终产物
#[derive(Debug)]
pub struct HandlerOutcome {
    pub trail: Vec<HandlerState>,
    pub result: AppResult<Report>,
}

impl HandlerOutcome {
    /// 最后一个终止状态；轨迹还没走到终点时为 None
    pub fn final_state(&self) -> Option<HandlerState> {
        self.trail.last().copied().filter(|s| s.is_terminal())
    }
}

/// 请求处理器
pub struct RequestHandler {
    config: Config,
    sessions: Arc<dyn SessionFactory>,
    submit_loop: SubmitRetryLoop,
    extractor: ResultExtractor,
    renderer: ReportRenderer,
    permits: Semaphore,
    next_id: AtomicU64,
}

impl RequestHandler {
    pub fn new(
        config: &Config,
        sessions: Arc<dyn SessionFactory>,
        solver: Arc<dyn CaptchaSolver>,
    ) -> Self {
        Self {
            config: config.clone(),
            sessions,
            submit_loop: SubmitRetryLoop::new(config, solver),
            extractor: ResultExtractor::new(),
            renderer: ReportRenderer::new(),
            permits: Semaphore::new(config.max_concurrent_sessions.max(1)),
            next_id: AtomicU64::new(1),
        }
    }

    /// 处理请求，只关心结果
    pub async fn handle(&self, request: CaseQueryRequest) -> AppResult<Report> {
        self.run(request).await.result
    }

    /// 处理请求并记录经过的阶段
    pub async fn run(&self, request: CaseQueryRequest) -> HandlerOutcome {
        let mut trail = vec![HandlerState::Idle];
        let result = self.drive(request, &mut trail).await;
        trail.push(match &result {
            Ok(_) => HandlerState::Done,
            Err(e) => HandlerState::Failed(e.kind()),
        });
        HandlerOutcome { trail, result }
    }

    async fn drive(
        &self,
        request: CaseQueryRequest,
        trail: &mut Vec<HandlerState>,
    ) -> AppResult<Report> {
        let query = CaseQuery::try_from(request)?;
        let ctx = CaseCtx::new(self.next_id.fetch_add(1, Ordering::Relaxed), &query);

        let _permit = self.permits.acquire().await.map_err(|_| {
            AppError::UpstreamUnavailable(BrowserError::ConfigurationFailed(
                "会话并发限制已关闭".to_string(),
            ))
        })?;

        trail.push(HandlerState::Navigating);
        info!("{} 🌐 打开门户检索页...", ctx);
        let guard = match self.sessions.open().await {
            Ok(session) => SessionGuard::new(session),
            Err(e) => {
                error!("{} ❌ 无法取得浏览器会话: {}", ctx, e);
                return Err(e.into());
            }
        };

        let scraped = match guard.session() {
            Ok(session) => self.scrape(session, &query, &ctx, trail).await,
            Err(e) => Err(e.into()),
        };
        guard.release().await;
        let record = match scraped {
            Ok(record) => record,
            Err(e) => {
                error!("{} ❌ 抓取失败 [{}]: {}", ctx, e.kind(), e);
                return Err(e);
            }
        };

        trail.push(HandlerState::Rendering);
        let bytes = self.renderer.render(&record)?;
        let report = Report {
            file_name: query.report_file_name(),
            bytes,
        };
        info!(
            "{} ✅ 报告已生成: {} ({} 字节)",
            ctx,
            report.file_name,
            report.len()
        );
        Ok(report)
    }

    async fn scrape(
        &self,
        session: &dyn BrowserSession,
        query: &CaseQuery,
        ctx: &CaseCtx,
        trail: &mut Vec<HandlerState>,
    ) -> AppResult<CaseRecord> {
        session.navigate(&self.config.portal_url()).await?;
        session
            .wait_for(CASE_TYPE_SELECT, self.config.page_load_timeout())
            .await?;

        trail.push(HandlerState::Retrying);
        let results = self.submit_loop.run(session, query, ctx).await?;

        trail.push(HandlerState::Extracting);
        let html = fetch_case_html(
            session,
            results.kind,
            self.config.page_load_timeout(),
            ctx,
        )
        .await?;
        let record = self.extractor.extract(&html)?;
        info!(
            "{} 📄 解析完成 (CNR {})",
            ctx,
            record.cnr_number().unwrap_or_default()
        );
        Ok(record)
    }
}

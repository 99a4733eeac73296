//! 验证码提交重试循环 - 流程层
//!
//! 每轮流程：
//! 1. （重试时）点击刷新验证码并稍作停顿
//! 2. 填写案件类型、案号、年份
//! 3. 截取验证码 → OCR → 填入 → 提交
//! 4. 轮询页面直到得出结论或超时
//!
//! 只有"门户不提供该案件类型"会中断循环；其余失败都算作本轮未通过

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError, BrowserResult};
use crate::infrastructure::{BrowserSession, PageSnapshot};
use crate::models::{CaptchaAttempt, CaseQuery};
use crate::services::CaptchaSolver;
use crate::workflow::case_ctx::CaseCtx;
use crate::workflow::page_outcome::{describe, PageOutcome, ResultsKind};
use crate::workflow::portal_form::*;

/// 验证码通过后的结果页
#[derive(Debug, Clone)]
pub struct ResultsPage {
    /// 被接受的那次尝试
    pub attempt: CaptchaAttempt,
    pub kind: ResultsKind,
}

/// 单轮结论
enum Step {
    Accepted(CaptchaAttempt, ResultsKind),
    /// 本轮未通过，附带页面状态说明
    Retry(String),
}

/// 验证码提交重试循环
///
/// - 不持有会话，由调用方传入
/// - 每轮都重新截图、重新识别，不复用上一轮的猜测
pub struct SubmitRetryLoop {
    solver: Arc<dyn CaptchaSolver>,
    max_attempts: usize,
    retry_pause: Duration,
    form_settle: Duration,
    validation_timeout: Duration,
    poll_interval: Duration,
}

impl SubmitRetryLoop {
    pub fn new(config: &Config, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self {
            solver,
            max_attempts: config.max_captcha_attempts,
            retry_pause: config.retry_pause(),
            form_settle: config.form_settle(),
            validation_timeout: config.validation_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// 在已打开检索页的会话上反复提交，直到验证码通过或次数用完
    pub async fn run(
        &self,
        session: &dyn BrowserSession,
        query: &CaseQuery,
        ctx: &CaseCtx,
    ) -> AppResult<ResultsPage> {
        let mut last_page_state = String::from("尚未提交");

        for number in 1..=self.max_attempts {
            if number > 1 {
                info!(
                    "{} 🔁 重试验证码 ({}/{})",
                    ctx, number, self.max_attempts
                );
                self.refresh_captcha(session, ctx).await;
            }

            match self.attempt(session, query, number, ctx).await? {
                Step::Accepted(attempt, kind) => {
                    info!("{} ✓ 第 {} 次尝试验证码通过", ctx, number);
                    return Ok(ResultsPage { attempt, kind });
                }
                Step::Retry(state) => {
                    warn!("{} ⚠️ 第 {} 次尝试未通过: {}", ctx, number, state);
                    last_page_state = state;
                }
            }
        }

        Err(AppError::RetryExhausted {
            attempts: self.max_attempts,
            last_page_state,
        })
    }

    async fn refresh_captcha(&self, session: &dyn BrowserSession, ctx: &CaseCtx) {
        match session.click(CAPTCHA_REFRESH, None).await {
            Ok(true) => debug!("{} 已点击刷新验证码", ctx),
            Ok(false) => debug!("{} 页面上没有刷新按钮", ctx),
            Err(e) => debug!("{} 刷新验证码失败: {}", ctx, e),
        }
        sleep(self.retry_pause).await;
    }

    async fn attempt(
        &self,
        session: &dyn BrowserSession,
        query: &CaseQuery,
        number: usize,
        ctx: &CaseCtx,
    ) -> AppResult<Step> {
        match self.fill_form(session, query).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(AppError::invalid_query(format!(
                    "门户不提供案件类型 {:?}",
                    query.case_type()
                )))
            }
            Err(e) => return Ok(Step::Retry(format!("填写表单失败: {}", e))),
        }

        let image = match session.screenshot(CAPTCHA_IMAGE).await {
            Ok(image) => image,
            Err(e) => return Ok(Step::Retry(format!("截取验证码失败: {}", e))),
        };

        let guess = match self.solver.solve(&image).await {
            Ok(guess) => guess,
            Err(e) => return Ok(Step::Retry(format!("验证码识别失败: {}", e))),
        };
        if guess.is_empty() {
            return Ok(Step::Retry("OCR 结果为空，未提交".to_string()));
        }

        let mut attempt = CaptchaAttempt::new(number, image, guess);
        info!("{} 🔤 OCR 结果: {}", ctx, attempt.guessed_text);

        if let Err(e) = self.submit(session, &attempt.guessed_text).await {
            return Ok(Step::Retry(format!("提交失败: {}", e)));
        }

        let (outcome, snapshot) = self.await_outcome(session).await;
        Ok(match outcome {
            Some(PageOutcome::Accepted(kind)) => {
                attempt.accepted = true;
                Step::Accepted(attempt, kind)
            }
            Some(PageOutcome::Rejected(reason)) => {
                Step::Retry(format!("验证码被拒 ({}): {}", reason, describe(&snapshot)))
            }
            None => Step::Retry(format!(
                "{:?} 内未看到结论: {}",
                self.validation_timeout,
                describe(&snapshot)
            )),
        })
    }

    /// 返回 false 表示下拉框里没有这个案件类型
    async fn fill_form(&self, session: &dyn BrowserSession, query: &CaseQuery) -> BrowserResult<bool> {
        let Some(option) = session
            .select_option(CASE_TYPE_SELECT, query.case_type())
            .await?
        else {
            return Ok(false);
        };
        debug!("选中案件类型: {}", option);

        // 选择案件类型后其它字段由 AJAX 刷新
        sleep(self.form_settle).await;

        session.fill(CASE_NUMBER_INPUT, query.case_number()).await?;
        session.fill(YEAR_INPUT, &query.year().to_string()).await?;
        Ok(true)
    }

    async fn submit(&self, session: &dyn BrowserSession, guess: &str) -> BrowserResult<()> {
        session.fill(CAPTCHA_INPUT, guess).await?;
        if !session.click(SUBMIT_BUTTON, None).await? {
            return Err(BrowserError::element_not_found(SUBMIT_BUTTON));
        }
        Ok(())
    }

    /// 轮询页面直到能判定结果；超时返回 None 和最后一次快照
    async fn await_outcome(&self, session: &dyn BrowserSession) -> (Option<PageOutcome>, PageSnapshot) {
        let deadline = Instant::now() + self.validation_timeout;
        let mut last = PageSnapshot::default();
        loop {
            sleep(self.poll_interval).await;
            match session.snapshot(&RESULT_MARKERS).await {
                Ok(snapshot) => {
                    if let Some(outcome) = PageOutcome::classify(&snapshot) {
                        return (Some(outcome), snapshot);
                    }
                    last = snapshot;
                }
                // 提交后页面跳转期间脚本可能执行失败
                Err(e) => debug!("读取页面状态失败: {}", e),
            }
            if Instant::now() >= deadline {
                return (None, last);
            }
        }
    }
}

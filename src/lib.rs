//! # eCourts Case Fetch
//!
//! 从高等法院 eCourts 门户抓取案件记录并生成 PDF 报告
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `BrowserSession` - 导航、填表、截图、读取页面状态
//! - `SessionGuard` - 保证每个会话恰好关闭一次，请求被取消时也不泄漏
//! - `browser/` - 基于 chromiumoxide 的实现（启动或连接已有浏览器）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `CaptchaSolver` - 验证码识别（tesseract）
//! - `ResultExtractor` - 结果页解析
//! - `ReportRenderer` - PDF 渲染
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个案件"的页面交互流程
//! - `CaseCtx` - 上下文封装（请求编号 + 案件简称）
//! - `SubmitRetryLoop` - 填表 → 识别 → 提交 → 判定，失败则刷新重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/request_handler` - 校验、取得会话、串起流水线、释放资源
//! - `api/` - HTTP 入口
//!
//! ## 模块结构

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::ChromeLauncher;
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use infrastructure::{BrowserSession, PageSnapshot, SessionFactory};
pub use models::{CaseQuery, CaseQueryRequest, CaseRecord, Report};
pub use orchestrator::{HandlerOutcome, HandlerState, RequestHandler};
pub use services::{CaptchaSolver, ReportRenderer, ResultExtractor, TesseractSolver};
pub use workflow::{CaseCtx, SubmitRetryLoop};

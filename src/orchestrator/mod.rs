//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责单个请求的调度和资源管理，是整个系统的"指挥中心"。
//!
//! ### `request_handler` - 请求处理器
//! - 校验查询参数
//! - 控制并发会话数量（Semaphore）
//! - 取得并释放浏览器会话（SessionGuard）
//! - 记录请求经过的阶段（HandlerState）
//!
//! ## 层次关系
//!
//! ```text
//! api (HTTP 入口)
//!     ↓
//! request_handler (处理一个 CaseQuery)
//!     ↓
//! workflow::SubmitRetryLoop / details (验证码循环、展开详情)
//!     ↓
//! services (能力层：ocr / extract / render)
//!     ↓
//! infrastructure (基础设施：BrowserSession、JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层取得和释放浏览器会话
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度，不做页面判断

pub mod request_handler;

pub use request_handler::{HandlerOutcome, HandlerState, RequestHandler};

//! 基础设施层
//!
//! 持有稀缺资源（浏览器进程 / 标签页），只暴露能力

pub mod browser_session;
pub mod js_executor;
pub mod session_guard;

pub use browser_session::{BrowserSession, PageSnapshot, SessionFactory};
pub use js_executor::JsExecutor;
pub use session_guard::SessionGuard;

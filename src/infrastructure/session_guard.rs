//! 会话守卫
//!
//! 持有唯一的会话。正常路径调用 `release()`；请求被取消时 Drop 会把关闭操作交给运行时

use tracing::{debug, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::infrastructure::BrowserSession;

pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// 借用会话；会话已被取走时返回错误
    pub fn session(&self) -> BrowserResult<&dyn BrowserSession> {
        self.session
            .as_deref()
            .ok_or_else(|| BrowserError::ConfigurationFailed("浏览器会话已释放".to_string()))
    }

    /// 关闭会话；关闭失败只记录日志
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => debug!("浏览器会话已关闭"),
                Err(e) => warn!("关闭浏览器会话失败: {}", e),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        warn!("请求在释放会话前被中断，后台关闭浏览器");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("后台关闭浏览器会话失败: {}", e);
                    }
                });
            }
            Err(_) => warn!("没有可用的运行时，无法关闭浏览器会话"),
        }
    }
}

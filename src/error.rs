use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 请求失败的类别
///
/// 对外暴露的稳定错误种类，HTTP 层按它决定状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// 查询参数不合法（在任何浏览器操作之前拒绝）
    InvalidQuery,
    /// 验证码在 N 次尝试内始终未被接受
    RetryExhausted,
    /// 结果页面缺少必需的结构字段
    MalformedPage,
    /// 门户网站或浏览器不可用
    UpstreamUnavailable,
    /// PDF 生成失败
    RenderError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidQuery => "InvalidQuery",
            ErrorKind::RetryExhausted => "RetryExhausted",
            ErrorKind::MalformedPage => "MalformedPage",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::RenderError => "RenderError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("查询参数无效: {0}")]
    InvalidQuery(String),

    #[error("验证码在 {attempts} 次尝试后仍未通过 (最后页面状态: {last_page_state})")]
    RetryExhausted {
        attempts: usize,
        last_page_state: String,
    },

    #[error("结果页面结构异常: {0}")]
    MalformedPage(String),

    #[error("门户网站不可用: {0}")]
    UpstreamUnavailable(#[from] BrowserError),

    #[error("PDF 生成失败: {0}")]
    Render(String),
}

impl AppError {
    /// 错误种类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            AppError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            AppError::MalformedPage(_) => ErrorKind::MalformedPage,
            AppError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            AppError::Render(_) => ErrorKind::RenderError,
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        AppError::InvalidQuery(message.into())
    }

    pub fn malformed_page(message: impl Into<String>) -> Self {
        AppError::MalformedPage(message.into())
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Render(err.to_string())
    }
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 页面上找不到元素
    #[error("找不到元素: {selector}")]
    ElementNotFound { selector: String },

    /// 元素存在但尚未就绪（如图片未加载完）
    #[error("元素尚未就绪: {selector}")]
    NotReady { selector: String },

    /// 等待超时
    #[error("等待 {what} 超时 ({timeout:?})")]
    Timeout { what: String, timeout: Duration },

    /// 会话已关闭
    #[error("浏览器会话已关闭")]
    SessionClosed,

    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        }
    }
}

impl BrowserError {
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn element_not_found(selector: impl Into<String>) -> Self {
        BrowserError::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        BrowserError::Timeout {
            what: what.into(),
            timeout,
        }
    }
}

/// 验证码识别错误
///
/// 只在重试循环内部出现，单次识别失败视为一次未通过的尝试
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("无法解码验证码图片: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("无法启动 OCR 引擎 {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR 引擎执行失败 (退出码 {code:?}): {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 浏览器操作结果类型
pub type BrowserResult<T> = Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_failures_surface_as_upstream_unavailable() {
        let err: AppError = BrowserError::element_not_found("#captcha").into();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(err.to_string().contains("#captcha"));
    }

    #[test]
    fn retry_exhausted_keeps_last_page_state() {
        let err = AppError::RetryExhausted {
            attempts: 5,
            last_page_state: "Invalid Captcha".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RetryExhausted);
        assert!(err.to_string().contains("Invalid Captcha"));
    }

    #[test]
    fn kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::MalformedPage).unwrap();
        assert_eq!(json, "\"MalformedPage\"");
    }
}

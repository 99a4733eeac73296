/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以它为准；否则默认 info，`verbose` 时本 crate 输出 debug
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "info,ecourts_case_fetch=debug"
    } else {
        "info"
    };
    // 测试里可能重复初始化，忽略错误
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 eCourts 案件抓取服务启动");
    info!("📁 配置来源: {}", config_source(config));
    info!("🌐 门户地址: {}", config.portal_url());
    info!("🖥️ 浏览器模式: {}", browser_mode(config));
    info!(
        "🔁 验证码最多尝试 {} 次，重试间隔 {} ms",
        config.max_captcha_attempts, config.retry_pause_ms
    );
    info!("📊 最大并发会话数: {}", config.max_concurrent_sessions);
    info!("{}", "=".repeat(60));
}

fn config_source(config: &Config) -> String {
    match &config.source_file {
        Some(path) => path.display().to_string(),
        None => "默认值 + 环境变量".to_string(),
    }
}

fn browser_mode(config: &Config) -> String {
    match config.browser_debug_port {
        Some(port) => format!("连接已有浏览器 (端口 {})", port),
        None if config.headless => "无头启动".to_string(),
        None => "有界面启动".to_string(),
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("न्यायालय", 2), "न्...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn config_source_names_loaded_file() {
        let mut config = Config::default();
        assert_eq!(config_source(&config), "默认值 + 环境变量");
        config.source_file = Some("/etc/ecourts.toml".into());
        assert_eq!(config_source(&config), "/etc/ecourts.toml");
    }

    #[test]
    fn browser_mode_prefers_attach() {
        let mut config = Config::default();
        assert_eq!(browser_mode(&config), "无头启动");
        config.browser_debug_port = Some(9222);
        assert!(browser_mode(&config).contains("9222"));
    }
}

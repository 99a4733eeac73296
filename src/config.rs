use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "ECOURTS_CONFIG";
/// 默认配置文件名（存在时才读取）
pub const DEFAULT_CONFIG_FILE: &str = "ecourts.toml";

/// 程序配置
///
/// 门户地址与辖区代码都在这里，构造 RequestHandler 时传入，测试可以整体替换
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 门户根地址
    pub portal_base_url: String,
    /// 邦代码 (state_cd)
    pub state_code: u32,
    /// 地区代码 (dist_cd)
    pub district_code: u32,
    /// 法院代码 (court_code)
    pub court_code: u32,
    /// 邦名称 (stateNm)
    pub state_name: String,
    /// 是否无头运行
    pub headless: bool,
    /// 浏览器可执行文件路径，为空时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 已运行浏览器的调试端口，设置后改为连接模式
    pub browser_debug_port: Option<u16>,
    /// 验证码最大尝试次数
    pub max_captcha_attempts: usize,
    /// 重新提交前的停顿（毫秒）
    pub retry_pause_ms: u64,
    /// 选择案件类型后等待表单联动的时间（毫秒）
    pub form_settle_ms: u64,
    /// 单次页面加载超时（秒）
    pub page_load_timeout_secs: u64,
    /// 提交后判定结果的超时（秒）
    pub validation_timeout_secs: u64,
    /// 轮询页面状态的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 同时存在的浏览器会话上限
    pub max_concurrent_sessions: usize,
    /// HTTP 监听地址
    pub listen_addr: String,
    /// tesseract 命令
    pub tesseract_cmd: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 实际读取的配置文件，只用于启动日志
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_base_url: "https://hcservices.ecourts.gov.in".to_string(),
            state_code: 7,
            district_code: 1,
            court_code: 1,
            state_name: "Madhya Pradesh".to_string(),
            headless: true,
            chrome_executable: None,
            browser_debug_port: None,
            max_captcha_attempts: 5,
            retry_pause_ms: 2000,
            form_settle_ms: 3000,
            page_load_timeout_secs: 20,
            validation_timeout_secs: 15,
            poll_interval_ms: 500,
            max_concurrent_sessions: 2,
            listen_addr: "127.0.0.1:5000".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            verbose_logging: false,
            source_file: None,
        }
    }
}

impl Config {
    /// 加载配置：TOML 文件（可选）→ 环境变量覆盖
    pub fn load() -> Result<Self> {
        let base = match config_file_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺省字段取默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        config.source_file = Some(path.to_path_buf());
        Ok(config)
    }

    /// 环境变量覆盖；无法解析的值保持原值
    pub fn with_env_overrides(self) -> Self {
        Self {
            portal_base_url: env_or("ECOURTS_PORTAL_BASE_URL", self.portal_base_url),
            state_code: env_parse_or("ECOURTS_STATE_CODE", self.state_code),
            district_code: env_parse_or("ECOURTS_DISTRICT_CODE", self.district_code),
            court_code: env_parse_or("ECOURTS_COURT_CODE", self.court_code),
            state_name: env_or("ECOURTS_STATE_NAME", self.state_name),
            headless: env_parse_or("ECOURTS_HEADLESS", self.headless),
            chrome_executable: std::env::var("ECOURTS_CHROME_EXECUTABLE")
                .ok()
                .map(PathBuf::from)
                .or(self.chrome_executable),
            browser_debug_port: std::env::var("ECOURTS_BROWSER_DEBUG_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(self.browser_debug_port),
            max_captcha_attempts: env_parse_or(
                "ECOURTS_MAX_CAPTCHA_ATTEMPTS",
                self.max_captcha_attempts,
            ),
            retry_pause_ms: env_parse_or("ECOURTS_RETRY_PAUSE_MS", self.retry_pause_ms),
            form_settle_ms: env_parse_or("ECOURTS_FORM_SETTLE_MS", self.form_settle_ms),
            page_load_timeout_secs: env_parse_or(
                "ECOURTS_PAGE_LOAD_TIMEOUT_SECS",
                self.page_load_timeout_secs,
            ),
            validation_timeout_secs: env_parse_or(
                "ECOURTS_VALIDATION_TIMEOUT_SECS",
                self.validation_timeout_secs,
            ),
            poll_interval_ms: env_parse_or("ECOURTS_POLL_INTERVAL_MS", self.poll_interval_ms),
            max_concurrent_sessions: env_parse_or(
                "ECOURTS_MAX_CONCURRENT_SESSIONS",
                self.max_concurrent_sessions,
            ),
            listen_addr: env_or("ECOURTS_LISTEN_ADDR", self.listen_addr),
            tesseract_cmd: env_or("ECOURTS_TESSERACT_CMD", self.tesseract_cmd),
            verbose_logging: env_parse_or("ECOURTS_VERBOSE_LOGGING", self.verbose_logging),
            source_file: self.source_file,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_captcha_attempts == 0 {
            bail!("max_captcha_attempts 必须大于 0");
        }
        if self.max_concurrent_sessions == 0 {
            bail!("max_concurrent_sessions 必须大于 0");
        }
        Url::parse(&self.portal_base_url)
            .with_context(|| format!("portal_base_url 不是合法地址: {}", self.portal_base_url))?;
        Ok(())
    }

    /// 按辖区代码拼出案件号查询页地址
    pub fn portal_url(&self) -> String {
        let base = format!(
            "{}/ecourtindiaHC/cases/case_no.php",
            self.portal_base_url.trim_end_matches('/')
        );
        let params = [
            ("state_cd", self.state_code.to_string()),
            ("dist_cd", self.district_code.to_string()),
            ("court_code", self.court_code.to_string()),
            ("stateNm", self.state_name.clone()),
        ];
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // validate() 已检查根地址，这里只是兜底
            Err(_) => base,
        }
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn form_settle(&self) -> Duration {
        Duration::from_millis(self.form_settle_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

fn env_or(name: &str, current: String) -> String {
    std::env::var(name).unwrap_or(current)
}

fn env_parse_or<T: FromStr>(name: &str, current: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_portal_url_carries_jurisdiction_codes() {
        let url = Config::default().portal_url();
        assert!(url.starts_with(
            "https://hcservices.ecourts.gov.in/ecourtindiaHC/cases/case_no.php?"
        ));
        assert!(url.contains("state_cd=7"));
        assert!(url.contains("dist_cd=1"));
        assert!(url.contains("court_code=1"));
        assert!(url.contains("stateNm=Madhya+Pradesh"));
    }

    #[test]
    fn portal_url_follows_substituted_base() {
        let config = Config {
            portal_base_url: "http://127.0.0.1:8080/".to_string(),
            state_code: 3,
            ..Config::default()
        };
        let url = config.portal_url();
        assert!(url.starts_with("http://127.0.0.1:8080/ecourtindiaHC/cases/case_no.php?"));
        assert!(url.contains("state_cd=3"));
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            headless = false
            max_captcha_attempts = 3
            state_name = "Delhi"
            "#,
        )
        .unwrap();
        assert!(!config.headless);
        assert_eq!(config.max_captcha_attempts, 3);
        assert_eq!(config.state_name, "Delhi");
        assert_eq!(config.page_load_timeout_secs, 20);
    }

    #[test]
    fn example_file_parses_and_validates() {
        let config: Config = toml::from_str(include_str!("../ecourts.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr, Config::default().listen_addr);
    }

    #[test]
    fn from_file_records_its_path() {
        let path = std::env::temp_dir().join(format!("ecourts-{}.toml", std::process::id()));
        std::fs::write(&path, "max_captcha_attempts = 4\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.max_captcha_attempts, 4);
        assert_eq!(config.source_file.as_deref(), Some(path.as_path()));
        assert_eq!(Config::default().source_file, None);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = Config {
            max_captcha_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

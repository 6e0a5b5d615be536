use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::ScraperError;

pub const LOGIN_URL: &str = "https://join.fiteasy.jp/mypage/login";
pub const CONGESTION_URL: &str = "https://join.fiteasy.jp/mypage/congestion_list";

/// 認証情報の環境変数名
pub const IDENTIFIER_ENV: &str = "FITEASY_EMAIL";
pub const SECRET_ENV: &str = "FITEASY_PASSWORD";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.75 Safari/537.36";
const DEFAULT_TARGET: &str = "イオンタウン弥富店";

/// セッション有効期限（2時間）
const SESSION_TIMEOUT_SECS: u64 = 2 * 60 * 60;

/// ログイン情報（メールアドレスまたは会員ID + パスワード）
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Result<Self, ScraperError> {
        let identifier = identifier.into();
        let secret = secret.into();
        if identifier.trim().is_empty() {
            return Err(ScraperError::Config(format!(
                "ログインID ({}) が設定されていません",
                IDENTIFIER_ENV
            )));
        }
        if secret.is_empty() {
            return Err(ScraperError::Config(format!(
                "パスワード ({}) が設定されていません",
                SECRET_ENV
            )));
        }
        Ok(Self { identifier, secret })
    }

    /// `.env` があれば読み込んだうえで環境変数から取得
    pub fn from_env() -> Result<Self, ScraperError> {
        // .env が無いのは正常
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ScraperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identifier = lookup(IDENTIFIER_ENV).unwrap_or_default();
        let secret = lookup(SECRET_ENV).unwrap_or_default();
        if identifier.is_empty() || secret.is_empty() {
            return Err(ScraperError::Config(format!(
                "環境変数 {} または {} が設定されていません",
                IDENTIFIER_ENV, SECRET_ENV
            )));
        }
        Self::new(identifier, secret)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"********")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub login_url: String,
    pub data_url: String,
    pub session_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub default_target: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            data_url: CONGESTION_URL.to_string(),
            session_timeout: Duration::from_secs(SESSION_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_target: DEFAULT_TARGET.to_string(),
        }
    }
}

impl PortalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = target.into();
        self
    }

    /// chrono での比較用
    pub(crate) fn session_lifetime(&self) -> TimeDelta {
        TimeDelta::from_std(self.session_timeout).unwrap_or(TimeDelta::MAX)
    }
}

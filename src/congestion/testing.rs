//! テスト用のフェイク通信層と手動時計

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::config::{Credentials, PortalConfig};
use crate::error::ScraperError;
use crate::traits::{Clock, PortalConnector, PortalSession};
use crate::transport::{HeaderSet, PageResponse};

use super::SessionManager;

pub(crate) const LOGIN_URL: &str = "https://portal.test/mypage/login";
pub(crate) const DATA_URL: &str = "https://portal.test/mypage/congestion_list";
pub(crate) const TOP_URL: &str = "https://portal.test/mypage";

pub(crate) fn login_form(token: &str) -> String {
    format!(
        r#"<form method="post" action="/mypage/login">
             <input type="hidden" name="_token" value="{}">
             <input type="text" name="emailOrMemberID">
             <input type="password" name="password">
           </form>"#,
        token
    )
}

pub(crate) fn congestion_page(entries: &[(&str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(name, class)| {
            format!(
                r#"<div class="p-congestionInfo__ttl">{}</div><div class="p-congestionInfo__cont"><div class="p-congestionInfo__icon {}"></div></div>"#,
                name, class
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", body)
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Page(PageResponse),
    Fail(String),
}

impl Reply {
    pub(crate) fn ok(final_url: &str, body: &str) -> Self {
        Reply::Page(PageResponse::new(200, final_url, body))
    }

    fn resolve(&self) -> Result<PageResponse, ScraperError> {
        match self {
            Reply::Page(page) => Ok(page.clone()),
            Reply::Fail(detail) => Err(ScraperError::network(detail.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub headers: HeaderSet,
    pub form: Vec<(String, String)>,
    pub connection: usize,
}

#[derive(Debug)]
struct FakeState {
    login_page: Reply,
    login_result: Reply,
    data_page: Reply,
    connect_error: Option<String>,
    connects: usize,
    requests: Vec<Recorded>,
}

/// URLごとに応答を固定したポータル
#[derive(Debug, Clone)]
pub(crate) struct FakePortal {
    state: Arc<Mutex<FakeState>>,
}

impl FakePortal {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                login_page: Reply::ok(LOGIN_URL, &login_form("csrf-123")),
                login_result: Reply::ok(TOP_URL, "<html>マイページ</html>"),
                data_page: Reply::ok(DATA_URL, &congestion_page(&[("店舗A", "level-3")])),
                connect_error: None,
                connects: 0,
                requests: Vec::new(),
            })),
        }
    }

    pub(crate) fn set_login_page(&self, reply: Reply) {
        self.state.lock().unwrap().login_page = reply;
    }

    pub(crate) fn set_login_result(&self, reply: Reply) {
        self.state.lock().unwrap().login_result = reply;
    }

    pub(crate) fn set_data_page(&self, reply: Reply) {
        self.state.lock().unwrap().data_page = reply;
    }

    /// 以降の connect を設定エラーで失敗させる
    pub(crate) fn fail_connect(&self, detail: &str) {
        self.state.lock().unwrap().connect_error = Some(detail.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// ログインPOSTの回数
    pub(crate) fn logins(&self) -> usize {
        self.count("POST", LOGIN_URL)
    }

    pub(crate) fn data_fetches(&self) -> usize {
        self.count("GET", DATA_URL)
    }

    fn count(&self, method: &str, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }
}

impl PortalConnector for FakePortal {
    type Session = FakeSession;

    fn connect(&self) -> Result<FakeSession, ScraperError> {
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = &state.connect_error {
            return Err(ScraperError::Config(detail.clone()));
        }
        state.connects += 1;
        Ok(FakeSession {
            portal: self.clone(),
            connection: state.connects,
        })
    }
}

pub(crate) struct FakeSession {
    portal: FakePortal,
    connection: usize,
}

impl FakeSession {
    fn record(&self, method: &'static str, url: &str, headers: &HeaderSet, form: &[(&str, &str)]) {
        self.portal.state.lock().unwrap().requests.push(Recorded {
            method,
            url: url.to_string(),
            headers: headers.clone(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            connection: self.connection,
        });
    }
}

#[async_trait]
impl PortalSession for FakeSession {
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<PageResponse, ScraperError> {
        self.record("GET", url, headers, &[]);
        let state = self.portal.state.lock().unwrap();
        match url {
            LOGIN_URL => state.login_page.resolve(),
            DATA_URL => state.data_page.resolve(),
            _ => Ok(PageResponse::new(404, url, "not found")),
        }
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &HeaderSet,
        form: &[(&str, &str)],
    ) -> Result<PageResponse, ScraperError> {
        self.record("POST", url, headers, form);
        let state = self.portal.state.lock().unwrap();
        match url {
            LOGIN_URL => state.login_result.resolve(),
            _ => Ok(PageResponse::new(405, url, "method not allowed")),
        }
    }
}

/// 手動で進める時計
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub(crate) fn test_config() -> PortalConfig {
    PortalConfig::new()
        .with_login_url(LOGIN_URL)
        .with_data_url(DATA_URL)
        .with_default_target("店舗A")
}

pub(crate) fn test_manager(portal: &FakePortal, clock: Arc<ManualClock>) -> SessionManager<FakePortal> {
    let credentials = Credentials::new("member@example.com", "secret-pw").unwrap();
    SessionManager::with_connector(portal.clone(), credentials, test_config())
        .unwrap()
        .with_clock(clock)
}

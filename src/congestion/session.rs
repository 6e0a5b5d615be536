//! ログインセッション管理
//!
//! ログイン時刻を記録してセッションを最大2時間再利用し、期限切れなら透過的に再ログインする。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, PortalConfig};
use crate::error::ScraperError;
use crate::traits::{Clock, PortalConnector, PortalSession, SystemClock};
use crate::transport::{HeaderSet, PageResponse, ReqwestConnector};

use super::extractor::extract_level;
use super::types::CongestionResult;

/// ログインフォームのフィールド名
const IDENTIFIER_FIELD: &str = "emailOrMemberID";
const SECRET_FIELD: &str = "password";
const CSRF_FIELD: &str = "_token";

/// ログイン失敗時にポータルが本文に埋め込む文言
///
/// ポータルは失敗時も200を返すため、本文とリダイレクト先で判定する。
const LOGIN_FAILURE_PHRASES: [&str; 2] = ["ログイン失敗", "ログインIDまたはパスワードが間違っています"];

struct ActiveSession<S> {
    handle: S,
    login_time: DateTime<Utc>,
}

/// FitEasy 会員ページのセッションマネージャ
///
/// 1インスタンスにつき通信ハンドルは1本。`&mut self` で直列に使う。
/// 複数アカウントを扱う場合はアカウントごとにインスタンスを作る。
pub struct SessionManager<C: PortalConnector = ReqwestConnector> {
    connector: C,
    credentials: Credentials,
    config: PortalConfig,
    clock: Arc<dyn Clock>,
    base_headers: HeaderSet,
    session: Option<ActiveSession<C::Session>>,
}

impl SessionManager<ReqwestConnector> {
    /// 設定から作成（ヘッダー値やHTTPクライアントが不正なら設定エラー）
    pub fn new(credentials: Credentials, config: PortalConfig) -> Result<Self, ScraperError> {
        let connector = ReqwestConnector::new(&config)?;
        Self::with_connector(connector, credentials, config)
    }

    /// 環境変数の認証情報と既定設定で作成
    pub fn from_env() -> Result<Self, ScraperError> {
        let credentials = Credentials::from_env().inspect_err(|e| error!("{}", e))?;
        Self::new(credentials, PortalConfig::default()).inspect_err(|e| error!("{}", e))
    }
}

impl<C: PortalConnector> SessionManager<C> {
    pub fn with_connector(
        connector: C,
        credentials: Credentials,
        config: PortalConfig,
    ) -> Result<Self, ScraperError> {
        let base_headers = HeaderSet::new()
            .with("User-Agent", &config.user_agent)
            .with("Accept-Language", "ja,en;q=0.8");
        base_headers.validate()?;
        Ok(Self {
            connector,
            credentials,
            config,
            clock: Arc::new(SystemClock),
            base_headers,
            session: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn login_time(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.login_time)
    }

    /// セッションが存在し、ログインから有効期限内か
    pub fn is_session_valid(&self) -> bool {
        match &self.session {
            Some(active) => self.clock.now() - active.login_time <= self.config.session_lifetime(),
            None => false,
        }
    }

    /// 現在のセッションを破棄（次回呼び出しで再ログイン）
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            debug!("セッションを破棄しました");
        }
    }

    /// 新しい通信ハンドルでログインし、成功したらセッションを置き換える
    pub async fn login(&mut self) -> Result<(), ScraperError> {
        info!("ログイン処理開始: {}", self.credentials.identifier());
        let handle = self.connector.connect()?;
        let login_url = self.config.login_url.as_str();

        let login_page = handle
            .get(login_url, &self.base_headers)
            .await?
            .error_for_status()?;
        let token = find_csrf_token(&login_page.body)?;
        debug!("CSRFトークン取得完了");

        let form = [
            (IDENTIFIER_FIELD, self.credentials.identifier()),
            (SECRET_FIELD, self.credentials.secret()),
            (CSRF_FIELD, token.as_str()),
        ];
        let post_headers = self.base_headers.with("Referer", login_url);
        let response = handle
            .post_form(login_url, &post_headers, &form)
            .await?
            .error_for_status()?;

        if is_login_rejected(&response, login_url) {
            error!("ログインに失敗しました: {}", self.credentials.identifier());
            return Err(ScraperError::Auth(
                "ログインに失敗しました。認証情報を確認してください".into(),
            ));
        }

        let login_time = self.clock.now();
        self.session = Some(ActiveSession { handle, login_time });
        info!("ログイン完了: {}", login_time);
        Ok(())
    }

    /// 有効なセッションを返す（無効なら先にログイン）
    pub async fn get_session(&mut self) -> Result<&C::Session, ScraperError> {
        self.ensure_session().await?;
        self.current_handle()
    }

    /// 1店舗分の混雑レベルを取得
    ///
    /// 設定エラーのみ `Err` で返し、それ以外の失敗は結果の `error` に入る。
    pub async fn fetch_one(&mut self, target_name: &str) -> Result<CongestionResult, ScraperError> {
        let result = self.fetch_many(&[target_name]).await?.pop();
        Ok(result.unwrap_or_else(|| {
            CongestionResult::failure(target_name, &ScraperError::NotFound(target_name.into()))
        }))
    }

    /// 設定の既定店舗を取得
    pub async fn fetch_default(&mut self) -> Result<CongestionResult, ScraperError> {
        let target = self.config.default_target.clone();
        self.fetch_one(&target).await
    }

    /// 複数店舗を1つのセッション・1回のページ取得で処理
    ///
    /// 設定エラーはそのまま `Err` で返す。
    /// ログイン失敗・ページ取得失敗は全店舗の `error` に同じメッセージで入る。
    /// 解析失敗はその店舗の結果だけに入り、残りは続行する。
    pub async fn fetch_many<S: AsRef<str>>(
        &mut self,
        target_names: &[S],
    ) -> Result<Vec<CongestionResult>, ScraperError> {
        if let Err(e) = self.ensure_session().await {
            if e.is_fatal() {
                error!("{}", e);
                return Err(e);
            }
            warn!("ログインできないため{}件すべて失敗: {}", target_names.len(), e);
            return Ok(fail_all(target_names, &e));
        }

        let page = match self.current_handle() {
            Ok(handle) => self.fetch_page(handle).await,
            Err(e) => Err(e),
        };
        let body = match page {
            Ok(body) => body,
            Err(e) if e.is_fatal() => {
                error!("{}", e);
                return Err(e);
            }
            Err(e) => {
                warn!("混雑状況ページの取得に失敗: {}", e);
                if breaks_session(&e) {
                    self.invalidate();
                }
                return Ok(fail_all(target_names, &e));
            }
        };

        let results: Vec<CongestionResult> = target_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let outcome = extract_level(&body, name);
                match &outcome {
                    Ok(level) => debug!("{}: level={}", name, level),
                    Err(e) => warn!("{}の取得に失敗: {}", name, e),
                }
                CongestionResult::from_outcome(name, outcome)
            })
            .collect();

        info!(
            "混雑状況取得完了: {}/{}件成功",
            results.iter().filter(|r| r.is_success()).count(),
            results.len()
        );
        Ok(results)
    }

    async fn ensure_session(&mut self) -> Result<(), ScraperError> {
        if !self.is_session_valid() {
            if self.session.is_some() {
                info!("セッションの有効期限切れのため再ログインします");
            }
            self.login().await?;
        }
        Ok(())
    }

    fn current_handle(&self) -> Result<&C::Session, ScraperError> {
        self.session
            .as_ref()
            .map(|active| &active.handle)
            .ok_or_else(|| ScraperError::Auth("ログインセッションがありません".into()))
    }

    async fn fetch_page(&self, handle: &C::Session) -> Result<String, ScraperError> {
        let headers = self.base_headers.with("Referer", &self.config.login_url);
        let page = handle
            .get(&self.config.data_url, &headers)
            .await?
            .error_for_status()?;
        if same_url(&page.final_url, &self.config.login_url) {
            return Err(ScraperError::Auth(
                "セッションの有効期限が切れています".into(),
            ));
        }
        Ok(page.body)
    }
}

fn fail_all<S: AsRef<str>>(target_names: &[S], e: &ScraperError) -> Vec<CongestionResult> {
    target_names
        .iter()
        .map(|name| CongestionResult::failure(name.as_ref(), e))
        .collect()
}

/// ログインページの `_token` hidden フィールドを取得
fn find_csrf_token(login_html: &str) -> Result<String, ScraperError> {
    let document = Html::parse_document(login_html);
    let selector = Selector::parse(&format!("input[name=\"{}\"]", CSRF_FIELD))
        .map_err(|e| ScraperError::Protocol(format!("セレクタ解析エラー: {}", e)))?;
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| ScraperError::Protocol("CSRFトークンが見つかりませんでした".into()))
}

/// ログインページに戻された、または失敗文言を含む場合はログイン失敗
fn is_login_rejected(response: &PageResponse, login_url: &str) -> bool {
    same_url(&response.final_url, login_url)
        || LOGIN_FAILURE_PHRASES
            .iter()
            .any(|phrase| response.body.contains(phrase))
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// 次回の呼び出しで再ログインすべき失敗か
fn breaks_session(e: &ScraperError) -> bool {
    matches!(e, ScraperError::Network { .. } | ScraperError::Auth(_))
}

//! HTTP 通信層
//!
//! - `HeaderSet`: 不変のベースヘッダー + リクエスト毎の上書き
//! - `PageResponse`: ステータス・最終URL・本文
//! - `ReqwestConnector` / `ReqwestSession`: reqwest による実装（クッキー保持・タイムアウト付き）

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::config::PortalConfig;
use crate::error::ScraperError;
use crate::traits::{PortalConnector, PortalSession};

/// リクエストヘッダーの集合
///
/// `with` は元の集合を変更せず、上書き済みの新しい集合を返す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, name: &str, value: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(existing, _)| !existing.eq_ignore_ascii_case(name))
            .cloned()
            .chain(std::iter::once((name.to_string(), value.to_string())))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// すべてのヘッダー名・値がHTTPヘッダーとして有効か
    pub fn validate(&self) -> Result<(), ScraperError> {
        self.to_header_map().map(|_| ())
    }

    fn to_header_map(&self) -> Result<HeaderMap, ScraperError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScraperError::Config(format!("不正なヘッダー名 {}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ScraperError::Config(format!("不正なヘッダー値 {}: {}", name, e)))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

/// 取得したページ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    /// リダイレクト追従後のURL
    pub final_url: String,
    pub body: String,
}

impl PageResponse {
    pub fn new(status: u16, final_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            final_url: final_url.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx以外なら通信エラー
    pub fn error_for_status(self) -> Result<Self, ScraperError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScraperError::from_status(self.status, &self.body))
        }
    }

    async fn read(response: reqwest::Response) -> Result<Self, ScraperError> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;
        debug!(status, url = %final_url, bytes = body.len(), "レスポンス受信");
        Ok(Self {
            status,
            final_url,
            body,
        })
    }
}

/// reqwest クライアントを毎回新規に作るコネクタ
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    config: PortalConfig,
}

impl ReqwestConnector {
    /// 作成時に一度クライアントを組み立て、設定の不備をここで検出する
    pub fn new(config: &PortalConfig) -> Result<Self, ScraperError> {
        let connector = Self {
            config: config.clone(),
        };
        connector.build_client()?;
        Ok(connector)
    }

    fn build_client(&self) -> Result<Client, ScraperError> {
        Client::builder()
            .cookie_store(true)
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| ScraperError::Config(format!("HTTPクライアント初期化エラー: {}", e)))
    }
}

impl PortalConnector for ReqwestConnector {
    type Session = ReqwestSession;

    fn connect(&self) -> Result<ReqwestSession, ScraperError> {
        let client = self.build_client()?;
        Ok(ReqwestSession { client })
    }
}

/// クッキーを保持する reqwest クライアント
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: Client,
}

#[async_trait]
impl PortalSession for ReqwestSession {
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<PageResponse, ScraperError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .headers(headers.to_header_map()?)
            .send()
            .await?;
        PageResponse::read(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &HeaderSet,
        form: &[(&str, &str)],
    ) -> Result<PageResponse, ScraperError> {
        debug!(url, fields = form.len(), "POST");
        let response = self
            .client
            .post(url)
            .headers(headers.to_header_map()?)
            .form(form)
            .send()
            .await?;
        PageResponse::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_set_with_does_not_mutate_base() {
        let base = HeaderSet::new().with("User-Agent", "agent");
        let derived = base.with("Referer", "https://example.com/login");

        assert_eq!(base.len(), 1);
        assert_eq!(base.get("referer"), None);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived.get("referer"), Some("https://example.com/login"));
        assert_eq!(derived.get("user-agent"), Some("agent"));
    }

    #[test]
    fn test_header_set_override_is_case_insensitive() {
        let base = HeaderSet::new().with("Referer", "a");
        let derived = base.with("referer", "b");
        assert_eq!(derived.len(), 1);
        assert_eq!(derived.get("Referer"), Some("b"));
        assert_eq!(base.get("Referer"), Some("a"));
    }

    #[test]
    fn test_header_set_rejects_invalid_value() {
        let headers = HeaderSet::new().with("User-Agent", "bad\nvalue");
        assert!(matches!(headers.validate(), Err(ScraperError::Config(_))));
        assert!(HeaderSet::new().with("User-Agent", "agent").validate().is_ok());
    }

    #[test]
    fn test_error_for_status() {
        let ok = PageResponse::new(200, "https://example.com/", "body");
        assert!(ok.clone().error_for_status().is_ok());

        let err = PageResponse::new(502, "https://example.com/", "bad gateway")
            .error_for_status()
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_connector_builds_independent_sessions() {
        let connector = ReqwestConnector::new(&PortalConfig::default()).unwrap();
        assert!(connector.connect().is_ok());
        assert!(connector.connect().is_ok());
    }
}

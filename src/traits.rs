use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScraperError;
use crate::transport::{HeaderSet, PageResponse};

/// ログイン済みセッション1本分の通信ハンドル（クッキー + コネクション）
///
/// 同時に複数のリクエストで共有しないこと。
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// GETリクエスト（リダイレクト追従後のレスポンスを返す）
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<PageResponse, ScraperError>;

    /// フォームPOST（application/x-www-form-urlencoded）
    async fn post_form(
        &self,
        url: &str,
        headers: &HeaderSet,
        form: &[(&str, &str)],
    ) -> Result<PageResponse, ScraperError>;
}

/// 新しい通信ハンドルを作成する
///
/// ログインの度に呼ばれ、既存ハンドルは使い回さない。
pub trait PortalConnector: Send + Sync {
    type Session: PortalSession;

    fn connect(&self) -> Result<Self::Session, ScraperError>;
}

/// セッション有効判定に使う時計
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

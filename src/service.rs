use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tower::Service;
use tracing::info;

use crate::congestion::{CongestionResult, SessionManager};
use crate::error::ScraperError;
use crate::traits::PortalConnector;
use crate::transport::ReqwestConnector;

/// 混雑状況取得リクエスト
///
/// 店舗名が空の場合は設定の既定店舗を取得する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CongestionRequest {
    pub target_names: Vec<String>,
}

impl CongestionRequest {
    pub fn new<I, S>(target_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_names: target_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(target_name: impl Into<String>) -> Self {
        Self {
            target_names: vec![target_name.into()],
        }
    }

    /// 既定店舗
    pub fn default_target() -> Self {
        Self::default()
    }
}

/// tower::Serviceを実装した混雑状況サービス
///
/// クローンしても同じ `SessionManager` を共有し、リクエストは1件ずつ直列に処理する。
/// 結果は店舗ごとに成功/失敗が入る。`call` が `Err` を返すのは設定エラーのときだけ。
pub struct CongestionService<C: PortalConnector = ReqwestConnector> {
    manager: Arc<Mutex<SessionManager<C>>>,
}

impl<C: PortalConnector> Clone for CongestionService<C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl CongestionService<ReqwestConnector> {
    pub fn from_env() -> Result<Self, ScraperError> {
        Ok(Self::new(SessionManager::from_env()?))
    }
}

impl<C: PortalConnector> CongestionService<C> {
    pub fn new(manager: SessionManager<C>) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
        }
    }

    pub async fn is_session_valid(&self) -> bool {
        self.manager.lock().await.is_session_valid()
    }
}

impl<C> Service<CongestionRequest> for CongestionService<C>
where
    C: PortalConnector + 'static,
    C::Session: 'static,
{
    type Response = Vec<CongestionResult>;
    type Error = ScraperError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CongestionRequest) -> Self::Future {
        info!("混雑状況リクエスト受信: {:?}", req.target_names);
        let manager = Arc::clone(&self.manager);

        Box::pin(async move {
            let mut manager = manager.lock().await;
            if req.target_names.is_empty() {
                Ok(vec![manager.fetch_default().await?])
            } else {
                manager.fetch_many(&req.target_names).await
            }
        })
    }
}

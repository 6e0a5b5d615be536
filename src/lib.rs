//! FitEasy 混雑状況スクレイパーライブラリ
//!
//! - 会員ページにフォームログイン（CSRFトークン付き）
//! - ログインセッションを最大2時間再利用し、期限切れなら自動で再ログイン
//! - 混雑状況ページのHTMLから店舗ごとの混雑レベルを抽出
//!
//! # 使用例
//!
//! ```rust,ignore
//! use congestion_scraper::SessionManager;
//!
//! #[tokio::main]
//! async fn main() {
//!     // FITEASY_EMAIL / FITEASY_PASSWORD を環境変数（または .env）に設定
//!     let mut manager = SessionManager::from_env().unwrap();
//!
//!     let result = manager.fetch_one("イオンタウン弥富店").await.unwrap();
//!     println!("{:?}", result.outcome());
//!
//!     // 2回目以降は同じセッションを再利用
//!     let results = manager.fetch_many(&["店舗A", "店舗B"]).await.unwrap();
//!     println!("{} results", results.len());
//! }
//! ```
//!
//! # tower::Service として使う
//!
//! ```rust,ignore
//! use congestion_scraper::{CongestionRequest, CongestionService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = CongestionService::from_env().unwrap();
//!     let results = service
//!         .call(CongestionRequest::single("イオンタウン弥富店"))
//!         .await
//!         .unwrap();
//!     println!("{:?}", results);
//! }
//! ```

pub mod config;
pub mod congestion;
pub mod error;
pub mod service;
pub mod traits;
pub mod transport;

// 主要な型をリエクスポート
pub use config::{Credentials, PortalConfig};
pub use congestion::{extract_level, CongestionResult, SessionManager};
pub use error::ScraperError;
pub use service::{CongestionRequest, CongestionService};
pub use traits::{Clock, PortalConnector, PortalSession, SystemClock};
pub use transport::{HeaderSet, PageResponse, ReqwestConnector, ReqwestSession};

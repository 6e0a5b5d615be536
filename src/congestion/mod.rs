//! 混雑状況スクレイパーモジュール
//!
//! FitEasy会員ページにログインし、店舗ごとの混雑レベルを取得する

mod extractor;
mod session;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use extractor::extract_level;
pub use session::SessionManager;
pub use types::CongestionResult;

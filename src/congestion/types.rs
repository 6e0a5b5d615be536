//! 混雑状況の型定義

use serde::Serialize;

use crate::error::ScraperError;

/// 店舗1件分の取得結果
///
/// `level` と `error` はどちらか一方だけが入る。生成後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CongestionResult {
    target_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CongestionResult {
    pub fn success(target_name: impl Into<String>, level: u32) -> Self {
        Self {
            target_name: target_name.into(),
            level: Some(level),
            error: None,
        }
    }

    pub fn failure(target_name: impl Into<String>, error: &ScraperError) -> Self {
        Self {
            target_name: target_name.into(),
            level: None,
            error: Some(error.to_string()),
        }
    }

    pub(crate) fn from_outcome(target_name: &str, outcome: Result<u32, ScraperError>) -> Self {
        match outcome {
            Ok(level) => Self::success(target_name, level),
            Err(e) => Self::failure(target_name, &e),
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.level.is_some()
    }

    /// 成功ならレベル、失敗ならエラーメッセージ
    pub fn outcome(&self) -> Result<u32, &str> {
        match (self.level, self.error.as_deref()) {
            (Some(level), _) => Ok(level),
            (None, Some(error)) => Err(error),
            (None, None) => Err(""),
        }
    }
}

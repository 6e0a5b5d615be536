use thiserror::Error;

/// エラー本文をメッセージに含める際の最大バイト数
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("通信エラー{}: {detail}", status_suffix(.status))]
    Network { status: Option<u16>, detail: String },

    #[error("ログインエラー: {0}")]
    Auth(String),

    #[error("ページ構造エラー: {0}")]
    Protocol(String),

    #[error("{0}が見つかりませんでした")]
    NotFound(String),

    #[error("マークアップ解析エラー: {0}")]
    MalformedMarkup(String),
}

impl ScraperError {
    pub fn network(detail: impl Into<String>) -> Self {
        ScraperError::Network {
            status: None,
            detail: detail.into(),
        }
    }

    /// 2xx以外のレスポンスから通信エラーを作成（本文は切り詰める）
    pub fn from_status(status: u16, body: &str) -> Self {
        ScraperError::Network {
            status: Some(status),
            detail: truncate_body(body),
        }
    }

    /// プロセスを止めるべき設定エラーか
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::Config(_))
    }

    /// 呼び出し側がバックオフ付きで再試行してよいか
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScraperError::Network { .. })
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        ScraperError::Network {
            status: e.status().map(|s| s.as_u16()),
            detail: e.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

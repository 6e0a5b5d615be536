//! 混雑状況ページのHTMLから店舗ごとの混雑レベルを抽出する
//!
//! 想定するマークアップ:
//!
//! ```html
//! <div class="p-congestionInfo__ttl">イオンタウン弥富店</div>
//! <div class="p-congestionInfo__cont">
//!   <div class="p-congestionInfo__icon level-3"></div>
//! </div>
//! ```
//!
//! 2つ目のクラス名末尾の数字が混雑レベル。構造が変わった場合は推測せずエラーにする。

use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;

const TITLE_CLASS: &str = "p-congestionInfo__ttl";
const CONTENT_CLASS: &str = "p-congestionInfo__cont";

/// `page_html` 中の `target_name` の混雑レベルを返す
pub fn extract_level(page_html: &str, target_name: &str) -> Result<u32, ScraperError> {
    let document = Html::parse_document(page_html);
    let title_selector = Selector::parse(&format!("div.{}", TITLE_CLASS))
        .map_err(|e| ScraperError::MalformedMarkup(format!("セレクタ解析エラー: {}", e)))?;

    let title = document
        .select(&title_selector)
        .find(|el| el.text().collect::<String>().trim() == target_name)
        .ok_or_else(|| ScraperError::NotFound(target_name.to_string()))?;

    let content = title
        .next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|el| has_class(el, CONTENT_CLASS))
        .ok_or_else(|| {
            ScraperError::MalformedMarkup(format!("{}の{}が見つかりませんでした", target_name, CONTENT_CLASS))
        })?;

    let second_class = content
        .children()
        .filter_map(ElementRef::wrap)
        .find_map(|child| class_tokens(&child).nth(1).map(str::to_string))
        .ok_or_else(|| {
            ScraperError::MalformedMarkup(format!("{}の混雑アイコンが見つかりませんでした", target_name))
        })?;

    trailing_number(&second_class).ok_or_else(|| {
        ScraperError::MalformedMarkup(format!(
            "2つ目のクラス名に数字が見つかりませんでした: {}",
            second_class
        ))
    })
}

/// class 属性を記述順のまま分割
fn class_tokens<'a>(el: &ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    el.value()
        .attr("class")
        .unwrap_or_default()
        .split_ascii_whitespace()
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    class_tokens(el).any(|token| token == class)
}

/// 末尾の10進数字列を数値化（`level-12` → 12）
fn trailing_number(token: &str) -> Option<u32> {
    let prefix_len = token.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let digits = &token[prefix_len..];
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

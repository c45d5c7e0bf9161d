//! Economic activity lines from the SUNAT results page

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static TD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td").expect("BUG: hardcoded selector 'td' is statically valid")
});

/// `Principal - 0410 ...` / `Secundaria 1 - 4711 ...`
static ACTIVITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Principal|Secundaria(?:\s+\d+)?)\s*-\s*\d{4}")
        .expect("BUG: hardcoded activity regex is statically valid")
});

/// Separator between activities in a joined activity string
pub const ACTIVITY_SEPARATOR: &str = "; ";

/// Text of every table cell that carries an activity line, in document order
#[must_use]
pub fn extract_activities(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&TD_SELECTOR)
        .map(|td| td.text().collect::<String>())
        .filter(|text| ACTIVITY_LINE.is_match(text))
        .map(|text| text.trim().to_string())
        .collect()
}

/// Case-insensitive substring match against the mining keywords
#[must_use]
pub fn is_mining_activity(activity: &str, keywords: &[String]) -> bool {
    let lowered = activity.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

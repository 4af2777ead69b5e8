//! Cleanup of model replies.
//!
//! Models are told not to, but they still wrap HTML in markdown fences now
//! and then. Only a wrapper around the whole reply is removed; fences inside
//! the body are content.

use std::sync::LazyLock;

use regex_lite::Regex;

#[allow(clippy::expect_used)]
static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+.-]*\s*").expect("leading fence pattern"));

#[allow(clippy::expect_used)]
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").expect("trailing fence pattern"));

/// Strip one optional leading fence (with language tag) and one optional
/// trailing fence, then trim.
pub fn strip_code_fence(text: &str) -> String {
    let text = LEADING_FENCE.replace(text, "");
    let text = TRAILING_FENCE.replace(&text, "");
    text.trim().to_string()
}

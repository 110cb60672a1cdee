//! Progress value extraction.
//!
//! Backend progress events come in two encodings: a bare percentage in
//! `current_step`, or a `(current/total)` counter somewhere in the detail
//! line. The percentage always wins when both are present.

use pkgstate_schema::{PROGRESS_MAX, PROGRESS_MIN};
use regex::Regex;
use std::sync::LazyLock;

/// Longest leading float literal, after optional whitespace.
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("static regex")
});

static STEP_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").expect("static regex"));

/// Parse the leading number of `step`, ignoring any trailing text.
///
/// `"45"` and `"45%"` both give 45; `""`, `"abc"` and `"NaN"` give `None`.
pub fn parse_step(step: &str) -> Option<f64> {
    let literal = LEADING_NUMBER.find(step)?.as_str().trim_start();
    literal.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Percentage from the first `(current/total)` counter in `detail`.
///
/// A zero total yields `None`. Digits too long for an integer still parse
/// (as a float), so an oversized counter clamps instead of vanishing.
pub fn parse_counter(detail: &str) -> Option<f64> {
    let caps = STEP_COUNTER.captures(detail)?;
    let current: f64 = caps[1].parse().ok()?;
    let total: f64 = caps[2].parse().ok()?;
    if total == 0.0 {
        return None;
    }
    Some(current / total * 100.0).filter(|v| !v.is_nan())
}

/// Derive a clamped progress percentage from one event's fields.
///
/// `None` means "no update this tick": the caller keeps its last value.
pub fn parse_progress(current_step: &str, detail: &str) -> Option<f64> {
    parse_step(current_step)
        .or_else(|| parse_counter(detail))
        .map(|v| v.clamp(PROGRESS_MIN, PROGRESS_MAX))
}

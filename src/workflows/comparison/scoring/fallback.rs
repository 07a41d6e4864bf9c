use super::super::domain::{Dimension, Proposal};
use super::NEUTRAL_SCORE;

const PRICE_FLOOR: f64 = 100.0;
const SCHEDULE_STRONG: u8 = 85;
const SCHEDULE_BASE: u8 = 60;
const KEYWORD_FLOOR: f64 = 40.0;
const KEYWORD_SPAN: f64 = 55.0;
const KEYWORD_CEILING: f64 = 95.0;

/// Normalize extracted price text to a number. Currency symbols, thousands
/// separators, and whitespace are stripped; a trailing `k`/`K` multiplies by
/// 1000. Anything unparseable normalizes to 0 rather than failing.
pub(crate) fn normalize_price(raw: &str) -> f64 {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    let cleaned = cleaned.trim();
    let (digits, multiplier) = if cleaned.ends_with('k') || cleaned.ends_with('K') {
        (&cleaned[..cleaned.len() - 1], 1000.0)
    } else {
        (cleaned, 1.0)
    };

    match digits.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value * multiplier,
        _ => 0.0,
    }
}

/// Highest normalized price among the eligible proposals, floored at 100 so
/// the cost formula stays defined when every price is zero or unparseable.
pub(crate) fn max_eligible_price(proposals: &[&Proposal]) -> f64 {
    let max = proposals
        .iter()
        .map(|proposal| normalize_price(proposal.price.as_deref().unwrap_or_default()))
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        PRICE_FLOOR
    }
}

/// Score one (proposal, dimension) cell with the local heuristics. Any
/// degenerate input collapses to the neutral score instead of erroring.
pub(crate) fn score_cell(proposal: &Proposal, dimension: &Dimension, max_price: f64) -> u8 {
    match dimension.id.as_str() {
        "cost" => cost_score(
            normalize_price(proposal.price.as_deref().unwrap_or_default()),
            max_price,
        ),
        "schedule" => schedule_score(proposal),
        _ => keyword_score(proposal, dimension),
    }
}

/// Cheaper proposals score higher: `round(((max - price) / max) * 100)`,
/// clamped to 0..=100.
fn cost_score(price: f64, max_price: f64) -> u8 {
    if !(max_price > 0.0) {
        return NEUTRAL_SCORE;
    }
    let raw = ((max_price - price) / max_price) * 100.0;
    if !raw.is_finite() {
        return NEUTRAL_SCORE;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// An explicit start date or scheduling language in the analyzed text is
/// treated as a concrete plan.
fn schedule_score(proposal: &Proposal) -> u8 {
    if proposal.start_date.is_some() {
        return SCHEDULE_STRONG;
    }
    let text = proposal.analyzed_text().to_lowercase();
    if text.contains("start") || text.contains("schedule") {
        SCHEDULE_STRONG
    } else {
        SCHEDULE_BASE
    }
}

/// Keyword coverage over the analyzed text:
/// `round(min(40 + matched/total * 55, 95))`. A dimension without keywords
/// matches on its own lowercased name.
fn keyword_score(proposal: &Proposal, dimension: &Dimension) -> u8 {
    let keywords: Vec<String> = if dimension.keywords.is_empty() {
        vec![dimension.name.to_lowercase()]
    } else {
        dimension
            .keywords
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .collect()
    };
    if keywords.is_empty() {
        return NEUTRAL_SCORE;
    }

    let text = proposal.analyzed_text().to_lowercase();
    let matched = keywords
        .iter()
        .filter(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
        .count();

    let raw = KEYWORD_FLOOR + (matched as f64 / keywords.len() as f64) * KEYWORD_SPAN;
    if !raw.is_finite() {
        return NEUTRAL_SCORE;
    }
    raw.min(KEYWORD_CEILING).round() as u8
}

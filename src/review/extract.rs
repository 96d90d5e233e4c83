//! Recovery of a [`ReviewRecord`] from free-form model output.
//!
//! Headings act as section delimiters. Anything that cannot be located is
//! replaced with sentinel text, so callers always get a complete record.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error};

use super::{
    DetailedAnalysis, Principle, ReviewRecord, ANALYSIS_HEADING_PREFIX, BAD_POINTS_HEADING,
    BAD_POINTS_MISSING, GOOD_POINTS_HEADING, GOOD_POINTS_MISSING, SUMMARY_HEADING,
    SUMMARY_MISSING,
};

/// Colon variants accepted after a heading (ASCII and full-width).
const DELIMITER: &str = "[:：]";

struct Patterns {
    summary: Regex,
    good_points: Regex,
    bad_points: Regex,
    list_marker: Regex,
    principles: Vec<Regex>,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let heading = |literal: &str| Regex::new(&format!("{}{}", regex::escape(literal), DELIMITER));

        let principles = Principle::ALL
            .iter()
            .map(|p| heading(p.name()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            summary: heading(SUMMARY_HEADING)?,
            good_points: heading(GOOD_POINTS_HEADING)?,
            bad_points: heading(BAD_POINTS_HEADING)?,
            list_marker: Regex::new(r"(?m)^[ \t]*(?:-|\d+\.)[ \t]+")?,
            principles,
        })
    }

    fn principle(&self, principle: Principle) -> &Regex {
        &self.principles[principle.index()]
    }
}

fn patterns() -> Result<&'static Patterns, &'static regex::Error> {
    static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
    PATTERNS.get_or_init(Patterns::compile).as_ref()
}

/// Extract a structured review from raw model text.
///
/// Pure and deterministic; never fails.
pub fn extract(raw: &str) -> ReviewRecord {
    let patterns = match patterns() {
        Ok(patterns) => patterns,
        Err(e) => {
            error!("Review patterns failed to compile: {}", e);
            return ReviewRecord::parse_failed();
        }
    };

    let summary = extract_summary(raw, patterns);

    let good_terminator = format!("\n\n{}", BAD_POINTS_HEADING);
    let good_points = section(raw, &patterns.good_points, &good_terminator)
        .map(|block| split_points(block, &patterns.list_marker))
        .unwrap_or_default();

    let bad_terminator = format!("\n\n{}", ANALYSIS_HEADING_PREFIX);
    let bad_points = section(raw, &patterns.bad_points, &bad_terminator)
        .map(|block| split_points(block, &patterns.list_marker))
        .unwrap_or_default();

    let detailed_analysis = extract_analysis(raw, patterns);

    debug!(
        "Extracted review: {} good point(s), {} bad point(s)",
        good_points.len(),
        bad_points.len()
    );

    ReviewRecord {
        summary,
        good_points: or_sentinel(good_points, GOOD_POINTS_MISSING),
        bad_points: or_sentinel(bad_points, BAD_POINTS_MISSING),
        detailed_analysis,
    }
}

fn extract_summary(raw: &str, patterns: &Patterns) -> String {
    let Some(heading) = patterns.summary.find(raw) else {
        return SUMMARY_MISSING.to_string();
    };

    // The body starts after any whitespace following the heading and runs to
    // the first blank line.
    let rest = raw[heading.end()..].trim_start();
    let end = rest.find("\n\n").unwrap_or(rest.len());
    let summary = rest[..end].trim();

    if summary.is_empty() {
        SUMMARY_MISSING.to_string()
    } else {
        summary.to_string()
    }
}

/// Text between a heading and `terminator` (or end of text).
///
/// The terminator is searched from the heading itself so that an empty
/// section does not swallow the next one.
fn section<'t>(raw: &'t str, heading: &Regex, terminator: &str) -> Option<&'t str> {
    let found = heading.find(raw)?;
    let rest = &raw[found.end()..];
    let end = rest.find(terminator).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn split_points(block: &str, list_marker: &Regex) -> Vec<String> {
    list_marker
        .split(block)
        .map(str::trim)
        .filter(|point| !point.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn extract_analysis(raw: &str, patterns: &Patterns) -> DetailedAnalysis {
    let mut analysis = DetailedAnalysis::default();

    for principle in Principle::ALL {
        let Some(heading) = patterns.principle(principle).find(raw) else {
            continue;
        };

        let rest = &raw[heading.end()..];
        let end = principle
            .next()
            .and_then(|next| rest.find(next.name()))
            .unwrap_or(rest.len());

        let body = rest[..end].trim();
        if !body.is_empty() {
            analysis.set(principle, body);
        }
    }

    analysis
}

fn or_sentinel(points: Vec<String>, sentinel: &str) -> Vec<String> {
    if points.is_empty() {
        vec![sentinel.to_string()]
    } else {
        points
    }
}

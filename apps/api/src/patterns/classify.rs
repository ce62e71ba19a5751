//! Content attribute classifiers — simple, deterministic rules over text.
//!
//! Each published piece yields one (type, value) pair per attribute; the
//! miner aggregates outcomes under those keys. Rules are deliberately
//! coarse: buckets, not embeddings.

use chrono::{DateTime, Timelike, Utc};

use crate::scoring::local::count_emoji;

/// Attribute families mined into success patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    HookStyle,
    LengthBucket,
    Structure,
    EmojiUsage,
    PostingTime,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::HookStyle => "hook_style",
            PatternType::LengthBucket => "length_bucket",
            PatternType::Structure => "structure",
            PatternType::EmojiUsage => "emoji_usage",
            PatternType::PostingTime => "posting_time",
        }
    }
}

/// All extractable attributes for one piece of content.
pub fn extract_attributes(
    text: &str,
    published_at: Option<DateTime<Utc>>,
) -> Vec<(PatternType, String)> {
    let mut attrs = vec![
        (PatternType::HookStyle, hook_style(text).to_string()),
        (PatternType::LengthBucket, length_bucket(text).to_string()),
        (PatternType::Structure, structure(text).to_string()),
        (PatternType::EmojiUsage, emoji_usage(text).to_string()),
    ];
    if let Some(at) = published_at {
        attrs.push((PatternType::PostingTime, posting_time(at).to_string()));
    }
    attrs
}

/// Classifies the opening line.
pub fn hook_style(text: &str) -> &'static str {
    let first = text.lines().next().unwrap_or("").trim();
    let lower = first.to_lowercase();

    if first.contains('?') {
        "question"
    } else if lower.starts_with("i ") || lower.starts_with("my ") || lower.starts_with("when i") {
        "personal_story"
    } else if first.chars().any(|c| c.is_ascii_digit()) && (first.contains('%') || lower.contains(" in ") || lower.contains(" of ")) {
        "statistic"
    } else if first.ends_with('.') && first.split_whitespace().count() <= 8 {
        "bold_statement"
    } else {
        "plain"
    }
}

/// short < 80 words, medium 80–200, long > 200.
pub fn length_bucket(text: &str) -> &'static str {
    match text.split_whitespace().count() {
        0..=79 => "short",
        80..=200 => "medium",
        _ => "long",
    }
}

/// list = bulleted/numbered lines; punchy = many short lines; else narrative.
pub fn structure(text: &str) -> &'static str {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "narrative";
    }

    let list_lines = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('-')
                || t.starts_with('*')
                || t.starts_with('•')
                || t.chars().next().is_some_and(|c| c.is_ascii_digit())
                    && t.chars().nth(1) == Some('.')
        })
        .count();
    if list_lines * 2 >= lines.len() && list_lines >= 2 {
        return "list";
    }

    let short_lines = lines
        .iter()
        .filter(|l| l.split_whitespace().count() <= 12)
        .count();
    if lines.len() >= 4 && short_lines * 3 >= lines.len() * 2 {
        "punchy"
    } else {
        "narrative"
    }
}

/// none / light (1–3) / heavy (>3).
pub fn emoji_usage(text: &str) -> &'static str {
    match count_emoji(text) {
        0 => "none",
        1..=3 => "light",
        _ => "heavy",
    }
}

/// Buckets publish hour (UTC) into the day parts users actually compare.
pub fn posting_time(at: DateTime<Utc>) -> &'static str {
    match at.hour() {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

/// Wilson score lower bound (95%) on the pattern's success rate.
///
/// Chosen as the significance indicator because it is monotonically
/// non-decreasing in occurrence count for a fixed observed rate, which is
/// exactly the "more data, more trust" property the miner needs.
pub fn significance(success_count: i64, occurrence_count: i64) -> f64 {
    if occurrence_count == 0 {
        return 0.0;
    }
    let n = occurrence_count as f64;
    let p = success_count as f64 / n;
    let z = 1.96_f64;
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let margin = z * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt();
    ((center - margin) / denom).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hook_style_question() {
        assert_eq!(hook_style("Why do we ship late?\nBecause..."), "question");
    }

    #[test]
    fn test_hook_style_personal_story() {
        assert_eq!(hook_style("I quit my job last year.\nHere's why."), "personal_story");
    }

    #[test]
    fn test_hook_style_statistic() {
        assert_eq!(hook_style("87% of launches miss their date.\nOuch."), "statistic");
    }

    #[test]
    fn test_hook_style_bold_statement() {
        assert_eq!(hook_style("Meetings are theater.\nProof below."), "bold_statement");
    }

    #[test]
    fn test_hook_style_plain_fallback() {
        assert_eq!(
            hook_style("announcing our quarterly all hands review for the team next week"),
            "plain"
        );
    }

    #[test]
    fn test_length_buckets_at_boundaries() {
        let words = |n: usize| vec!["word"; n].join(" ");
        assert_eq!(length_bucket(&words(79)), "short");
        assert_eq!(length_bucket(&words(80)), "medium");
        assert_eq!(length_bucket(&words(200)), "medium");
        assert_eq!(length_bucket(&words(201)), "long");
    }

    #[test]
    fn test_structure_detects_list() {
        let text = "Three lessons:\n- ship small\n- measure\n- repeat";
        assert_eq!(structure(text), "list");
    }

    #[test]
    fn test_structure_detects_punchy() {
        let text = "Ship small.\nMeasure.\nRepeat.\nEvery week.\nNo exceptions.";
        assert_eq!(structure(text), "punchy");
    }

    #[test]
    fn test_structure_narrative_fallback() {
        let text = "Last spring we rebuilt the entire deployment pipeline from scratch and it \
                    took three months longer than anyone expected because of hidden coupling.";
        assert_eq!(structure(text), "narrative");
    }

    #[test]
    fn test_posting_time_buckets() {
        let at = |h: u32| Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap();
        assert_eq!(posting_time(at(8)), "morning");
        assert_eq!(posting_time(at(13)), "afternoon");
        assert_eq!(posting_time(at(19)), "evening");
        assert_eq!(posting_time(at(2)), "night");
    }

    #[test]
    fn test_significance_monotone_in_count_for_fixed_rate() {
        // Same 75% rate, growing sample: trust must never decrease.
        let mut prev = 0.0;
        for n in [4i64, 8, 16, 40, 100, 400] {
            let sig = significance(n * 3 / 4, n);
            assert!(
                sig >= prev,
                "significance regressed at n={n}: {sig} < {prev}"
            );
            prev = sig;
        }
    }

    #[test]
    fn test_significance_zero_for_no_occurrences() {
        assert_eq!(significance(0, 0), 0.0);
    }

    #[test]
    fn test_significance_below_observed_rate() {
        let sig = significance(3, 4);
        assert!(sig < 0.75);
        assert!(sig > 0.0);
    }

    #[test]
    fn test_extract_attributes_includes_posting_time_only_when_published() {
        let text = "Why?\nBecause.\nThat's it.";
        let without = extract_attributes(text, None);
        assert_eq!(without.len(), 4);
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let with = extract_attributes(text, Some(at));
        assert_eq!(with.len(), 5);
        assert!(with.iter().any(|(t, v)| *t == PatternType::PostingTime && v == "morning"));
    }
}

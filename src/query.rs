//! Query candidates for free-form taxonomic labels.
//!
//! Catalog labels come in many shapes: `Turdus_merula`, `Turdus merula (common blackbird)`,
//! `Mirlo común, Turdus merula`. Providers match best on a clean Latin binomial, so the
//! candidates are ranked with binomial-bearing strings first and shorter strings before
//! longer ones.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[-–—]\s*").unwrap());
static TRAILING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)\s*$").unwrap());
static BINOMIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-z]+ [a-z]+)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Uppercases the first letter of the first word and collapses whitespace.
pub fn smart_capitalize(text: &str) -> String {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return text.to_string();
    };
    let mut chars = first.chars();
    let mut out = match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    for word in words {
        out.push(' ');
        out.push_str(word);
    }
    out
}

pub fn extract_binomial(text: &str) -> Option<String> {
    BINOMIAL
        .captures(&smart_capitalize(text))
        .map(|caps| caps[1].to_string())
}

/// Underscores to spaces, dash runs to a single space, trailing `( ... )` removed.
pub fn normalize_label(raw: &str) -> String {
    let spaced = raw.trim().replace('_', " ");
    let undashed = DASH_RUN.replace_all(&spaced, " ");
    TRAILING_PAREN.replace(&undashed, "").trim().to_string()
}

pub fn candidate_queries(raw: &str) -> Vec<String> {
    let mut out = BTreeSet::new();
    let normalized = normalize_label(raw);

    if !normalized.is_empty() {
        out.insert(normalized.clone());
    }
    if normalized.contains(',') {
        out.extend(
            normalized
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string),
        );
    }
    if let Some(latin) = extract_binomial(&normalized) {
        out.insert(latin);
    }
    out.extend(
        raw.split('_')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| WHITESPACE.replace_all(part, " ").into_owned()),
    );

    let capitalized: Vec<String> = out.iter().map(|item| smart_capitalize(item)).collect();
    out.extend(capitalized);
    out.retain(|item| !item.trim().is_empty());

    let mut ranked: Vec<(bool, usize, String)> = out
        .into_iter()
        .map(|item| {
            let plain = extract_binomial(&item).is_none();
            (plain, item.chars().count(), item)
        })
        .collect();
    ranked.sort();
    ranked.into_iter().map(|(_, _, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_first_word_only() {
        assert_eq!(smart_capitalize("turdus  merula"), "Turdus merula");
        assert_eq!(smart_capitalize("ñandú común"), "Ñandú común");
        assert_eq!(smart_capitalize(""), "");
    }

    #[test]
    fn binomial_detection() {
        assert_eq!(extract_binomial("turdus merula"), Some("Turdus merula".to_string()));
        assert_eq!(extract_binomial("Turdus"), None);
        assert_eq!(extract_binomial("TURDUS MERULA"), None);
    }

    #[test]
    fn normalize_strips_dashes_and_parenthetical() {
        assert_eq!(normalize_label("Turdus_merula (common blackbird)"), "Turdus merula");
        assert_eq!(normalize_label("Zorzal – Turdus merula"), "Zorzal Turdus merula");
    }
}

use std::collections::{HashMap, HashSet};

use regex::Regex;

/// A deduped, scored source reference (§4.G citation collection).
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub url: String,
    pub domain: String,
    pub relevance: f64,
    pub recency: f64,
}

impl Citation {
    /// `relevance*0.7 + recency*0.3`, fixed by the spec.
    pub fn score(&self) -> f64 {
        self.relevance * 0.7 + self.recency * 0.3
    }
}

/// Extracts URLs and DOIs from free text, normalizing trailing punctuation
/// a sentence boundary would otherwise leave attached.
pub fn extract_urls(text: &str) -> Vec<String> {
    let url_re = Regex::new(r"https?://[^\s)\]]+").expect("static regex");
    let doi_re = Regex::new(r"10\.\d{4,9}/[^\s)\]]+").expect("static regex");

    let mut found: Vec<String> = url_re.find_iter(text).map(|m| normalize(m.as_str())).collect();
    found.extend(doi_re.find_iter(text).map(|m| format!("doi:{}", normalize(m.as_str()))));
    found
}

fn normalize(raw: &str) -> String {
    raw.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"'))
        .to_string()
}

pub fn domain_of(reference: &str) -> String {
    if let Some(doi) = reference.strip_prefix("doi:") {
        return format!("doi:{}", doi.splitn(2, '/').next().unwrap_or(doi));
    }
    let without_scheme = reference.splitn(2, "://").nth(1).unwrap_or(reference);
    without_scheme.split('/').next().unwrap_or(without_scheme).to_ascii_lowercase()
}

/// Dedupes, scores, sorts best-first, and caps each domain at
/// `diversity_cap` distinct citations (§4.G "diversity cap 3/domain").
/// `relevance`/`recency` are assigned by the caller per reference (the
/// spec fixes only the 0.7/0.3 weighting, not how those two inputs are
/// estimated — §9 open question).
pub fn collect(scored_refs: &[(String, f64, f64)], diversity_cap: usize) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    for (reference, relevance, recency) in scored_refs {
        if !seen.insert(reference.clone()) {
            continue;
        }
        citations.push(Citation {
            url: reference.clone(),
            domain: domain_of(reference),
            relevance: *relevance,
            recency: *recency,
        });
    }
    citations.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));

    let mut per_domain: HashMap<String, usize> = HashMap::new();
    citations
        .into_iter()
        .filter(|c| {
            let count = per_domain.entry(c.domain.clone()).or_insert(0);
            *count += 1;
            *count <= diversity_cap
        })
        .collect()
}

/// First-occurrence-wins relevance proxy: earlier mentions in a synthesis
/// pass score higher, on the assumption a source pulled in earlier fed a
/// more central claim. Recency is unknown without a fetch timestamp, so
/// every reference gets the same neutral recency score.
pub fn score_by_order(references: &[String]) -> Vec<(String, f64, f64)> {
    let total = references.len().max(1) as f64;
    references
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let relevance = 1.0 - (i as f64 / total) * 0.5;
            (r.clone(), relevance, 0.5)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_and_dois_stripping_trailing_punctuation() {
        let text = "See https://example.com/a. Also doi 10.1234/abcd.5678, and (https://other.org/x).";
        let found = extract_urls(text);
        assert!(found.contains(&"https://example.com/a".to_string()));
        assert!(found.contains(&"https://other.org/x".to_string()));
        assert!(found.iter().any(|f| f.starts_with("doi:10.1234")));
    }

    #[test]
    fn diversity_cap_limits_per_domain() {
        let refs: Vec<(String, f64, f64)> = (0..5)
            .map(|i| (format!("https://same.com/{i}"), 0.9, 0.5))
            .collect();
        let citations = collect(&refs, 3);
        assert_eq!(citations.len(), 3);
    }

    #[test]
    fn dedupes_identical_references() {
        let refs = vec![
            ("https://example.com/a".to_string(), 0.9, 0.5),
            ("https://example.com/a".to_string(), 0.9, 0.5),
        ];
        assert_eq!(collect(&refs, 3).len(), 1);
    }
}

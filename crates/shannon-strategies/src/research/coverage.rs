/// Explicit "more work needed" phrasing an LLM might emit instead of (or
/// alongside) a structurally detectable gap (§4.G gap detection signal 2).
const GAP_PHRASES: &[&str] = &[
    "more research is needed",
    "insufficient information",
    "further investigation required",
    "not enough sources",
];

/// Splits a report into `### Area` sections, mapping lowercased area title
/// to body text. Content before the first heading is dropped.
pub fn split_sections(report: &str) -> std::collections::HashMap<String, String> {
    let mut sections = std::collections::HashMap::new();
    let mut current: Option<String> = None;
    let mut body = String::new();

    for line in report.lines() {
        if let Some(title) = line.trim().strip_prefix("### ") {
            if let Some(prev) = current.take() {
                sections.insert(prev, std::mem::take(&mut body));
            }
            current = Some(title.trim().to_ascii_lowercase());
        } else if current.is_some() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some(prev) = current {
        sections.insert(prev, body);
    }
    sections
}

fn count_inline_citations(body: &str) -> usize {
    crate::research::citations::extract_urls(body).len()
        + body.matches(|c: char| c == '[').count()
}

/// Returns the subset of `expected_areas` that are missing, too short
/// (`< min_chars`), or under-cited (`< min_citations` inline markers)
/// (§4.G gap detection signals 1 and 3).
pub fn find_gaps(report: &str, expected_areas: &[String], min_chars: usize, min_citations: usize) -> Vec<String> {
    let sections = split_sections(report);
    expected_areas
        .iter()
        .filter(|area| {
            match sections.get(&area.to_ascii_lowercase()) {
                None => true,
                Some(body) => body.trim().len() < min_chars || count_inline_citations(body) < min_citations,
            }
        })
        .cloned()
        .collect()
}

/// Whether the report itself admits incompleteness in prose (§4.G gap
/// detection signal 2), independent of the structural `find_gaps` check.
pub fn has_explicit_gap_phrase(report: &str) -> bool {
    let lower = report.to_ascii_lowercase();
    GAP_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Rough truncation heuristic: a report that doesn't end on sentence-ending
/// punctuation, or that sits within 300 tokens (~1200 chars) of a generous
/// length ceiling, is treated as truncated and continued (§9 "adaptive
/// margin of 25% or 300 tokens" is heuristic; this implementation takes the
/// 300-token leg of that margin literally at a 4-chars-per-token estimate).
pub fn looks_truncated(report: &str, max_chars: usize) -> bool {
    let trimmed = report.trim_end();
    if trimmed.is_empty() {
        return false;
    }
    let near_ceiling = max_chars.saturating_sub(trimmed.len()) < 1200;
    let ends_mid_sentence = !trimmed.ends_with(['.', '!', '?', '"']);
    near_ceiling || ends_mid_sentence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_missing_and_undercited_sections() {
        let report = "### LangChain\nShort.\n\n### AutoGen\n[1] https://a.com [2] https://b.com ".to_string()
            + &"x".repeat(650);
        let gaps = find_gaps(&report, &["LangChain".to_string(), "AutoGen".to_string()], 600, 2);
        assert_eq!(gaps, vec!["LangChain".to_string()]);
    }

    #[test]
    fn detects_explicit_gap_phrase() {
        assert!(has_explicit_gap_phrase("In summary, more research is needed on this topic."));
        assert!(!has_explicit_gap_phrase("This topic is thoroughly covered."));
    }

    #[test]
    fn truncation_heuristic_flags_missing_terminal_punctuation() {
        assert!(looks_truncated("this sentence just stops", 10_000));
        assert!(!looks_truncated("This is complete.", 10_000));
    }
}

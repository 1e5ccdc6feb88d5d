use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
    Local,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::Local => "local",
            Provider::Unknown => "unknown",
        }
    }
}

/// Deterministic prefix/alias map (§4.A). Order matters: more specific
/// prefixes are checked first.
pub fn detect_provider(model: &str) -> Provider {
    let m = model.to_ascii_lowercase();
    const ANTHROPIC_PREFIXES: &[&str] = &["claude-", "claude3", "claude-3", "claude-opus", "claude-sonnet", "claude-haiku"];
    const OPENAI_PREFIXES: &[&str] = &["gpt-", "gpt3", "gpt4", "o1-", "o3-", "chatgpt"];
    const GOOGLE_PREFIXES: &[&str] = &["gemini-", "palm-", "bison"];
    const LOCAL_PREFIXES: &[&str] = &["llama", "mixtral", "mistral-7b", "qwen", "phi-"];

    if ANTHROPIC_PREFIXES.iter().any(|p| m.starts_with(p)) {
        return Provider::Anthropic;
    }
    if OPENAI_PREFIXES.iter().any(|p| m.starts_with(p)) {
        return Provider::OpenAi;
    }
    if GOOGLE_PREFIXES.iter().any(|p| m.starts_with(p)) {
        return Provider::Google;
    }
    if LOCAL_PREFIXES.iter().any(|p| m.starts_with(p)) {
        return Provider::Local;
    }
    Provider::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_providers() {
        assert_eq!(detect_provider("claude-3-5-sonnet"), Provider::Anthropic);
        assert_eq!(detect_provider("gpt-4o-mini"), Provider::OpenAi);
        assert_eq!(detect_provider("gemini-1.5-pro"), Provider::Google);
        assert_eq!(detect_provider("llama-3.1-70b"), Provider::Local);
        assert_eq!(detect_provider("some-mystery-model"), Provider::Unknown);
    }
}

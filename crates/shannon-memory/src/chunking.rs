use tiktoken_rs::cl100k_base;

use crate::error::{MemoryError, MemoryResult};

/// Counts and splits text by token, used both to estimate whether a
/// session's history has crossed a model-tier compression threshold and to
/// break an oversized history into windows before summarization.
pub struct Tokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

impl Tokenizer {
    pub fn new() -> MemoryResult<Self> {
        let bpe = cl100k_base().map_err(|e| MemoryError::Tokenization(e.to_string()))?;
        Ok(Tokenizer { bpe })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[u32]) -> String {
        self.bpe.decode(tokens.to_vec()).unwrap_or_default()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new().expect("cl100k_base tokenizer should always load")
    }
}

#[derive(Debug, Clone)]
pub struct TextWindow {
    pub content: String,
    pub token_count: usize,
}

/// Splits `text` into roughly `window_tokens`-sized windows, used to feed a
/// long history to a summarizer in manageable pieces.
pub fn windows(text: &str, window_tokens: usize) -> MemoryResult<Vec<TextWindow>> {
    if text.is_empty() || window_tokens == 0 {
        return Ok(Vec::new());
    }
    let tokenizer = Tokenizer::new()?;
    let tokens = tokenizer.encode(text);
    if tokens.len() <= window_tokens {
        return Ok(vec![TextWindow {
            content: text.to_string(),
            token_count: tokens.len(),
        }]);
    }

    let mut out = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + window_tokens).min(tokens.len());
        let slice = &tokens[start..end];
        out.push(TextWindow {
            content: tokenizer.decode(slice),
            token_count: slice.len(),
        });
        start = end;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_window() {
        let windows = windows("hello there", 512).unwrap();
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn long_text_splits_into_multiple_windows() {
        let text = "word ".repeat(2000);
        let windows = windows(&text, 256).unwrap();
        assert!(windows.len() > 1);
        assert!(windows.iter().all(|w| w.token_count <= 256));
    }

    #[test]
    fn token_count_matches_across_windows_and_whole() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert!(tokenizer.count_tokens(text) > 0);
    }
}

//! Token length measurement for the chunker.

/// Measures text length in model tokens. Implementations must be
/// deterministic, and counts must not decrease as text grows.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Tokenizer-free approximation of subword (BPE-style) tokenization.
///
/// Every maximal run of alphanumeric characters costs one token per four
/// characters (rounded up), every other non-whitespace character costs one
/// token, and whitespace is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

const CHARS_PER_TOKEN: usize = 4;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        let mut tokens = 0usize;
        let mut run = 0usize;
        for ch in text.chars() {
            if ch.is_alphanumeric() {
                run += 1;
                continue;
            }
            tokens += run.div_ceil(CHARS_PER_TOKEN);
            run = 0;
            if !ch.is_whitespace() {
                tokens += 1;
            }
        }
        tokens + run.div_ceil(CHARS_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_punctuation() {
        let t = HeuristicTokenCounter;
        assert_eq!(t.count(""), 0);
        assert_eq!(t.count("   \n\n"), 0);
        assert_eq!(t.count("word"), 1);
        assert_eq!(t.count("words"), 2);
        assert_eq!(t.count("This is a small document."), 8);
        assert_eq!(t.count("a,b"), 3);
    }

    #[test]
    fn never_decreases_as_text_grows() {
        let t = HeuristicTokenCounter;
        let text = "Ünïcode paragraphs, lines\nand  words: 12345 end.";
        let mut prev = 0;
        for (i, _) in text.char_indices().skip(1) {
            let n = t.count(&text[..i]);
            assert!(n >= prev, "count dropped at byte {i}");
            prev = n;
        }
        assert!(t.count(text) >= prev);
    }

    #[test]
    fn long_alphanumeric_runs_round_up() {
        let t = HeuristicTokenCounter;
        assert_eq!(t.count("abcdefgh"), 2);
        assert_eq!(t.count("abcdefghi"), 3);
        assert_eq!(t.count("abcdefghi."), 4);
    }
}

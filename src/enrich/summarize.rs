// src/enrich/summarize.rs
//! Local extractive summary: the first N words of the text.

pub const DEFAULT_WORD_LIMIT: usize = 100;

pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct FirstWords {
    pub word_limit: usize,
}

impl Default for FirstWords {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
        }
    }
}

impl FirstWords {
    pub fn new(word_limit: usize) -> Self {
        Self {
            word_limit: word_limit.max(1),
        }
    }
}

impl Summarizer for FirstWords {
    fn summarize(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.word_limit {
            return words.join(" ");
        }
        let mut out = words[..self.word_limit].join(" ");
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_kept() {
        assert_eq!(FirstWords::new(5).summarize("  one two  three "), "one two three");
        assert_eq!(FirstWords::default().summarize(""), "");
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        assert_eq!(FirstWords::new(3).summarize("a b c d e"), "a b c...");
    }
}

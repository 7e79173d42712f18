//! Word cursor shared by the phrase, sentence and jump parsers.

use thiserror::Error;

/// A parser expected one thing and found another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected '{expected}', found {}", describe(.found))]
pub struct Mismatch {
    pub expected: String,
    pub found: Option<String>,
}

fn describe(found: &Option<String>) -> String {
    match found {
        Some(word) => format!("'{word}'"),
        None => "end of sentence".to_string(),
    }
}

/// The words of one sentence. Commas become words of their own, the final
/// `.`, `!` or `?` is dropped, and every comparison ignores ASCII case.
#[derive(Debug, Clone)]
pub struct Words {
    tokens: Vec<String>,
    pos: usize,
}

impl Words {
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        let text = text.strip_suffix(['.', '!', '?']).unwrap_or(text);
        let mut tokens = Vec::new();
        for piece in text.split_whitespace() {
            match piece.strip_suffix(',') {
                Some(word) => {
                    if !word.is_empty() {
                        tokens.push(word.to_string());
                    }
                    tokens.push(",".to_string());
                }
                None => tokens.push(piece.to_string()),
            }
        }
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&str> {
        self.peek_at(0)
    }

    /// Look `offset` words past the cursor.
    pub fn peek_at(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset).map(String::as_str)
    }

    pub fn next_word(&mut self) -> Option<&str> {
        let word = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(word.as_str())
    }

    /// Consume `word` if it is next.
    pub fn eat(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|w| w.eq_ignore_ascii_case(word)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the space-separated words of `phrase` if they all come next.
    pub fn eat_phrase(&mut self, phrase: &str) -> bool {
        let len = self.matches_at(phrase, 0);
        if len > 0 {
            self.pos += len;
            true
        } else {
            false
        }
    }

    /// Number of words `phrase` would consume at `offset`, or 0.
    fn matches_at(&self, phrase: &str, offset: usize) -> usize {
        let mut len = 0;
        for word in phrase.split_whitespace() {
            match self.peek_at(offset + len) {
                Some(w) if w.eq_ignore_ascii_case(word) => len += 1,
                _ => return 0,
            }
        }
        len
    }

    pub fn expect(&mut self, word: &str) -> Result<(), Mismatch> {
        if self.eat(word) {
            Ok(())
        } else {
            Err(self.mismatch(word))
        }
    }

    /// Fail unless every word has been consumed.
    pub fn expect_end(&self) -> Result<(), Mismatch> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.mismatch("end of sentence")),
        }
    }

    /// A mismatch against whatever word is next.
    pub fn mismatch(&self, expected: &str) -> Mismatch {
        Mismatch {
            expected: expected.to_string(),
            found: self.peek().map(str::to_string),
        }
    }

    /// Consume the longest of `names` (each possibly several words) that
    /// comes next, returning it as given.
    pub fn eat_longest<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) -> Option<&'n str> {
        let (name, len) = names
            .into_iter()
            .map(|name| (name, self.matches_at(name, 0)))
            .filter(|(_, len)| *len > 0)
            .max_by_key(|(_, len)| *len)?;
        self.pos += len;
        Some(name)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

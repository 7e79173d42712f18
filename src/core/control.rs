//! Jumps, conditional markers and act/scene numerals.

use thiserror::Error;

use crate::core::lexicon::Lexicon;
use crate::core::words::{Mismatch, Words};
use crate::schema::statement::JumpTarget;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("no numeral for {0}; the lexicon counts to {1}")]
    NumeralOutOfRange(usize, usize),
    #[error("'{0}' is not a numeral")]
    UnknownNumeral(String),
    #[error(transparent)]
    Mismatch(#[from] Mismatch),
}

const PROCEED: &str = "let us proceed to";
const RETURN: &str = "let us return to";

/// Writes and reads control-flow sentences using the lexicon's numerals.
#[derive(Debug, Clone, Copy)]
pub struct ControlFlow<'a> {
    numerals: &'a [String],
}

impl<'a> ControlFlow<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            numerals: &lexicon.numerals,
        }
    }

    /// The numeral for a 1-based position.
    pub fn numeral(&self, n: usize) -> Result<&'a str, ControlError> {
        n.checked_sub(1)
            .and_then(|i| self.numerals.get(i))
            .map(String::as_str)
            .ok_or(ControlError::NumeralOutOfRange(n, self.numerals.len()))
    }

    /// The 1-based position a numeral stands for, ignoring case.
    pub fn parse_numeral(&self, word: &str) -> Result<usize, ControlError> {
        self.numerals
            .iter()
            .position(|n| n.eq_ignore_ascii_case(word))
            .map(|i| i + 1)
            .ok_or_else(|| ControlError::UnknownNumeral(word.to_string()))
    }

    pub fn compose_jump(&self, target: &JumpTarget) -> Result<String, ControlError> {
        let scene = self.numeral(target.scene)?;
        Ok(match target.act {
            Some(act) => format!("Let us proceed to act {}, scene {}.", self.numeral(act)?, scene),
            None => format!("Let us proceed to scene {}.", scene),
        })
    }

    /// Read "let us proceed to [act N,] scene M" (or "return to"). Returns
    /// `Ok(None)` without consuming anything when the words are no jump.
    pub fn read_jump(&self, words: &mut Words) -> Result<Option<JumpTarget>, ControlError> {
        if !words.eat_phrase(PROCEED) && !words.eat_phrase(RETURN) {
            return Ok(None);
        }
        let act = if words.eat("act") {
            let act = self.read_numeral(words)?;
            words.expect(",")?;
            Some(act)
        } else {
            None
        };
        words.expect("scene")?;
        let scene = self.read_numeral(words)?;
        Ok(Some(JumpTarget { act, scene }))
    }

    fn read_numeral(&self, words: &mut Words) -> Result<usize, ControlError> {
        match words.next_word() {
            Some(word) => self.parse_numeral(word),
            None => Err(words.mismatch("numeral").into()),
        }
    }

    /// The words opening a conditional.
    pub fn marker(polarity: bool) -> &'static str {
        if polarity {
            "If so,"
        } else {
            "If not,"
        }
    }

    /// Consume "if so ," or "if not ," and return the polarity.
    pub fn read_marker(words: &mut Words) -> Option<bool> {
        let polarity = match (words.peek_at(0), words.peek_at(1), words.peek_at(2)) {
            (Some(i), Some(p), Some(",")) if i.eq_ignore_ascii_case("if") => {
                if p.eq_ignore_ascii_case("so") {
                    true
                } else if p.eq_ignore_ascii_case("not") {
                    false
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        for _ in 0..3 {
            words.next_word();
        }
        Some(polarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerals_are_one_based() {
        let lexicon = Lexicon::standard();
        let control = ControlFlow::new(&lexicon);
        assert_eq!(control.numeral(1).unwrap(), "I");
        assert_eq!(control.numeral(14).unwrap(), "XIV");
        assert_eq!(control.numeral(0), Err(ControlError::NumeralOutOfRange(0, 30)));
        assert_eq!(control.numeral(31), Err(ControlError::NumeralOutOfRange(31, 30)));
        assert_eq!(control.parse_numeral("iv").unwrap(), 4);
        assert_eq!(
            control.parse_numeral("IIII"),
            Err(ControlError::UnknownNumeral("IIII".to_string()))
        );
    }

    #[test]
    fn jumps_compose_and_read() {
        let lexicon = Lexicon::standard();
        let control = ControlFlow::new(&lexicon);
        let local = JumpTarget::scene(2);
        let far = JumpTarget::act_scene(1, 3);
        assert_eq!(control.compose_jump(&local).unwrap(), "Let us proceed to scene II.");
        assert_eq!(control.compose_jump(&far).unwrap(), "Let us proceed to act I, scene III.");
        for target in [local, far] {
            let mut words = Words::new(&control.compose_jump(&target).unwrap());
            assert_eq!(control.read_jump(&mut words).unwrap(), Some(target));
            assert!(words.is_empty());
        }
    }

    #[test]
    fn return_reads_like_proceed() {
        let lexicon = Lexicon::standard();
        let control = ControlFlow::new(&lexicon);
        let mut words = Words::new("Let us return to scene III!");
        assert_eq!(control.read_jump(&mut words).unwrap(), Some(JumpTarget::scene(3)));
    }

    #[test]
    fn non_jumps_are_left_alone() {
        let lexicon = Lexicon::standard();
        let control = ControlFlow::new(&lexicon);
        let mut words = Words::new("Let us speak.");
        assert_eq!(control.read_jump(&mut words).unwrap(), None);
        assert_eq!(words.peek(), Some("Let"));
        let mut words = Words::new("Let us proceed to scene CM.");
        assert!(matches!(
            control.read_jump(&mut words),
            Err(ControlError::UnknownNumeral(n)) if n == "CM"
        ));
    }

    #[test]
    fn markers() {
        let mut words = Words::new("If not, speak your mind!");
        assert_eq!(ControlFlow::read_marker(&mut words), Some(false));
        assert_eq!(words.peek(), Some("speak"));
        let mut words = Words::new("If you are better");
        assert_eq!(ControlFlow::read_marker(&mut words), None);
        assert_eq!(ControlFlow::marker(true), "If so,");
    }
}

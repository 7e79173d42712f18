use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{BinaryOp, UnaryOp};

/// A value in prose form.
///
/// A noun counts as +1 or -1 by its polarity and each adjective in front of
/// it doubles it. Operator phrases nest one or two sub-phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NounPhrase {
    /// The zero phrase, "nothing".
    Nothing,
    Noun {
        adjectives: Vec<String>,
        noun: String,
    },
    /// A personal pronoun, exactly as written ("me", "yourself", "thee").
    Pronoun(String),
    /// A character's proper name.
    Name(String),
    Binary {
        op: BinaryOp,
        lhs: Box<NounPhrase>,
        rhs: Box<NounPhrase>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<NounPhrase>,
    },
    /// "twice X", the product of the literal two and X.
    Twice(Box<NounPhrase>),
}

impl BinaryOp {
    /// The words introducing this operator, up to the first operand.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Add => "the sum of",
            Self::Sub => "the difference between",
            Self::Mul => "the product of",
            Self::Div => "the quotient between",
            Self::Rem => "the remainder of the quotient between",
        }
    }
}

impl UnaryOp {
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Square => "the square of",
            Self::Cube => "the cube of",
            Self::SquareRoot => "the square root of",
            Self::Factorial => "the factorial of",
        }
    }
}

impl NounPhrase {
    pub fn noun(adjectives: &[&str], noun: &str) -> Self {
        Self::Noun {
            adjectives: adjectives.iter().map(|a| a.to_string()).collect(),
            noun: noun.to_string(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: NounPhrase, rhs: NounPhrase) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// Words whose first letter misleads about their first sound.
const SILENT_H: [&str; 4] = ["honest", "honor", "honour", "hour"];
const CONSONANT_VOWEL: [&str; 5] = ["one", "uni", "use", "usu", "eu"];

/// The indefinite article by sound, as far as the spelling tells it.
fn article_for(word: &str) -> &'static str {
    let word = word.to_lowercase();
    if SILENT_H.iter().any(|prefix| word.starts_with(prefix)) {
        return "an";
    }
    if CONSONANT_VOWEL.iter().any(|prefix| word.starts_with(prefix)) {
        return "a";
    }
    match word.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

impl fmt::Display for NounPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("nothing"),
            Self::Noun { adjectives, noun } => {
                let first = adjectives.first().unwrap_or(noun);
                write!(f, "{}", article_for(first))?;
                for adjective in adjectives {
                    write!(f, " {}", adjective)?;
                }
                write!(f, " {}", noun)
            }
            Self::Pronoun(word) | Self::Name(word) => f.write_str(word),
            Self::Binary { op, lhs, rhs } => write!(f, "{} {} and {}", op.phrase(), lhs, rhs),
            Self::Unary { op, operand } => write!(f, "{} {}", op.phrase(), operand),
            Self::Twice(operand) => write!(f, "twice {}", operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_articles() {
        assert_eq!(NounPhrase::noun(&[], "cat").to_string(), "a cat");
        assert_eq!(NounPhrase::noun(&["old", "big"], "cat").to_string(), "an old big cat");
        assert_eq!(NounPhrase::noun(&[], "angel").to_string(), "an angel");
    }

    #[test]
    fn articles_follow_sound() {
        assert_eq!(NounPhrase::noun(&["honest"], "cat").to_string(), "an honest cat");
        assert_eq!(NounPhrase::noun(&["Hour"], "cat").to_string(), "an Hour cat");
        assert_eq!(NounPhrase::noun(&["happy"], "horse").to_string(), "a happy horse");
        assert_eq!(NounPhrase::noun(&[], "unicorn").to_string(), "a unicorn");
        assert_eq!(NounPhrase::noun(&["useful"], "cat").to_string(), "a useful cat");
        assert_eq!(NounPhrase::noun(&[], "uncle").to_string(), "an uncle");
    }

    #[test]
    fn renders_nested_operators() {
        let phrase = NounPhrase::binary(
            BinaryOp::Rem,
            NounPhrase::Twice(Box::new(NounPhrase::Name("Juliet".to_string()))),
            NounPhrase::Unary {
                op: UnaryOp::SquareRoot,
                operand: Box::new(NounPhrase::Pronoun("me".to_string())),
            },
        );
        assert_eq!(
            phrase.to_string(),
            "the remainder of the quotient between twice Juliet and the square root of me"
        );
    }
}

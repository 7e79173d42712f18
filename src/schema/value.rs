use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a character in structured form (`romeo`, `lady_macbeth`, `x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A reference to one of the two conversation partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The character currently speaking.
    Speaker,
    /// The one other character on stage.
    Addressee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Square,
    Cube,
    SquareRoot,
    Factorial,
}

/// Failure of a single arithmetic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("square root of a negative number")]
    NegativeRoot,
    #[error("factorial of a negative number")]
    NegativeFactorial,
}

impl BinaryOp {
    /// Apply the operator. Division and remainder truncate toward zero.
    pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ArithmeticError> {
        let result = match self {
            Self::Add => lhs.checked_add(rhs),
            Self::Sub => lhs.checked_sub(rhs),
            Self::Mul => lhs.checked_mul(rhs),
            Self::Div | Self::Rem if rhs == 0 => return Err(ArithmeticError::DivisionByZero),
            Self::Div => lhs.checked_div(rhs),
            Self::Rem => lhs.checked_rem(rhs),
        };
        result.ok_or(ArithmeticError::Overflow)
    }
}

impl UnaryOp {
    pub fn apply(self, operand: i64) -> Result<i64, ArithmeticError> {
        match self {
            Self::Square => operand.checked_mul(operand).ok_or(ArithmeticError::Overflow),
            Self::Cube => operand
                .checked_mul(operand)
                .and_then(|sq| sq.checked_mul(operand))
                .ok_or(ArithmeticError::Overflow),
            Self::SquareRoot => {
                if operand < 0 {
                    return Err(ArithmeticError::NegativeRoot);
                }
                Ok(integer_sqrt(operand))
            }
            Self::Factorial => {
                if operand < 0 {
                    return Err(ArithmeticError::NegativeFactorial);
                }
                (2..=operand).try_fold(1i64, |acc, k| acc.checked_mul(k).ok_or(ArithmeticError::Overflow))
            }
        }
    }
}

/// Floor of the square root, exact for every non-negative `i64`.
fn integer_sqrt(n: i64) -> i64 {
    let mut root = (n as f64).sqrt() as i64;
    while root > 0 && root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}

/// A value in structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticValue {
    Constant(i64),
    Binary {
        op: BinaryOp,
        lhs: Box<SemanticValue>,
        rhs: Box<SemanticValue>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<SemanticValue>,
    },
    /// The current value of a named character.
    Character(Ident),
    Role(Role),
}

impl SemanticValue {
    pub fn binary(op: BinaryOp, lhs: SemanticValue, rhs: SemanticValue) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: SemanticValue) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn character(name: &str) -> Self {
        Self::Character(Ident::new(name))
    }

    /// Rewrite every `Character(id)` equal to `speaker` into `Role(Speaker)`.
    pub fn with_speaker_as_role(&self, speaker: &Ident) -> SemanticValue {
        match self {
            Self::Character(id) if id == speaker => Self::Role(Role::Speaker),
            Self::Binary { op, lhs, rhs } => Self::binary(
                *op,
                lhs.with_speaker_as_role(speaker),
                rhs.with_speaker_as_role(speaker),
            ),
            Self::Unary { op, operand } => Self::unary(*op, operand.with_speaker_as_role(speaker)),
            other => other.clone(),
        }
    }
}

impl From<i64> for SemanticValue {
    fn from(n: i64) -> Self {
        Self::Constant(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_ops_truncate_toward_zero() {
        assert_eq!(BinaryOp::Div.apply(-7, 2), Ok(-3));
        assert_eq!(BinaryOp::Rem.apply(-7, 2), Ok(-1));
        assert_eq!(BinaryOp::Div.apply(7, 0), Err(ArithmeticError::DivisionByZero));
        assert_eq!(BinaryOp::Rem.apply(7, 0), Err(ArithmeticError::DivisionByZero));
        assert_eq!(BinaryOp::Add.apply(i64::MAX, 1), Err(ArithmeticError::Overflow));
    }

    #[test]
    fn unary_ops() {
        assert_eq!(UnaryOp::Square.apply(-3), Ok(9));
        assert_eq!(UnaryOp::Cube.apply(-3), Ok(-27));
        assert_eq!(UnaryOp::SquareRoot.apply(17), Ok(4));
        assert_eq!(UnaryOp::SquareRoot.apply(i64::MAX), Ok(3_037_000_499));
        assert_eq!(UnaryOp::SquareRoot.apply(-1), Err(ArithmeticError::NegativeRoot));
        assert_eq!(UnaryOp::Factorial.apply(0), Ok(1));
        assert_eq!(UnaryOp::Factorial.apply(5), Ok(120));
        assert_eq!(UnaryOp::Factorial.apply(30), Err(ArithmeticError::Overflow));
    }

    #[test]
    fn speaker_becomes_role() {
        let v = SemanticValue::binary(
            BinaryOp::Add,
            SemanticValue::character("romeo"),
            SemanticValue::character("juliet"),
        );
        let rewritten = v.with_speaker_as_role(&Ident::from("romeo"));
        assert_eq!(
            rewritten,
            SemanticValue::binary(
                BinaryOp::Add,
                SemanticValue::Role(Role::Speaker),
                SemanticValue::character("juliet"),
            )
        );
    }
}

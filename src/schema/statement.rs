use serde::{Deserialize, Serialize};

use super::value::{Ident, SemanticValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Equal,
    Greater,
    Less,
}

impl Relation {
    /// Whether `lhs` stands in this relation to `rhs`.
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Equal => lhs == rhs,
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
        }
    }
}

/// A two-operand comparison. Setting `negated` inverts the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub relation: Relation,
    pub negated: bool,
    pub lhs: SemanticValue,
    pub rhs: SemanticValue,
}


/// Destination of a jump, both numbers 1-based. Without an act the target
/// scene lies in the act containing the jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JumpTarget {
    pub act: Option<usize>,
    pub scene: usize,
}

impl JumpTarget {
    pub fn scene(scene: usize) -> Self {
        Self { act: None, scene }
    }

    pub fn act_scene(act: usize, scene: usize) -> Self {
        Self {
            act: Some(act),
            scene,
        }
    }
}

/// What an input or output statement transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// One Unicode scalar value.
    Character,
    /// A decimal integer.
    Integer,
}

/// One statement spoken by a character. Statements act on the addressee
/// unless noted otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// Set the addressee's value.
    Assign(SemanticValue),
    /// Evaluate a comparison into the global flag.
    Compare(Comparison),
    /// Run `body` if the global flag equals `polarity`.
    Conditional {
        polarity: bool,
        body: Box<Statement>,
    },
    Jump(JumpTarget),
    /// Read into the addressee's value.
    Input(Channel),
    /// Write the addressee's value.
    Output(Channel),
    /// Push a value onto the addressee's stack.
    Remember(SemanticValue),
    /// Pop the addressee's stack into its value.
    Recall,
}

impl Statement {
    pub fn conditional(polarity: bool, body: Statement) -> Self {
        Self::Conditional {
            polarity,
            body: Box::new(body),
        }
    }
}

/// A change to who is on stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageDirection {
    Enter(Vec<Ident>),
    Exit(Ident),
    /// Several characters leave; an empty list clears the stage.
    Exeunt(Vec<Ident>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations() {
        assert!(Relation::Greater.holds(3, 2));
        assert!(!Relation::Greater.holds(2, 2));
        assert!(Relation::Less.holds(-3, 2));
        assert!(Relation::Equal.holds(2, 2));
        assert!(!Relation::Equal.holds(2, -2));
    }
}

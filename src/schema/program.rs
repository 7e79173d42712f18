use serde::{Deserialize, Serialize};

use super::statement::{StageDirection, Statement};
use super::value::Ident;

/// A program in structured form.
///
/// Free text (title and descriptions) may mention characters through
/// `{ident}` placeholders; `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub title: String,
    pub characters: Vec<Declaration>,
    pub acts: Vec<Act>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: Ident,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub description: String,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub description: String,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Line {
    Direction(StageDirection),
    Speech {
        speaker: Ident,
        statements: Vec<Statement>,
    },
}

/// Location of a statement inside a scene: line index, then statement index
/// within that line's speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementRef {
    pub line: usize,
    pub statement: usize,
}

/// A conditional paired with the comparison that decides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub conditional: StatementRef,
    /// The nearest preceding comparison in the same scene, if any.
    pub comparison: Option<StatementRef>,
}

impl Scene {
    /// Iterate over every statement with its location, in program order.
    pub fn statements(&self) -> impl Iterator<Item = (StatementRef, &Statement)> + '_ {
        self.lines.iter().enumerate().flat_map(|(line, l)| {
            let statements: &[Statement] = match l {
                Line::Speech { statements, .. } => statements,
                Line::Direction(_) => &[],
            };
            statements
                .iter()
                .enumerate()
                .map(move |(statement, s)| (StatementRef { line, statement }, s))
        })
    }

    /// Pair every conditional with the nearest comparison before it.
    pub fn guards(&self) -> Vec<Guard> {
        let mut last_comparison = None;
        let mut guards = Vec::new();
        for (at, statement) in self.statements() {
            match statement {
                Statement::Compare(_) => last_comparison = Some(at),
                Statement::Conditional { .. } => guards.push(Guard {
                    conditional: at,
                    comparison: last_comparison,
                }),
                _ => {}
            }
        }
        guards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::statement::{Comparison, JumpTarget, Relation};
    use crate::schema::value::{Role, SemanticValue};

    fn compare() -> Statement {
        Statement::Compare(Comparison {
            relation: Relation::Equal,
            negated: false,
            lhs: SemanticValue::Role(Role::Addressee),
            rhs: SemanticValue::Constant(0),
        })
    }

    #[test]
    fn guards_pair_with_nearest_comparison() {
        let scene = Scene {
            description: "Loop.".to_string(),
            lines: vec![
                Line::Speech {
                    speaker: Ident::from("a"),
                    statements: vec![Statement::conditional(true, Statement::Recall)],
                },
                Line::Direction(StageDirection::Exeunt(vec![])),
                Line::Speech {
                    speaker: Ident::from("b"),
                    statements: vec![compare(), Statement::Recall, compare()],
                },
                Line::Speech {
                    speaker: Ident::from("a"),
                    statements: vec![
                        Statement::conditional(false, Statement::Jump(JumpTarget::scene(1))),
                        Statement::conditional(true, Statement::Recall),
                    ],
                },
            ],
        };
        let guards = scene.guards();
        assert_eq!(guards.len(), 3);
        assert_eq!(guards[0].comparison, None);
        let nearest = Some(StatementRef { line: 2, statement: 2 });
        assert_eq!(guards[1].comparison, nearest);
        assert_eq!(guards[2].comparison, nearest);
        assert_eq!(guards[2].conditional, StatementRef { line: 3, statement: 1 });
    }
}

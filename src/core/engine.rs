//! Execution engine.
//!
//! [`compile`] flattens a [`Program`] into one arena of [`Operation`]
//! records, with character identifiers resolved to indices and jump targets
//! to absolute scenes. [`Engine`] walks the arena, reading live state on
//! every operation, so a scene revisited by a jump sees current values.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::core::console::Console;
use crate::schema::program::{Line, Program};
use crate::schema::statement::{Channel, Comparison, Relation, StageDirection, Statement};
use crate::schema::value::{ArithmeticError, BinaryOp, Ident, Role, SemanticValue, UnaryOp};

/// A 1-based act and scene, for error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub act: usize,
    pub scene: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "act {}, scene {}", self.act, self.scene)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("character '{0}' is declared twice")]
    DuplicateCharacter(Ident),
    #[error("{at}: character '{ident}' is not declared")]
    UnknownCharacter { at: Location, ident: Ident },
    #[error("{at}: jump to act {target}, which does not exist")]
    MissingAct { at: Location, target: usize },
    #[error("{at}: jump to scene {target} of act {act}, which does not exist")]
    MissingScene { at: Location, act: usize, target: usize },
    #[error("{at}: a conditional cannot guard another conditional")]
    NestedConditional { at: Location },
}

/// An expression with every reference resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operand {
    Constant(i64),
    Binary {
        op: BinaryOp,
        lhs: Box<Operand>,
        rhs: Box<Operand>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Operand>,
    },
    Character(usize),
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    Enter(Vec<usize>),
    Exit(usize),
    /// An empty list clears the stage.
    Exeunt(Vec<usize>),
    Assign(Operand),
    Compare {
        relation: Relation,
        negated: bool,
        lhs: Operand,
        rhs: Operand,
    },
    /// Absolute, 0-based act and scene.
    Jump { act: usize, scene: usize },
    Input(Channel),
    Output(Channel),
    Remember(Operand),
    Recall,
}

/// One compiled statement or stage direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// The character speaking; `None` for stage directions.
    pub speaker: Option<usize>,
    /// Run only when the comparison flag equals this.
    pub guard: Option<bool>,
    pub action: Action,
}

/// Half-open range of a scene's operations in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compiled {
    pub characters: Vec<Ident>,
    pub operations: Vec<Operation>,
    /// For every act, the span of each of its scenes.
    pub acts: Vec<Vec<Span>>,
}

impl Compiled {
    pub fn character(&self, ident: &Ident) -> Option<usize> {
        self.characters.iter().position(|c| c == ident)
    }
}

struct Compiler<'p> {
    program: &'p Program,
    index: FxHashMap<&'p Ident, usize>,
    errors: Vec<CompileError>,
    at: Location,
}

/// Compile a program, reporting every problem found rather than the first.
pub fn compile(program: &Program) -> Result<Compiled, Vec<CompileError>> {
    let mut compiler = Compiler {
        program,
        index: FxHashMap::default(),
        errors: Vec::new(),
        at: Location { act: 0, scene: 0 },
    };
    let mut characters = Vec::with_capacity(program.characters.len());
    for declaration in &program.characters {
        if compiler.index.contains_key(&declaration.id) {
            compiler
                .errors
                .push(CompileError::DuplicateCharacter(declaration.id.clone()));
            continue;
        }
        compiler.index.insert(&declaration.id, characters.len());
        characters.push(declaration.id.clone());
    }

    let mut operations = Vec::new();
    let mut acts = Vec::with_capacity(program.acts.len());
    for (a, act) in program.acts.iter().enumerate() {
        let mut spans = Vec::with_capacity(act.scenes.len());
        for (s, scene) in act.scenes.iter().enumerate() {
            compiler.at = Location {
                act: a + 1,
                scene: s + 1,
            };
            let start = operations.len();
            for line in &scene.lines {
                compiler.line(line, &mut operations);
            }
            spans.push(Span {
                start,
                end: operations.len(),
            });
        }
        acts.push(spans);
    }

    if compiler.errors.is_empty() {
        tracing::debug!(
            characters = characters.len(),
            operations = operations.len(),
            "compiled program"
        );
        Ok(Compiled {
            characters,
            operations,
            acts,
        })
    } else {
        Err(compiler.errors)
    }
}

impl<'p> Compiler<'p> {
    fn character(&mut self, ident: &Ident) -> usize {
        match self.index.get(ident) {
            Some(&i) => i,
            None => {
                self.errors.push(CompileError::UnknownCharacter {
                    at: self.at,
                    ident: ident.clone(),
                });
                usize::MAX
            }
        }
    }

    fn line(&mut self, line: &Line, out: &mut Vec<Operation>) {
        match line {
            Line::Direction(direction) => {
                let action = match direction {
                    StageDirection::Enter(idents) => Action::Enter(self.characters(idents)),
                    StageDirection::Exit(ident) => Action::Exit(self.character(ident)),
                    StageDirection::Exeunt(idents) => Action::Exeunt(self.characters(idents)),
                };
                out.push(Operation {
                    speaker: None,
                    guard: None,
                    action,
                });
            }
            Line::Speech {
                speaker,
                statements,
            } => {
                let speaker = self.character(speaker);
                for statement in statements {
                    let (guard, statement) = match statement {
                        Statement::Conditional { polarity, body } => (Some(*polarity), &**body),
                        other => (None, other),
                    };
                    if let Some(action) = self.action(statement) {
                        out.push(Operation {
                            speaker: Some(speaker),
                            guard,
                            action,
                        });
                    }
                }
            }
        }
    }

    fn characters(&mut self, idents: &[Ident]) -> Vec<usize> {
        idents.iter().map(|ident| self.character(ident)).collect()
    }

    fn action(&mut self, statement: &Statement) -> Option<Action> {
        Some(match statement {
            Statement::Assign(value) => Action::Assign(self.operand(value)),
            Statement::Compare(Comparison {
                relation,
                negated,
                lhs,
                rhs,
            }) => Action::Compare {
                relation: *relation,
                negated: *negated,
                lhs: self.operand(lhs),
                rhs: self.operand(rhs),
            },
            Statement::Conditional { .. } => {
                self.errors
                    .push(CompileError::NestedConditional { at: self.at });
                return None;
            }
            Statement::Jump(target) => {
                let act = match target.act {
                    Some(act) => act.checked_sub(1),
                    None => Some(self.at.act - 1),
                };
                let Some(act) = act.filter(|&a| a < self.program.acts.len()) else {
                    self.errors.push(CompileError::MissingAct {
                        at: self.at,
                        target: target.act.unwrap_or(self.at.act),
                    });
                    return None;
                };
                let scene = target.scene.checked_sub(1);
                let Some(scene) = scene.filter(|&s| s < self.program.acts[act].scenes.len()) else {
                    self.errors.push(CompileError::MissingScene {
                        at: self.at,
                        act: act + 1,
                        target: target.scene,
                    });
                    return None;
                };
                Action::Jump { act, scene }
            }
            Statement::Input(channel) => Action::Input(*channel),
            Statement::Output(channel) => Action::Output(*channel),
            Statement::Remember(value) => Action::Remember(self.operand(value)),
            Statement::Recall => Action::Recall,
        })
    }

    fn operand(&mut self, value: &SemanticValue) -> Operand {
        match value {
            SemanticValue::Constant(n) => Operand::Constant(*n),
            SemanticValue::Binary { op, lhs, rhs } => Operand::Binary {
                op: *op,
                lhs: Box::new(self.operand(lhs)),
                rhs: Box::new(self.operand(rhs)),
            },
            SemanticValue::Unary { op, operand } => Operand::Unary {
                op: *op,
                operand: Box::new(self.operand(operand)),
            },
            SemanticValue::Character(ident) => Operand::Character(self.character(ident)),
            SemanticValue::Role(role) => Operand::Role(*role),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0} is already on stage")]
    AlreadyOnStage(Ident),
    #[error("{0} is not on stage")]
    NotOnStage(Ident),
    #[error("{0} has nobody to talk to")]
    NoAddressee(Ident),
    #[error("{speaker} is on stage with {others} others; the addressee is ambiguous")]
    AmbiguousAddressee { speaker: Ident, others: usize },
    #[error("a conditional ran before any comparison")]
    FlagUnset,
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("square root of a negative number")]
    NegativeRoot,
    #[error("factorial of a negative number")]
    NegativeFactorial,
    #[error("{0} has an empty stack")]
    EmptyStack(Ident),
    #[error("{0} has no value yet")]
    UnsetValue(Ident),
    #[error("{0} is not a character code")]
    InvalidCharacterOutput(i64),
    #[error("character input must be exactly one character, got {0:?}")]
    InvalidCharacterInput(String),
    #[error("integer input {0:?} is not a number")]
    InvalidIntegerInput(String),
    #[error("console error: {0}")]
    Io(#[from] std::io::Error),
    #[error("the performance is already over")]
    Halted,
}

impl From<ArithmeticError> for RuntimeError {
    fn from(e: ArithmeticError) -> Self {
        match e {
            ArithmeticError::DivisionByZero => Self::DivisionByZero,
            ArithmeticError::Overflow => Self::Overflow,
            ArithmeticError::NegativeRoot => Self::NegativeRoot,
            ArithmeticError::NegativeFactorial => Self::NegativeFactorial,
        }
    }
}

/// Where the engine is: 0-based act, scene and operation within the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub act: usize,
    pub scene: usize,
    pub line: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "act {}, scene {}, line {}",
            self.act + 1,
            self.scene + 1,
            self.line + 1
        )
    }
}

/// A runtime error and where it stopped the run.
#[derive(Debug, Error)]
#[error("{position}: {error}")]
pub struct Fault {
    pub position: Position,
    #[source]
    pub error: RuntimeError,
}

/// Per-character state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    pub value: Option<i64>,
    pub stack: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ready,
    Running,
    Finished,
    Failed,
}

enum Flow {
    Next,
    Jump { act: usize, scene: usize },
}

/// One performance of a compiled program.
pub struct Engine<'p, 'c, C: Console> {
    program: &'p Compiled,
    console: &'c mut C,
    memory: Vec<Memory>,
    /// Characters on stage, in order of entrance.
    stage: Vec<usize>,
    flag: Option<bool>,
    position: Position,
    status: Status,
}

impl<'p, 'c, C: Console> Engine<'p, 'c, C> {
    pub fn new(program: &'p Compiled, console: &'c mut C) -> Self {
        Self {
            program,
            console,
            memory: vec![Memory::default(); program.characters.len()],
            stage: Vec::new(),
            flag: None,
            position: Position::default(),
            status: Status::Ready,
        }
    }

    /// Run to the end of the program or the first runtime error.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.step()? {}
        Ok(())
    }

    /// Execute one operation. Returns `false` once the program has ended.
    pub fn step(&mut self) -> Result<bool, Fault> {
        match self.status {
            Status::Finished | Status::Failed => return Err(self.fault(RuntimeError::Halted)),
            Status::Ready => {
                self.status = Status::Running;
                if let Err(e) = self.console.clear() {
                    return Err(self.fail(e.into()));
                }
            }
            Status::Running => {}
        }

        let Some(index) = self.settle() else {
            tracing::debug!("performance finished");
            self.status = Status::Finished;
            return Ok(false);
        };
        let program = self.program;
        let operation = &program.operations[index];
        tracing::trace!(position = %self.position, ?operation, "executing");
        match self.execute(operation) {
            Ok(Flow::Next) => self.position.line += 1,
            Ok(Flow::Jump { act, scene }) => {
                tracing::debug!(from = %self.position, act = act + 1, scene = scene + 1, "jump");
                self.position = Position {
                    act,
                    scene,
                    line: 0,
                };
            }
            Err(error) => return Err(self.fail(error)),
        }
        if self.console.debug() {
            let report = self.report(operation);
            if let Err(e) = self.console.print_debug(&report) {
                return Err(self.fail(e.into()));
            }
        }
        Ok(true)
    }

    /// Move past exhausted scenes and acts; the arena index of the next
    /// operation, or `None` at the end of the program.
    fn settle(&mut self) -> Option<usize> {
        loop {
            let scenes = self.program.acts.get(self.position.act)?;
            match scenes.get(self.position.scene) {
                Some(span) if self.position.line < span.len() => {
                    return Some(span.start + self.position.line);
                }
                Some(_) => {
                    self.position.scene += 1;
                    self.position.line = 0;
                }
                None => {
                    self.position.act += 1;
                    self.position.scene = 0;
                    self.position.line = 0;
                }
            }
        }
    }

    fn fault(&self, error: RuntimeError) -> Fault {
        Fault {
            position: self.position,
            error,
        }
    }

    fn fail(&mut self, error: RuntimeError) -> Fault {
        tracing::debug!(position = %self.position, %error, "performance failed");
        self.status = Status::Failed;
        self.fault(error)
    }

    fn report(&self, operation: &Operation) -> String {
        let stage: Vec<&str> = self
            .stage
            .iter()
            .map(|&c| self.program.characters[c].as_str())
            .collect();
        format!(
            "{:?} | stage: [{}] | flag: {:?}",
            operation.action,
            stage.join(", "),
            self.flag
        )
    }

    fn name(&self, character: usize) -> Ident {
        self.program.characters[character].clone()
    }

    fn execute(&mut self, operation: &Operation) -> Result<Flow, RuntimeError> {
        if let Some(polarity) = operation.guard {
            if self.flag.ok_or(RuntimeError::FlagUnset)? != polarity {
                return Ok(Flow::Next);
            }
        }
        let speaker = match operation.speaker {
            Some(speaker) => {
                if !self.stage.contains(&speaker) {
                    return Err(RuntimeError::NotOnStage(self.name(speaker)));
                }
                speaker
            }
            None => return self.direct(&operation.action).map(|()| Flow::Next),
        };

        match &operation.action {
            Action::Enter(_) | Action::Exit(_) | Action::Exeunt(_) => {
                self.direct(&operation.action)?;
            }
            Action::Assign(value) => {
                let value = self.evaluate(value, speaker)?;
                let addressee = self.addressee(speaker)?;
                self.memory[addressee].value = Some(value);
            }
            Action::Compare {
                relation,
                negated,
                lhs,
                rhs,
            } => {
                let lhs = self.evaluate(lhs, speaker)?;
                let rhs = self.evaluate(rhs, speaker)?;
                self.flag = Some(relation.holds(lhs, rhs) != *negated);
            }
            Action::Jump { act, scene } => {
                return Ok(Flow::Jump {
                    act: *act,
                    scene: *scene,
                })
            }
            Action::Input(channel) => {
                let addressee = self.addressee(speaker)?;
                let value = match channel {
                    Channel::Character => {
                        let input = self.console.read_char()?;
                        let mut chars = input.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => i64::from(u32::from(c)),
                            _ => return Err(RuntimeError::InvalidCharacterInput(input)),
                        }
                    }
                    Channel::Integer => {
                        let input = self.console.read_int()?;
                        input
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| RuntimeError::InvalidIntegerInput(input))?
                    }
                };
                self.memory[addressee].value = Some(value);
            }
            Action::Output(channel) => {
                let addressee = self.addressee(speaker)?;
                let value = self.value(addressee)?;
                let text = match channel {
                    Channel::Character => u32::try_from(value)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or(RuntimeError::InvalidCharacterOutput(value))?
                        .to_string(),
                    Channel::Integer => value.to_string(),
                };
                self.console.print(&text)?;
            }
            Action::Remember(value) => {
                let value = self.evaluate(value, speaker)?;
                let addressee = self.addressee(speaker)?;
                self.memory[addressee].stack.push(value);
            }
            Action::Recall => {
                let addressee = self.addressee(speaker)?;
                let value = self.memory[addressee]
                    .stack
                    .pop()
                    .ok_or_else(|| RuntimeError::EmptyStack(self.name(addressee)))?;
                self.memory[addressee].value = Some(value);
            }
        }
        Ok(Flow::Next)
    }

    /// Apply a stage direction.
    fn direct(&mut self, action: &Action) -> Result<(), RuntimeError> {
        match action {
            Action::Enter(characters) => {
                for &c in characters {
                    if self.stage.contains(&c) {
                        return Err(RuntimeError::AlreadyOnStage(self.name(c)));
                    }
                    self.stage.push(c);
                }
            }
            Action::Exit(c) => self.leave(*c)?,
            Action::Exeunt(characters) if characters.is_empty() => self.stage.clear(),
            Action::Exeunt(characters) => {
                for &c in characters {
                    self.leave(c)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn leave(&mut self, character: usize) -> Result<(), RuntimeError> {
        let at = self
            .stage
            .iter()
            .position(|&c| c == character)
            .ok_or_else(|| RuntimeError::NotOnStage(self.name(character)))?;
        self.stage.remove(at);
        Ok(())
    }

    /// The only other character on stage.
    fn addressee(&self, speaker: usize) -> Result<usize, RuntimeError> {
        let mut others = self.stage.iter().copied().filter(|&c| c != speaker);
        match (others.next(), others.count()) {
            (Some(addressee), 0) => Ok(addressee),
            (None, _) => Err(RuntimeError::NoAddressee(self.name(speaker))),
            (Some(_), rest) => Err(RuntimeError::AmbiguousAddressee {
                speaker: self.name(speaker),
                others: rest + 1,
            }),
        }
    }

    fn value(&self, character: usize) -> Result<i64, RuntimeError> {
        self.memory[character]
            .value
            .ok_or_else(|| RuntimeError::UnsetValue(self.name(character)))
    }

    fn evaluate(&self, operand: &Operand, speaker: usize) -> Result<i64, RuntimeError> {
        match operand {
            Operand::Constant(n) => Ok(*n),
            Operand::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs, speaker)?;
                let rhs = self.evaluate(rhs, speaker)?;
                Ok(op.apply(lhs, rhs)?)
            }
            Operand::Unary { op, operand } => Ok(op.apply(self.evaluate(operand, speaker)?)?),
            Operand::Character(c) => self.value(*c),
            Operand::Role(Role::Speaker) => self.value(speaker),
            Operand::Role(Role::Addressee) => self.value(self.addressee(speaker)?),
        }
    }

    pub fn value_of(&self, ident: &Ident) -> Option<i64> {
        let c = self.program.character(ident)?;
        self.memory[c].value
    }

    pub fn stack_of(&self, ident: &Ident) -> Option<&[i64]> {
        let c = self.program.character(ident)?;
        Some(&self.memory[c].stack)
    }

    /// Identifiers of the characters on stage, in order of entrance.
    pub fn on_stage(&self) -> Vec<&Ident> {
        self.stage
            .iter()
            .map(|&c| &self.program.characters[c])
            .collect()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn flag(&self) -> Option<bool> {
        self.flag
    }
}

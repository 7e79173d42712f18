//! Sentence composer and parser.
//!
//! Every structured statement has one canonical English sentence. The parser
//! accepts that sentence back along with the archaic pronoun forms, either
//! terminator, "return to" for "proceed to" and any words after "Recall".

use thiserror::Error;

use crate::core::cast::Cast;
use crate::core::codec::{self, CodecError, Perspective, ValueCodec};
use crate::core::control::{ControlError, ControlFlow};
use crate::core::lexicon::{Lexicon, Polarity};
use crate::core::words::{Mismatch, Words};
use crate::schema::statement::{Channel, Comparison, Relation, StageDirection, Statement};
use crate::schema::value::{Ident, Role, SemanticValue};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Mismatch(#[from] Mismatch),
    #[error("a conditional cannot guard another conditional")]
    NestedConditional,
    #[error("unrecognized sentence '{0}'")]
    Unrecognized(String),
    #[error("character '{0}' has no name")]
    UnknownCharacter(Ident),
    #[error("no character is called '{0}'")]
    UnknownName(String),
    #[error("nobody enters")]
    EmptyEntrance,
    #[error("the lexicon has no usable {0}")]
    NoWord(&'static str),
}

/// Translates single statements and stage directions.
pub struct Composer<'a> {
    lexicon: &'a Lexicon,
    cast: &'a Cast,
    codec: ValueCodec<'a>,
    control: ControlFlow<'a>,
}

/// The form a statement takes once composed and parsed again: the speaker's
/// own name becomes a role and constant sums fold.
pub fn canonical(statement: &Statement, speaker: &Ident) -> Statement {
    let value = |v: &SemanticValue| codec::canonical(&v.with_speaker_as_role(speaker));
    match statement {
        Statement::Assign(v) => Statement::Assign(value(v)),
        Statement::Remember(v) => Statement::Remember(value(v)),
        Statement::Compare(c) => Statement::Compare(Comparison {
            lhs: value(&c.lhs),
            rhs: value(&c.rhs),
            ..c.clone()
        }),
        Statement::Conditional { polarity, body } => {
            Statement::conditional(*polarity, canonical(body, speaker))
        }
        other => other.clone(),
    }
}

impl<'a> Composer<'a> {
    pub fn new(lexicon: &'a Lexicon, cast: &'a Cast, seed: u64) -> Self {
        Self {
            lexicon,
            cast,
            codec: ValueCodec::new(lexicon, cast, seed),
            control: ControlFlow::new(lexicon),
        }
    }

    /// Compose the sentence `speaker` says for `statement`.
    pub fn compose(&mut self, statement: &Statement, speaker: &Ident) -> Result<String, ComposeError> {
        let sentence = match statement {
            Statement::Conditional { polarity, body } => {
                if matches!(**body, Statement::Conditional { .. }) {
                    return Err(ComposeError::NestedConditional);
                }
                let body = self.compose_simple(body, speaker)?;
                format!("{} {}", ControlFlow::marker(*polarity), lowercase_first(&body))
            }
            simple => self.compose_simple(simple, speaker)?,
        };
        tracing::trace!(%speaker, %sentence, "composed sentence");
        Ok(sentence)
    }

    fn compose_simple(&mut self, statement: &Statement, speaker: &Ident) -> Result<String, ComposeError> {
        let addressee = Perspective::subject(Role::Addressee);
        match statement {
            Statement::Assign(value) => {
                let value = value.with_speaker_as_role(speaker);
                let (subject, verb) = self.subject_and_verb(Role::Addressee)?;
                let opening = format!("{} {}", capitalize(subject), verb);
                match value {
                    SemanticValue::Constant(n) if n != 0 => {
                        let phrase = self.codec.encode(&value, addressee)?;
                        Ok(format!("{opening} {phrase}."))
                    }
                    _ => {
                        let adjective = self
                            .codec
                            .any_adjective(Polarity::Positive)
                            .ok_or(ComposeError::NoWord("adjective"))?;
                        let phrase = self.codec.encode(&value, addressee)?;
                        Ok(format!("{opening} as {adjective} as {phrase}."))
                    }
                }
            }
            Statement::Compare(comparison) => self.compose_question(comparison, speaker),
            Statement::Conditional { .. } => Err(ComposeError::NestedConditional),
            Statement::Jump(target) => Ok(self.control.compose_jump(target)?),
            Statement::Input(Channel::Character) => Ok("Open your mind!".to_string()),
            Statement::Input(Channel::Integer) => Ok("Listen to your heart!".to_string()),
            Statement::Output(Channel::Character) => Ok("Speak your mind!".to_string()),
            Statement::Output(Channel::Integer) => Ok("Open your heart!".to_string()),
            Statement::Remember(value) => {
                let value = value.with_speaker_as_role(speaker);
                let phrase = self.codec.encode(&value, addressee)?;
                Ok(format!("Remember {phrase}."))
            }
            Statement::Recall => Ok("Recall your past.".to_string()),
        }
    }

    fn compose_question(&mut self, comparison: &Comparison, speaker: &Ident) -> Result<String, ComposeError> {
        let lhs = comparison.lhs.with_speaker_as_role(speaker);
        let rhs = comparison.rhs.with_speaker_as_role(speaker);
        let (opening, perspective) = match lhs {
            SemanticValue::Role(role) => {
                let (subject, verb) = self.subject_and_verb(role)?;
                (format!("{} {}", capitalize(verb), subject), Perspective::subject(role))
            }
            other => {
                let phrase = self.codec.encode(&other, Perspective::default())?;
                (format!("Is {phrase}"), Perspective::default())
            }
        };
        let not = if comparison.negated { " not" } else { "" };
        let relation = match comparison.relation {
            Relation::Equal => {
                let adjective = self
                    .codec
                    .any_adjective(Polarity::Positive)
                    .ok_or(ComposeError::NoWord("adjective"))?;
                format!("as {adjective} as")
            }
            Relation::Greater | Relation::Less => {
                let polarity = if comparison.relation == Relation::Greater {
                    Polarity::Positive
                } else {
                    Polarity::Negative
                };
                let comparative = self
                    .codec
                    .any_comparative(polarity)
                    .ok_or(ComposeError::NoWord("comparative"))?;
                format!("{comparative} than")
            }
        };
        let phrase = self.codec.encode(&rhs, perspective)?;
        Ok(format!("{opening}{not} {relation} {phrase}?"))
    }

    fn subject_and_verb(&self, role: Role) -> Result<(&'a str, &'a str), ComposeError> {
        let forms = self
            .lexicon
            .pronoun(role)
            .ok_or(CodecError::MissingPronoun(role))?;
        Ok((forms.subject.as_str(), forms.verb.as_str()))
    }

    /// Parse one sentence back into a statement.
    pub fn parse(&self, sentence: &str) -> Result<Statement, ComposeError> {
        let mut words = Words::new(sentence);
        let statement = match ControlFlow::read_marker(&mut words) {
            Some(polarity) => Statement::conditional(polarity, self.parse_simple(&mut words, sentence)?),
            None => self.parse_simple(&mut words, sentence)?,
        };
        tracing::trace!(%sentence, ?statement, "parsed sentence");
        Ok(statement)
    }

    fn parse_simple(&self, words: &mut Words, sentence: &str) -> Result<Statement, ComposeError> {
        if let Some(target) = self.control.read_jump(words)? {
            words.expect_end()?;
            return Ok(Statement::Jump(target));
        }
        if let Some(statement) = read_io(words)? {
            words.expect_end()?;
            return Ok(statement);
        }
        if words.eat("recall") {
            return Ok(Statement::Recall);
        }
        if words.eat("remember") {
            let value = self.codec.read_value(words)?;
            words.expect_end()?;
            return Ok(Statement::Remember(value));
        }

        let first = words.peek().unwrap_or_default();
        let second = words.peek_at(1).unwrap_or_default();
        if let Some((Role::Addressee, forms)) = self.lexicon.subject_pronoun(first) {
            if forms.verb.eq_ignore_ascii_case(second) {
                words.next_word();
                words.next_word();
                return self.read_assignment(words);
            }
        }
        if let Some((role, forms)) = self.lexicon.verb_pronoun(first) {
            if forms.subject.eq_ignore_ascii_case(second) {
                words.next_word();
                words.next_word();
                return self.read_question(words, SemanticValue::Role(role));
            }
        }
        if words.eat("is") {
            let lhs = self.codec.read_value(words)?;
            return self.read_question(words, lhs);
        }
        Err(ComposeError::Unrecognized(sentence.trim().to_string()))
    }

    /// The rest of "You are [as ADJ as] PHRASE".
    fn read_assignment(&self, words: &mut Words) -> Result<Statement, ComposeError> {
        if words.eat("as") {
            self.read_adjective(words)?;
            words.expect("as")?;
        }
        let value = self.codec.read_value(words)?;
        words.expect_end()?;
        Ok(Statement::Assign(value))
    }

    /// The rest of a question after its subject: "[not] as ADJ as X" or
    /// "[not] COMPARATIVE than X".
    fn read_question(&self, words: &mut Words, lhs: SemanticValue) -> Result<Statement, ComposeError> {
        let negated = words.eat("not");
        let relation = if words.eat("as") {
            self.read_adjective(words)?;
            words.expect("as")?;
            Relation::Equal
        } else {
            let polarity = words
                .peek()
                .and_then(|w| self.lexicon.comparative(w))
                .ok_or_else(|| words.mismatch("comparative"))?;
            words.next_word();
            words.expect("than")?;
            match polarity {
                Polarity::Negative => Relation::Less,
                Polarity::Positive | Polarity::Neutral => Relation::Greater,
            }
        };
        let rhs = self.codec.read_value(words)?;
        words.expect_end()?;
        Ok(Statement::Compare(Comparison {
            relation,
            negated,
            lhs,
            rhs,
        }))
    }

    fn read_adjective(&self, words: &mut Words) -> Result<(), ComposeError> {
        match words.peek() {
            Some(w) if self.lexicon.adjective_polarity(w).is_some() => {
                words.next_word();
                Ok(())
            }
            _ => Err(words.mismatch("adjective").into()),
        }
    }

    /// The text of a stage direction, without brackets.
    pub fn compose_direction(&self, direction: &StageDirection) -> Result<String, ComposeError> {
        match direction {
            StageDirection::Enter(idents) if idents.is_empty() => Err(ComposeError::EmptyEntrance),
            StageDirection::Enter(idents) => Ok(format!("Enter {}", self.name_list(idents)?)),
            StageDirection::Exit(ident) => Ok(format!("Exit {}", self.name(ident)?)),
            StageDirection::Exeunt(idents) if idents.is_empty() => Ok("Exeunt".to_string()),
            StageDirection::Exeunt(idents) => Ok(format!("Exeunt {}", self.name_list(idents)?)),
        }
    }

    fn name(&self, ident: &Ident) -> Result<&'a str, ComposeError> {
        self.cast
            .name_of(ident)
            .ok_or_else(|| ComposeError::UnknownCharacter(ident.clone()))
    }

    /// "A", "A and B", "A, B and C".
    fn name_list(&self, idents: &[Ident]) -> Result<String, ComposeError> {
        let names = idents
            .iter()
            .map(|ident| self.name(ident))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match names.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
            _ => names.concat(),
        })
    }

    /// Parse the text of a stage direction, with or without its brackets.
    pub fn parse_direction(&self, text: &str) -> Result<StageDirection, ComposeError> {
        let inner = text.trim();
        let inner = inner.strip_prefix('[').unwrap_or(inner);
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let mut words = Words::new(inner);
        let direction = if words.eat("enter") {
            let idents = self.read_names(&mut words)?;
            if idents.is_empty() {
                return Err(ComposeError::EmptyEntrance);
            }
            StageDirection::Enter(idents)
        } else if words.eat("exit") {
            let ident = self.read_name(&mut words)?;
            words.expect_end()?;
            StageDirection::Exit(ident)
        } else if words.eat("exeunt") {
            StageDirection::Exeunt(self.read_names(&mut words)?)
        } else {
            return Err(ComposeError::Unrecognized(text.trim().to_string()));
        };
        Ok(direction)
    }

    fn read_name(&self, words: &mut Words) -> Result<Ident, ComposeError> {
        match words.eat_longest(self.cast.names()) {
            Some(name) => self
                .cast
                .ident_of(name)
                .cloned()
                .ok_or_else(|| ComposeError::UnknownName(name.to_string())),
            None => match words.peek() {
                Some(word) => Err(ComposeError::UnknownName(word.to_string())),
                None => Err(words.mismatch("character name").into()),
            },
        }
    }

    /// Names separated by "," and "and", up to the end of the words.
    fn read_names(&self, words: &mut Words) -> Result<Vec<Ident>, ComposeError> {
        let mut idents = Vec::new();
        while !words.is_empty() {
            if !idents.is_empty() && !words.eat(",") && !words.eat("and") {
                return Err(words.mismatch("and").into());
            }
            idents.push(self.read_name(words)?);
        }
        Ok(idents)
    }
}

/// Consume one of the four fixed I/O sentences.
fn read_io(words: &mut Words) -> Result<Option<Statement>, Mismatch> {
    let statement = if words.eat("open") {
        read_possessive(words)?;
        if words.eat("mind") {
            Statement::Input(Channel::Character)
        } else {
            words.expect("heart")?;
            Statement::Output(Channel::Integer)
        }
    } else if words.eat_phrase("listen to") {
        read_possessive(words)?;
        words.expect("heart")?;
        Statement::Input(Channel::Integer)
    } else if words.eat("speak") {
        read_possessive(words)?;
        words.expect("mind")?;
        Statement::Output(Channel::Character)
    } else {
        return Ok(None);
    };
    Ok(Some(statement))
}

fn read_possessive(words: &mut Words) -> Result<(), Mismatch> {
    if words.eat("your") || words.eat("thy") {
        Ok(())
    } else {
        Err(words.mismatch("your"))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::statement::JumpTarget;
    use crate::schema::value::BinaryOp;

    fn lexicon() -> Lexicon {
        Lexicon::load_from_ron(std::path::Path::new("tests/fixtures/test_lexicon.ron")).unwrap()
    }

    fn cast(lexicon: &Lexicon) -> Cast {
        let mut cast = Cast::from_lexicon(lexicon);
        for id in ["romeo", "juliet", "lady"] {
            cast.allocate(&Ident::from(id)).unwrap();
        }
        cast
    }

    fn romeo() -> Ident {
        Ident::from("romeo")
    }

    #[test]
    fn twice_depends_on_operand_order() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let mut composer = Composer::new(&lexicon, &cast, 0);
        let x = SemanticValue::character("juliet");
        let twice = Statement::Assign(SemanticValue::binary(BinaryOp::Mul, 2.into(), x.clone()));
        let product = Statement::Assign(SemanticValue::binary(BinaryOp::Mul, x, 2.into()));
        assert_eq!(
            composer.compose(&twice, &romeo()).unwrap(),
            "You are as good as twice Juliet."
        );
        assert_eq!(
            composer.compose(&product, &romeo()).unwrap(),
            "You are as good as the product of Juliet and a good cat."
        );
    }

    #[test]
    fn constants_are_assigned_directly() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let mut composer = Composer::new(&lexicon, &cast, 0);
        let sentence = composer.compose(&Statement::Assign((-2).into()), &romeo()).unwrap();
        assert_eq!(sentence, "You are a bad pig.");
        let zero = composer.compose(&Statement::Assign(0.into()), &romeo()).unwrap();
        assert_eq!(zero, "You are as good as nothing.");
        assert_eq!(composer.parse(&zero).unwrap(), Statement::Assign(0.into()));
    }

    #[test]
    fn speaker_becomes_me() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let mut composer = Composer::new(&lexicon, &cast, 0);
        let remember = Statement::Remember(SemanticValue::character("romeo"));
        assert_eq!(composer.compose(&remember, &romeo()).unwrap(), "Remember me.");
        let yourself = Statement::Remember(SemanticValue::Role(Role::Addressee));
        assert_eq!(composer.compose(&yourself, &romeo()).unwrap(), "Remember yourself.");
        assert_eq!(
            composer.parse("Remember me.").unwrap(),
            Statement::Remember(SemanticValue::Role(Role::Speaker))
        );
    }

    #[test]
    fn questions() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let mut composer = Composer::new(&lexicon, &cast, 0);
        let compare = |relation, negated, lhs, rhs| {
            Statement::Compare(Comparison {
                relation,
                negated,
                lhs,
                rhs,
            })
        };
        let me = SemanticValue::Role(Role::Speaker);
        let you = SemanticValue::Role(Role::Addressee);
        let cases = [
            (compare(Relation::Greater, false, me.clone(), you.clone()), "Am I better than you?"),
            (compare(Relation::Less, true, you.clone(), you.clone()), "Are you not worse than yourself?"),
            (compare(Relation::Equal, false, you.clone(), 0.into()), "Are you as good as nothing?"),
            (
                compare(Relation::Equal, true, SemanticValue::character("juliet"), me.clone()),
                "Is Juliet not as good as me?",
            ),
        ];
        for (statement, sentence) in cases {
            assert_eq!(composer.compose(&statement, &romeo()).unwrap(), sentence);
            assert_eq!(composer.parse(sentence).unwrap(), statement);
        }
    }

    #[test]
    fn conditionals_wrap_one_statement() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let mut composer = Composer::new(&lexicon, &cast, 0);
        let jump = Statement::conditional(false, Statement::Jump(JumpTarget::scene(2)));
        let sentence = composer.compose(&jump, &romeo()).unwrap();
        assert_eq!(sentence, "If not, let us proceed to scene II.");
        assert_eq!(composer.parse(&sentence).unwrap(), jump);
        let nested = Statement::conditional(true, jump);
        assert_eq!(composer.compose(&nested, &romeo()), Err(ComposeError::NestedConditional));
    }

    #[test]
    fn fixed_sentences() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let composer = Composer::new(&lexicon, &cast, 0);
        assert_eq!(composer.parse("Open your mind!").unwrap(), Statement::Input(Channel::Character));
        assert_eq!(composer.parse("Listen to thy heart.").unwrap(), Statement::Input(Channel::Integer));
        assert_eq!(composer.parse("Speak your mind!").unwrap(), Statement::Output(Channel::Character));
        assert_eq!(composer.parse("Open your heart!").unwrap(), Statement::Output(Channel::Integer));
        assert_eq!(composer.parse("Recall your imprisonment and sorrow!").unwrap(), Statement::Recall);
        assert_eq!(
            composer.parse("Let us return to scene III!").unwrap(),
            Statement::Jump(JumpTarget::scene(3))
        );
    }

    #[test]
    fn unknown_sentences_are_rejected() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let composer = Composer::new(&lexicon, &cast, 0);
        assert_eq!(
            composer.parse("Fie upon thee!"),
            Err(ComposeError::Unrecognized("Fie upon thee!".to_string()))
        );
        assert!(matches!(
            composer.parse("You are the logarithm of a cat."),
            Err(ComposeError::Codec(CodecError::UnknownOperator(w))) if w == "logarithm"
        ));
    }

    #[test]
    fn directions() {
        let lexicon = lexicon();
        let cast = cast(&lexicon);
        let composer = Composer::new(&lexicon, &cast, 0);
        let ids = |names: &[&str]| names.iter().map(|n| Ident::from(*n)).collect::<Vec<_>>();
        let cases = [
            (StageDirection::Enter(ids(&["romeo"])), "Enter Romeo"),
            (StageDirection::Enter(ids(&["romeo", "juliet"])), "Enter Romeo and Juliet"),
            (
                StageDirection::Enter(ids(&["juliet", "lady", "romeo"])),
                "Enter Juliet, Lady Macbeth and Romeo",
            ),
            (StageDirection::Exit(Ident::from("lady")), "Exit Lady Macbeth"),
            (StageDirection::Exeunt(vec![]), "Exeunt"),
            (StageDirection::Exeunt(ids(&["romeo", "juliet"])), "Exeunt Romeo and Juliet"),
        ];
        for (direction, text) in cases {
            assert_eq!(composer.compose_direction(&direction).unwrap(), text);
            assert_eq!(composer.parse_direction(&format!("[{text}]")).unwrap(), direction);
        }
        assert_eq!(
            composer.parse_direction("[Enter Hamlet]"),
            Err(ComposeError::UnknownName("Hamlet".to_string()))
        );
        assert_eq!(composer.parse_direction("[Enter]"), Err(ComposeError::EmptyEntrance));
    }

    #[test]
    fn archaic_forms() {
        let lexicon = Lexicon::standard();
        let mut cast = Cast::from_lexicon(&lexicon);
        cast.allocate(&Ident::from("romeo")).unwrap();
        let composer = Composer::new(&lexicon, &cast, 0);
        assert_eq!(
            composer.parse("Thou art as fair as thyself!").unwrap(),
            Statement::Assign(SemanticValue::Role(Role::Addressee))
        );
        assert!(matches!(
            composer.parse("Art thou better than thee?").unwrap(),
            Statement::Compare(Comparison {
                relation: Relation::Greater,
                lhs: SemanticValue::Role(Role::Addressee),
                ..
            })
        ));
    }

    #[test]
    fn compose_then_parse_is_canonical() {
        let lexicon = Lexicon::standard();
        let mut cast = Cast::from_lexicon(&lexicon);
        cast.allocate(&romeo()).unwrap();
        cast.allocate(&Ident::from("juliet")).unwrap();
        let mut composer = Composer::new(&lexicon, &cast, 11);
        let statements = [
            Statement::Assign(SemanticValue::binary(
                BinaryOp::Add,
                SemanticValue::character("romeo"),
                SemanticValue::binary(BinaryOp::Add, 8.into(), 3.into()),
            )),
            Statement::Assign(1234.into()),
            Statement::Remember(SemanticValue::binary(BinaryOp::Sub, SemanticValue::character("juliet"), (-7).into())),
            Statement::conditional(true, Statement::Recall),
        ];
        for statement in statements {
            let sentence = composer.compose(&statement, &romeo()).unwrap();
            assert_eq!(composer.parse(&sentence).unwrap(), canonical(&statement, &romeo()), "{sentence}");
        }
    }
}

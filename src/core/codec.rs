//! Value codec: integers and operation trees to noun phrases and back.
//!
//! A noun is worth +1 or -1 by its polarity and every adjective in front of
//! it doubles it, so a noun phrase spells a signed power of two. Any other
//! integer is written as the sum of the largest power of two not above its
//! magnitude and the remainder, recursively.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::cast::Cast;
use crate::core::lexicon::{Lexicon, Polarity, WordKind};
use crate::core::words::{Mismatch, Words};
use crate::schema::phrase::NounPhrase;
use crate::schema::value::{BinaryOp, Ident, Role, SemanticValue, UnaryOp};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("cannot express {value}: the lexicon has no usable {missing}")]
    Unrepresentable { value: i64, missing: &'static str },
    #[error("the lexicon has no pronoun for the {0:?}")]
    MissingPronoun(Role),
    #[error("character '{0}' has no name")]
    UnknownCharacter(Ident),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("unknown word '{0}'")]
    UnknownWord(String),
    #[error("no character is called '{0}'")]
    UnknownName(String),
    #[error("adjective '{adjective}' cannot qualify noun '{noun}'")]
    PolarityMismatch { adjective: String, noun: String },
    #[error("a noun with {0} adjectives does not fit in 64 bits")]
    Overflow(usize),
    #[error(transparent)]
    Mismatch(#[from] Mismatch),
}

const BINARY_OPS: [BinaryOp; 5] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Rem,
];

const UNARY_OPS: [UnaryOp; 4] = [
    UnaryOp::Square,
    UnaryOp::Cube,
    UnaryOp::SquareRoot,
    UnaryOp::Factorial,
];

/// Words that may open a noun phrase without changing its value.
const ARTICLES: [&str; 11] = [
    "a", "an", "the", "my", "your", "thy", "his", "her", "their", "its", "our",
];

/// Who the grammatical subject of the surrounding clause is. A pronoun
/// referring to the subject is written reflexively ("yourself"), any other
/// in the object case ("me").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Perspective {
    pub subject: Option<Role>,
}

impl Perspective {
    pub fn subject(role: Role) -> Self {
        Self {
            subject: Some(role),
        }
    }

    /// The pronoun for `role` as seen from this perspective.
    pub fn pronoun<'l>(self, lexicon: &'l Lexicon, role: Role) -> Result<&'l str, CodecError> {
        let forms = lexicon.pronoun(role).ok_or(CodecError::MissingPronoun(role))?;
        if self.subject == Some(role) {
            Ok(forms.reflexive.as_str())
        } else {
            Ok(forms.object.as_str())
        }
    }
}

/// Encodes values into noun phrases and decodes them back.
pub struct ValueCodec<'a> {
    lexicon: &'a Lexicon,
    cast: &'a Cast,
    /// Lower-cased words of every character name; never used as nouns or
    /// adjectives.
    reserved: FxHashSet<String>,
    rng: StdRng,
}

impl<'a> ValueCodec<'a> {
    pub fn new(lexicon: &'a Lexicon, cast: &'a Cast, seed: u64) -> Self {
        let reserved = cast
            .names()
            .flat_map(str::split_whitespace)
            .map(str::to_lowercase)
            .collect();
        Self {
            lexicon,
            cast,
            reserved,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Encode a value. Role references take their pronoun from `perspective`.
    pub fn encode(
        &mut self,
        value: &SemanticValue,
        perspective: Perspective,
    ) -> Result<NounPhrase, CodecError> {
        match value {
            SemanticValue::Constant(n) => self.encode_integer(*n),
            SemanticValue::Binary {
                op: BinaryOp::Mul,
                lhs,
                rhs,
            } if **lhs == SemanticValue::Constant(2) => {
                Ok(NounPhrase::Twice(Box::new(self.encode(rhs, perspective)?)))
            }
            SemanticValue::Binary { op, lhs, rhs } => Ok(NounPhrase::binary(
                *op,
                self.encode(lhs, perspective)?,
                self.encode(rhs, perspective)?,
            )),
            SemanticValue::Unary { op, operand } => Ok(NounPhrase::Unary {
                op: *op,
                operand: Box::new(self.encode(operand, perspective)?),
            }),
            SemanticValue::Character(ident) => {
                let name = self
                    .cast
                    .name_of(ident)
                    .ok_or_else(|| CodecError::UnknownCharacter(ident.clone()))?;
                Ok(NounPhrase::Name(name.to_string()))
            }
            SemanticValue::Role(role) => Ok(NounPhrase::Pronoun(
                perspective.pronoun(self.lexicon, *role)?.to_string(),
            )),
        }
    }

    /// Encode a signed integer.
    pub fn encode_integer(&mut self, n: i64) -> Result<NounPhrase, CodecError> {
        if n == 0 {
            return Ok(NounPhrase::Nothing);
        }
        self.encode_magnitude(n, n < 0, n.unsigned_abs())
    }

    fn encode_magnitude(
        &mut self,
        value: i64,
        negative: bool,
        magnitude: u64,
    ) -> Result<NounPhrase, CodecError> {
        if magnitude.is_power_of_two() {
            return self.encode_power(value, negative, magnitude.trailing_zeros() as usize);
        }
        let power = 1u64 << (63 - magnitude.leading_zeros());
        let lhs = self.encode_magnitude(value, negative, power)?;
        let rhs = self.encode_magnitude(value, negative, magnitude - power)?;
        Ok(NounPhrase::binary(BinaryOp::Add, lhs, rhs))
    }

    /// A noun preceded by `exponent` adjectives, all of one polarity.
    fn encode_power(
        &mut self,
        value: i64,
        negative: bool,
        exponent: usize,
    ) -> Result<NounPhrase, CodecError> {
        let polarity = if negative {
            Polarity::Negative
        } else {
            Polarity::Positive
        };
        let lexicon = self.lexicon;
        let noun_table = &lexicon.nouns;
        let noun_fallback: &[String] = if negative { &[] } else { &noun_table.neutral };
        let noun = self
            .pick(noun_table.words(polarity), noun_fallback)
            .ok_or(CodecError::Unrepresentable {
                value,
                missing: "noun",
            })?;
        let mut adjectives = Vec::with_capacity(exponent);
        let table = &lexicon.adjectives;
        for _ in 0..exponent {
            let adjective = self
                .pick(table.words(polarity), table.words(Polarity::Neutral))
                .ok_or(CodecError::Unrepresentable {
                    value,
                    missing: "adjective",
                })?;
            adjectives.push(adjective);
        }
        Ok(NounPhrase::Noun { adjectives, noun })
    }

    /// Choose a word from `preferred`, or from `fallback` when no preferred
    /// word is usable, skipping words reserved by character names.
    fn pick(&mut self, preferred: &[String], fallback: &[String]) -> Option<String> {
        for table in [preferred, fallback] {
            let usable: Vec<&String> = table
                .iter()
                .filter(|w| !self.reserved.contains(&w.to_lowercase()))
                .collect();
            if let Some(word) = usable.choose(&mut self.rng) {
                return Some((*word).clone());
            }
        }
        None
    }

    /// Pick any usable adjective, for comparative scaffolds ("as good as").
    pub fn any_adjective(&mut self, polarity: Polarity) -> Option<String> {
        let lexicon = self.lexicon;
        let table = &lexicon.adjectives;
        self.pick(table.words(polarity), table.words(Polarity::Neutral))
    }

    /// Pick a usable comparative of the given polarity ("better", "worse").
    pub fn any_comparative(&mut self, polarity: Polarity) -> Option<String> {
        let lexicon = self.lexicon;
        let table = match polarity {
            Polarity::Negative => &lexicon.comparatives.negative,
            Polarity::Positive | Polarity::Neutral => &lexicon.comparatives.positive,
        };
        self.pick(table, &[])
    }

    /// Decode a noun phrase into a value. Sums of constants written the way
    /// [`ValueCodec::encode_integer`] writes them fold back into one constant.
    pub fn decode(&self, phrase: &NounPhrase) -> Result<SemanticValue, CodecError> {
        match phrase {
            NounPhrase::Nothing => Ok(SemanticValue::Constant(0)),
            NounPhrase::Noun { adjectives, noun } => self.decode_noun(adjectives, noun),
            NounPhrase::Pronoun(word) => self
                .lexicon
                .person_of(word)
                .map(SemanticValue::Role)
                .ok_or_else(|| CodecError::UnknownWord(word.clone())),
            NounPhrase::Name(name) => self
                .cast
                .ident_of(name)
                .map(|ident| SemanticValue::Character(ident.clone()))
                .ok_or_else(|| CodecError::UnknownName(name.clone())),
            NounPhrase::Binary { op, lhs, rhs } => {
                let lhs = self.decode(lhs)?;
                let rhs = self.decode(rhs)?;
                if let (BinaryOp::Add, SemanticValue::Constant(a), SemanticValue::Constant(b)) =
                    (op, &lhs, &rhs)
                {
                    if let Some(sum) = canonical_sum(*a, *b) {
                        return Ok(SemanticValue::Constant(sum));
                    }
                }
                Ok(SemanticValue::binary(*op, lhs, rhs))
            }
            NounPhrase::Unary { op, operand } => {
                Ok(SemanticValue::unary(*op, self.decode(operand)?))
            }
            NounPhrase::Twice(operand) => Ok(SemanticValue::binary(
                BinaryOp::Mul,
                SemanticValue::Constant(2),
                self.decode(operand)?,
            )),
        }
    }

    fn decode_noun(&self, adjectives: &[String], noun: &str) -> Result<SemanticValue, CodecError> {
        let noun_polarity = self
            .lexicon
            .noun_polarity(noun)
            .ok_or_else(|| CodecError::UnknownWord(noun.to_string()))?;
        for adjective in adjectives {
            let polarity = self
                .lexicon
                .adjective_polarity(adjective)
                .ok_or_else(|| CodecError::UnknownWord(adjective.clone()))?;
            if !polarity.agrees_with(noun_polarity) {
                return Err(CodecError::PolarityMismatch {
                    adjective: adjective.clone(),
                    noun: noun.to_string(),
                });
            }
        }
        let count = adjectives.len();
        let magnitude = 1i128
            .checked_shl(count as u32)
            .filter(|_| count < 127)
            .ok_or(CodecError::Overflow(count))?;
        let value = i64::try_from(magnitude * i128::from(noun_polarity.sign()))
            .map_err(|_| CodecError::Overflow(count))?;
        Ok(SemanticValue::Constant(value))
    }

    /// Read one noun phrase from `words`.
    pub fn read_phrase(&self, words: &mut Words) -> Result<NounPhrase, CodecError> {
        if words.eat("nothing") || words.eat("zero") {
            return Ok(NounPhrase::Nothing);
        }
        if words.eat("twice") {
            return Ok(NounPhrase::Twice(Box::new(self.read_phrase(words)?)));
        }
        for op in BINARY_OPS {
            if words.eat_phrase(op.phrase()) {
                let lhs = self.read_phrase(words)?;
                words.expect("and")?;
                let rhs = self.read_phrase(words)?;
                return Ok(NounPhrase::binary(op, lhs, rhs));
            }
        }
        for op in UNARY_OPS {
            if words.eat_phrase(op.phrase()) {
                let operand = self.read_phrase(words)?;
                return Ok(NounPhrase::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
        }
        if let Some(name) = words.eat_longest(self.cast.names()) {
            return Ok(NounPhrase::Name(name.to_string()));
        }
        if let Some(word) = words.peek() {
            if self.lexicon.person_of(word).is_some() {
                let pronoun = word.to_string();
                words.next_word();
                return Ok(NounPhrase::Pronoun(pronoun));
            }
        }

        let article = ARTICLES.iter().find(|a| words.eat(a)).copied();
        let mut adjectives = Vec::new();
        loop {
            let Some(word) = words.peek() else {
                return Err(words.mismatch("noun").into());
            };
            match self.lexicon.classify(word) {
                Some(WordKind::Adjective(_)) => adjectives.push(word.to_lowercase()),
                Some(WordKind::Noun(_)) => {
                    let noun = word.to_lowercase();
                    words.next_word();
                    return Ok(NounPhrase::Noun { adjectives, noun });
                }
                _ if article == Some("the") && adjectives.is_empty() => {
                    return Err(CodecError::UnknownOperator(word.to_string()));
                }
                _ => return Err(CodecError::UnknownWord(word.to_string())),
            }
            words.next_word();
        }
    }

    /// Read one phrase and decode it.
    pub fn read_value(&self, words: &mut Words) -> Result<SemanticValue, CodecError> {
        let phrase = self.read_phrase(words)?;
        self.decode(&phrase)
    }
}

/// The value [`ValueCodec::decode`] yields for the phrase encoding `value`:
/// sums of constants written the way the encoder splits integers fold into
/// one constant.
pub fn canonical(value: &SemanticValue) -> SemanticValue {
    match value {
        SemanticValue::Binary { op, lhs, rhs } => {
            let lhs = canonical(lhs);
            let rhs = canonical(rhs);
            if let (BinaryOp::Add, SemanticValue::Constant(a), SemanticValue::Constant(b)) =
                (op, &lhs, &rhs)
            {
                if let Some(sum) = canonical_sum(*a, *b) {
                    return SemanticValue::Constant(sum);
                }
            }
            SemanticValue::binary(*op, lhs, rhs)
        }
        SemanticValue::Unary { op, operand } => SemanticValue::unary(*op, canonical(operand)),
        leaf => leaf.clone(),
    }
}

/// `a + b` when that is exactly how the encoder splits the sum: same sign,
/// `a` a power of two and `|b| < |a|`.
fn canonical_sum(a: i64, b: i64) -> Option<i64> {
    let canonical = a != 0
        && b != 0
        && a.signum() == b.signum()
        && a.unsigned_abs().is_power_of_two()
        && b.unsigned_abs() < a.unsigned_abs();
    if canonical {
        a.checked_add(b)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::load_from_ron(std::path::Path::new("tests/fixtures/test_lexicon.ron")).unwrap()
    }

    fn cast_with(names: &[&str]) -> Cast {
        let mut cast = Cast::new(names.iter().map(|n| n.to_string()));
        for (i, _) in names.iter().enumerate() {
            cast.allocate(&Ident::new(format!("c{i}"))).unwrap();
        }
        cast
    }

    fn round_trip(codec: &mut ValueCodec<'_>, n: i64) -> SemanticValue {
        let phrase = codec.encode_integer(n).unwrap();
        codec.decode(&phrase).unwrap()
    }

    #[test]
    fn zero_is_nothing() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        assert_eq!(codec.encode_integer(0).unwrap(), NounPhrase::Nothing);
    }

    #[test]
    fn powers_of_two_are_single_nouns() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        assert_eq!(codec.encode_integer(1).unwrap(), NounPhrase::noun(&[], "cat"));
        assert_eq!(codec.encode_integer(-4).unwrap(), NounPhrase::noun(&["bad", "bad"], "pig"));
        assert_eq!(codec.encode_integer(8).unwrap(), NounPhrase::noun(&["good", "good", "good"], "cat"));
    }

    #[test]
    fn five_is_four_plus_one() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        let phrase = codec.encode_integer(5).unwrap();
        assert_eq!(phrase.to_string(), "the sum of a good good cat and a cat");
        assert_eq!(codec.decode(&phrase).unwrap(), SemanticValue::Constant(5));
    }

    #[test]
    fn integers_round_trip() {
        let lexicon = Lexicon::standard();
        let cast = Cast::default();
        let mut codec = ValueCodec::new(&lexicon, &cast, 7);
        for n in -64..=64 {
            assert_eq!(round_trip(&mut codec, n), SemanticValue::Constant(n), "value {n}");
        }
        for n in [i64::MAX, i64::MIN, i64::MIN + 1, 1 << 40] {
            assert_eq!(round_trip(&mut codec, n), SemanticValue::Constant(n), "value {n}");
        }
    }

    #[test]
    fn twice_only_for_a_leading_two() {
        let lexicon = lexicon();
        let cast = cast_with(&["Romeo"]);
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        let x = SemanticValue::character("c0");
        let left = SemanticValue::binary(BinaryOp::Mul, 2.into(), x.clone());
        let right = SemanticValue::binary(BinaryOp::Mul, x, 2.into());
        let left = codec.encode(&left, Perspective::default()).unwrap();
        let right = codec.encode(&right, Perspective::default()).unwrap();
        assert_eq!(left.to_string(), "twice Romeo");
        assert_eq!(right.to_string(), "the product of Romeo and a good cat");
    }

    #[test]
    fn expressions_round_trip_structurally() {
        let lexicon = Lexicon::standard();
        let cast = cast_with(&["Juliet"]);
        let mut codec = ValueCodec::new(&lexicon, &cast, 3);
        let value = SemanticValue::binary(
            BinaryOp::Rem,
            SemanticValue::unary(UnaryOp::Factorial, SemanticValue::character("c0")),
            SemanticValue::binary(
                BinaryOp::Sub,
                SemanticValue::Role(Role::Speaker),
                SemanticValue::unary(UnaryOp::SquareRoot, (-12).into()),
            ),
        );
        let phrase = codec.encode(&value, Perspective::default()).unwrap();
        assert_eq!(codec.decode(&phrase).unwrap(), value);
        let mut words = Words::new(&phrase.to_string());
        assert_eq!(codec.read_value(&mut words).unwrap(), value);
        assert!(words.is_empty());
    }

    #[test]
    fn pronouns_follow_perspective() {
        let lexicon = Lexicon::standard();
        let cast = Cast::default();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        let you = SemanticValue::Role(Role::Addressee);
        let me = SemanticValue::Role(Role::Speaker);
        let from_addressee = Perspective::subject(Role::Addressee);
        assert_eq!(codec.encode(&you, from_addressee).unwrap(), NounPhrase::Pronoun("yourself".into()));
        assert_eq!(codec.encode(&me, from_addressee).unwrap(), NounPhrase::Pronoun("me".into()));
        assert_eq!(
            codec.encode(&me, Perspective::subject(Role::Speaker)).unwrap(),
            NounPhrase::Pronoun("myself".into())
        );
        assert_eq!(codec.decode(&NounPhrase::Pronoun("thee".into())).unwrap(), you);
    }

    #[test]
    fn character_names_are_never_vocabulary() {
        let lexicon = lexicon();
        let cast = Cast::new(["Cat".to_string()]);
        let mut cast = cast;
        cast.allocate(&Ident::from("x")).unwrap();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        // "cat" is reserved, so a positive noun falls back to the neutral table.
        assert_eq!(codec.encode_integer(1).unwrap(), NounPhrase::noun(&[], "stone"));
    }

    #[test]
    fn unrepresentable_without_words() {
        let lexicon = lexicon();
        let mut cast = Cast::new(["Pig".to_string()]);
        cast.allocate(&Ident::from("x")).unwrap();
        let mut codec = ValueCodec::new(&lexicon, &cast, 0);
        assert_eq!(
            codec.encode_integer(-2),
            Err(CodecError::Unrepresentable {
                value: -2,
                missing: "noun"
            })
        );
    }

    #[test]
    fn read_phrase_reports_unknown_operator() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let codec = ValueCodec::new(&lexicon, &cast, 0);
        let mut words = Words::new("the logarithm of a cat");
        assert_eq!(
            codec.read_phrase(&mut words),
            Err(CodecError::UnknownOperator("logarithm".to_string()))
        );
        let mut words = Words::new("a purple cat");
        assert_eq!(
            codec.read_phrase(&mut words),
            Err(CodecError::UnknownWord("purple".to_string()))
        );
    }

    #[test]
    fn polarity_mismatch_is_an_error() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let codec = ValueCodec::new(&lexicon, &cast, 0);
        let phrase = NounPhrase::noun(&["bad"], "cat");
        assert!(matches!(codec.decode(&phrase), Err(CodecError::PolarityMismatch { .. })));
        let neutral = NounPhrase::noun(&["big", "bad"], "pig");
        assert_eq!(codec.decode(&neutral).unwrap(), SemanticValue::Constant(-4));
    }

    #[test]
    fn non_canonical_sums_stay_structural() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let codec = ValueCodec::new(&lexicon, &cast, 0);
        let mut words = Words::new("the sum of a cat and a good good cat");
        assert_eq!(
            codec.read_value(&mut words).unwrap(),
            SemanticValue::binary(BinaryOp::Add, 1.into(), 4.into())
        );
    }

    #[test]
    fn canonical_folds_encoder_sums_only() {
        let folded = SemanticValue::binary(
            BinaryOp::Add,
            (-8).into(),
            SemanticValue::binary(BinaryOp::Add, (-2).into(), (-1).into()),
        );
        assert_eq!(canonical(&folded), SemanticValue::Constant(-11));
        let kept = SemanticValue::binary(BinaryOp::Add, 3.into(), 4.into());
        assert_eq!(canonical(&kept), kept);
    }

    #[test]
    fn too_many_adjectives_overflow() {
        let lexicon = lexicon();
        let cast = Cast::default();
        let codec = ValueCodec::new(&lexicon, &cast, 0);
        let adjectives = vec!["good"; 63];
        let phrase = NounPhrase::noun(&adjectives, "cat");
        assert_eq!(codec.decode(&phrase), Err(CodecError::Overflow(63)));
        let adjectives = vec!["bad"; 63];
        let phrase = NounPhrase::noun(&adjectives, "pig");
        assert_eq!(codec.decode(&phrase).unwrap(), SemanticValue::Constant(i64::MIN));
    }
}

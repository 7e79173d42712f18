//! Vocabulary tables: nouns, adjectives, pronouns, comparatives, numerals
//! and the cast of proper names, loaded from RON.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::value::Role;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("word '{0}' appears in more than one table")]
    DuplicateWord(String),
    #[error("lexicon has no {0}")]
    Missing(&'static str),
}

/// The full vocabulary shipped with the crate.
const STANDARD_LEXICON: &str = include_str!("../../data/lexicon.ron");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    /// Sign of a noun of this polarity.
    pub fn sign(self) -> i64 {
        match self {
            Self::Positive | Self::Neutral => 1,
            Self::Negative => -1,
        }
    }

    /// Returns true if an adjective of this polarity may qualify a noun of
    /// polarity `noun`.
    pub fn agrees_with(self, noun: Polarity) -> bool {
        match (self, noun) {
            (Self::Neutral, _) => true,
            (adjective, noun) => adjective.sign() == noun.sign(),
        }
    }
}

/// Words of one part of speech, split by polarity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordClass {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

impl WordClass {
    pub fn words(&self, polarity: Polarity) -> &[String] {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Neutral => &self.neutral,
            Polarity::Negative => &self.negative,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&String, Polarity)> + '_ {
        self.positive
            .iter()
            .map(|w| (w, Polarity::Positive))
            .chain(self.neutral.iter().map(|w| (w, Polarity::Neutral)))
            .chain(self.negative.iter().map(|w| (w, Polarity::Negative)))
    }
}

/// Comparative adjectives. Positive ones read "greater than", negative ones
/// "less than".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comparatives {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

/// The forms of one personal pronoun and the present of "to be" it takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounForms {
    pub subject: String,
    pub object: String,
    pub reflexive: String,
    pub verb: String,
}

/// First entry of each list is the canonical form used when composing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pronouns {
    pub first_person: Vec<PronounForms>,
    pub second_person: Vec<PronounForms>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Noun(Polarity),
    Adjective(Polarity),
    Pronoun(Role),
    Comparative(Polarity),
}

/// The vocabulary the codec, composer and allocator work from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LexiconTables", into = "LexiconTables")]
pub struct Lexicon {
    pub nouns: WordClass,
    pub adjectives: WordClass,
    pub comparatives: Comparatives,
    pub pronouns: Pronouns,
    /// Act and scene numerals, index 0 standing for 1.
    pub numerals: Vec<String>,
    /// Proper names available to characters, in allocation order.
    pub cast: Vec<String>,
    index: FxHashMap<String, WordKind>,
}

// On-disk shape; the lookup index is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Lexicon")]
struct LexiconTables {
    nouns: WordClass,
    adjectives: WordClass,
    comparatives: Comparatives,
    pronouns: Pronouns,
    numerals: Vec<String>,
    cast: Vec<String>,
}

impl From<LexiconTables> for Lexicon {
    fn from(t: LexiconTables) -> Self {
        let mut lexicon = Lexicon {
            nouns: t.nouns,
            adjectives: t.adjectives,
            comparatives: t.comparatives,
            pronouns: t.pronouns,
            numerals: t.numerals,
            cast: t.cast,
            index: FxHashMap::default(),
        };
        lexicon.index = lexicon.build_index().0;
        lexicon
    }
}

impl From<Lexicon> for LexiconTables {
    fn from(l: Lexicon) -> Self {
        LexiconTables {
            nouns: l.nouns,
            adjectives: l.adjectives,
            comparatives: l.comparatives,
            pronouns: l.pronouns,
            numerals: l.numerals,
            cast: l.cast,
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::standard()
    }
}

impl Lexicon {
    /// The vocabulary compiled into the crate.
    pub fn standard() -> Self {
        // The bundled table is covered by `standard_lexicon_is_valid`.
        Self::parse_ron(STANDARD_LEXICON).unwrap_or_else(|e| panic!("bundled lexicon: {e}"))
    }

    /// Load a lexicon from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Lexicon, LexiconError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a lexicon from a RON string.
    pub fn parse_ron(input: &str) -> Result<Lexicon, LexiconError> {
        let lexicon: Lexicon = ron::from_str(input)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Check that every table the translators need is present and that no
    /// word belongs to two classes.
    pub fn validate(&self) -> Result<(), LexiconError> {
        if self.nouns.positive.is_empty() && self.nouns.neutral.is_empty() {
            return Err(LexiconError::Missing("positive or neutral nouns"));
        }
        if self.nouns.negative.is_empty() {
            return Err(LexiconError::Missing("negative nouns"));
        }
        if self.adjectives.iter().next().is_none() {
            return Err(LexiconError::Missing("adjectives"));
        }
        if self.comparatives.positive.is_empty() || self.comparatives.negative.is_empty() {
            return Err(LexiconError::Missing("comparatives"));
        }
        if self.pronouns.first_person.is_empty() || self.pronouns.second_person.is_empty() {
            return Err(LexiconError::Missing("pronouns"));
        }
        if self.numerals.is_empty() {
            return Err(LexiconError::Missing("numerals"));
        }
        if self.cast.is_empty() {
            return Err(LexiconError::Missing("cast"));
        }
        match self.build_index().1 {
            Some(word) => Err(LexiconError::DuplicateWord(word)),
            None => Ok(()),
        }
    }

    /// Build the word index, also returning the first word seen twice.
    fn build_index(&self) -> (FxHashMap<String, WordKind>, Option<String>) {
        let mut index = FxHashMap::default();
        let mut duplicate = None;
        let mut insert = |word: &str, kind: WordKind| {
            let key = word.to_lowercase();
            match index.get(&key) {
                // The same pronoun form may serve several grammatical cases.
                Some(WordKind::Pronoun(role)) if kind == WordKind::Pronoun(*role) => {}
                Some(_) => {
                    duplicate.get_or_insert(key);
                }
                None => {
                    index.insert(key, kind);
                }
            }
        };
        for (word, polarity) in self.nouns.iter() {
            insert(word, WordKind::Noun(polarity));
        }
        for (word, polarity) in self.adjectives.iter() {
            insert(word, WordKind::Adjective(polarity));
        }
        for word in &self.comparatives.positive {
            insert(word, WordKind::Comparative(Polarity::Positive));
        }
        for word in &self.comparatives.negative {
            insert(word, WordKind::Comparative(Polarity::Negative));
        }
        let persons = [
            (&self.pronouns.first_person, Role::Speaker),
            (&self.pronouns.second_person, Role::Addressee),
        ];
        for (forms, role) in persons {
            for f in forms {
                for word in [&f.subject, &f.object, &f.reflexive] {
                    insert(word, WordKind::Pronoun(role));
                }
            }
        }
        (index, duplicate)
    }

    /// Classify a word, ignoring case.
    pub fn classify(&self, word: &str) -> Option<WordKind> {
        self.index.get(&word.to_lowercase()).copied()
    }

    pub fn noun_polarity(&self, word: &str) -> Option<Polarity> {
        match self.classify(word)? {
            WordKind::Noun(p) => Some(p),
            _ => None,
        }
    }

    pub fn adjective_polarity(&self, word: &str) -> Option<Polarity> {
        match self.classify(word)? {
            WordKind::Adjective(p) => Some(p),
            _ => None,
        }
    }

    /// The role a pronoun word refers to.
    pub fn person_of(&self, word: &str) -> Option<Role> {
        match self.classify(word)? {
            WordKind::Pronoun(role) => Some(role),
            _ => None,
        }
    }

    pub fn comparative(&self, word: &str) -> Option<Polarity> {
        match self.classify(word)? {
            WordKind::Comparative(p) => Some(p),
            _ => None,
        }
    }

    /// Canonical pronoun forms for a role.
    pub fn pronoun(&self, role: Role) -> Option<&PronounForms> {
        match role {
            Role::Speaker => self.pronouns.first_person.first(),
            Role::Addressee => self.pronouns.second_person.first(),
        }
    }

    /// Pronoun forms whose subject form is `word`, ignoring case.
    pub fn subject_pronoun(&self, word: &str) -> Option<(Role, &PronounForms)> {
        let first = self.pronouns.first_person.iter().map(|f| (Role::Speaker, f));
        let second = self.pronouns.second_person.iter().map(|f| (Role::Addressee, f));
        first.chain(second).find(|(_, f)| f.subject.eq_ignore_ascii_case(word))
    }

    /// Pronoun forms whose verb is `word`, ignoring case.
    pub fn verb_pronoun(&self, word: &str) -> Option<(Role, &PronounForms)> {
        let first = self.pronouns.first_person.iter().map(|f| (Role::Speaker, f));
        let second = self.pronouns.second_person.iter().map(|f| (Role::Addressee, f));
        first.chain(second).find(|(_, f)| f.verb.eq_ignore_ascii_case(word))
    }
}

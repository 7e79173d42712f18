//! Character allocation: the two-way map between structured-form
//! identifiers and the proper names characters carry in prose.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::lexicon::Lexicon;
use crate::schema::value::Ident;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CastError {
    #[error("every name in the cast is taken; cannot name '{0}'")]
    Exhausted(Ident),
    #[error("names '{first}' and '{second}' both become identifier '{ident}'")]
    DuplicateIdentifier {
        first: String,
        second: String,
        ident: Ident,
    },
    #[error("placeholder error: {0}")]
    Placeholder(String),
}

/// A piece of free text with `{ident}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Ident),
}

/// Split text into literals and `{ident}` placeholders. `{{` and `}}` are
/// literal braces.
fn parse_placeholders(input: &str) -> Result<Vec<Segment>, CastError> {
    let mut segments = Vec::new();
    let mut literal_buf = String::new();
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        match chars[i] {
            '{' if i + 1 < len && chars[i + 1] == '{' => {
                literal_buf.push('{');
                i += 2;
            }
            '{' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '}' || c == '{')
                    .map(|offset| start + offset)
                    .filter(|&end| chars[end] == '}')
                    .ok_or_else(|| CastError::Placeholder(format!("unclosed brace in '{input}'")))?;
                let content: String = chars[start..end].iter().collect();
                let content = content.trim();
                if content.is_empty() {
                    return Err(CastError::Placeholder(format!("empty braces in '{input}'")));
                }
                if !literal_buf.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                }
                segments.push(Segment::Placeholder(Ident::new(content)));
                i = end + 1;
            }
            '}' if i + 1 < len && chars[i + 1] == '}' => {
                literal_buf.push('}');
                i += 2;
            }
            '}' => {
                return Err(CastError::Placeholder(format!(
                    "unmatched closing brace in '{input}'"
                )));
            }
            c => {
                literal_buf.push(c);
                i += 1;
            }
        }
    }

    if !literal_buf.is_empty() {
        segments.push(Segment::Literal(literal_buf));
    }
    Ok(segments)
}

/// Derive an identifier from a proper name: lower-case, words joined by `_`.
pub fn identifier_for(name: &str) -> Ident {
    let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    Ident(words.join("_"))
}

/// The bijection between identifiers and proper names.
#[derive(Debug, Clone, Default)]
pub struct Cast {
    /// Names still available for allocation, in order.
    pool: Vec<String>,
    /// Characters in allocation order.
    order: Vec<(Ident, String)>,
    by_ident: FxHashMap<Ident, usize>,
    /// Lower-cased name to position in `order`.
    by_name: FxHashMap<String, usize>,
}

impl Cast {
    /// An allocator drawing from `names` in order.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            pool: names.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn from_lexicon(lexicon: &Lexicon) -> Self {
        Self::new(lexicon.cast.iter().cloned())
    }

    /// Rebuild the map from the names of an existing play, deriving each
    /// identifier from its name.
    pub fn recover<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, CastError> {
        let mut cast = Self::default();
        for name in names {
            let ident = identifier_for(name);
            if let Some(&existing) = cast.by_ident.get(&ident) {
                return Err(CastError::DuplicateIdentifier {
                    first: cast.order[existing].1.clone(),
                    second: name.to_string(),
                    ident,
                });
            }
            cast.insert(ident, name.to_string());
        }
        Ok(cast)
    }

    fn insert(&mut self, ident: Ident, name: String) -> usize {
        let slot = self.order.len();
        self.by_ident.insert(ident.clone(), slot);
        self.by_name.insert(name.to_lowercase(), slot);
        self.order.push((ident, name));
        slot
    }

    /// The name of `ident`, assigning the first unused cast name on first use.
    pub fn allocate(&mut self, ident: &Ident) -> Result<&str, CastError> {
        if let Some(&slot) = self.by_ident.get(ident) {
            return Ok(self.order[slot].1.as_str());
        }
        let taken = &self.by_name;
        let position = self
            .pool
            .iter()
            .position(|name| !taken.contains_key(&name.to_lowercase()))
            .ok_or_else(|| CastError::Exhausted(ident.clone()))?;
        let name = self.pool.remove(position);
        tracing::debug!(%ident, %name, "allocated character name");
        let slot = self.insert(ident.clone(), name);
        Ok(self.order[slot].1.as_str())
    }

    pub fn name_of(&self, ident: &Ident) -> Option<&str> {
        self.by_ident.get(ident).map(|&slot| self.order[slot].1.as_str())
    }

    /// The identifier carrying `name`, ignoring case.
    pub fn ident_of(&self, name: &str) -> Option<&Ident> {
        self.by_name.get(&name.to_lowercase()).map(|&slot| &self.order[slot].0)
    }

    /// Every allocated `(ident, name)` pair in allocation order.
    pub fn characters(&self) -> impl Iterator<Item = (&Ident, &str)> + '_ {
        self.order.iter().map(|(ident, name)| (ident, name.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers named by placeholders in `text`.
    pub fn placeholders(text: &str) -> Result<Vec<Ident>, CastError> {
        Ok(parse_placeholders(text)?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(ident) => Some(ident),
                Segment::Literal(_) => None,
            })
            .collect())
    }

    /// Replace every `{ident}` in `text` with that character's name,
    /// allocating names for identifiers seen for the first time.
    pub fn substitute(&mut self, text: &str) -> Result<String, CastError> {
        let mut out = String::new();
        for segment in parse_placeholders(text)? {
            match segment {
                Segment::Literal(literal) => out.push_str(&literal),
                Segment::Placeholder(ident) => out.push_str(self.allocate(&ident)?),
            }
        }
        Ok(out)
    }

    /// Replace every whole-word, case-insensitive occurrence of a known name
    /// with its `{ident}` placeholder, preferring longer names, and escape
    /// literal braces.
    pub fn restore(&self, text: &str) -> String {
        let mut names: Vec<(&str, &Ident)> =
            self.order.iter().map(|(ident, name)| (name.as_str(), ident)).collect();
        names.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        let mut previous: Option<char> = None;
        while i < text.len() {
            let at_word_start = !previous.is_some_and(is_word_char);
            let matched = at_word_start
                .then(|| {
                    names.iter().find(|(name, _)| {
                        text.get(i..i + name.len()).is_some_and(|slice| {
                            slice.eq_ignore_ascii_case(name)
                                && !text[i + name.len()..].chars().next().is_some_and(is_word_char)
                        })
                    })
                })
                .flatten();
            if let Some((name, ident)) = matched {
                out.push('{');
                out.push_str(ident.as_str());
                out.push('}');
                i += name.len();
                previous = name.chars().last();
                continue;
            }
            let Some(c) = text[i..].chars().next() else {
                break;
            };
            match c {
                '{' => out.push_str("{{"),
                '}' => out.push_str("}}"),
                c => out.push(c),
            }
            previous = Some(c);
            i += c.len_utf8();
        }
        out
    }
}

/// Apostrophes end a word, so "Romeo's" still names Romeo.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayError {
    #[error("the play has no title")]
    MissingTitle,
    #[error("line {line}: expected 'Name, description.' in the dramatis personae, found '{text}'")]
    Persona { line: usize, text: String },
    #[error("line {line}: '{name}' speaks but is not in the dramatis personae")]
    UnknownSpeaker { line: usize, name: String },
    #[error("line {line}: unexpected text '{text}'")]
    Stray { line: usize, text: String },
    #[error("line {line}: unterminated stage direction '{text}'")]
    UnterminatedDirection { line: usize, text: String },
}

/// A program in prose form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub title: String,
    pub personae: Vec<Persona>,
    pub acts: Vec<PlayAct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayAct {
    pub numeral: String,
    pub description: String,
    pub scenes: Vec<PlayScene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayScene {
    pub numeral: String,
    pub description: String,
    pub lines: Vec<PlayLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayLine {
    /// The text between the brackets of a stage direction.
    Direction(String),
    Speech {
        speaker: String,
        sentences: Vec<String>,
    },
}

impl Play {
    /// Lay the play out as text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.title));
        out.push('\n');
        for persona in &self.personae {
            out.push_str(&format!("{}, {}\n", persona.name, persona.description));
        }
        for act in &self.acts {
            out.push_str(&format!("\n\nAct {}: {}\n", act.numeral, act.description));
            for scene in &act.scenes {
                out.push_str(&format!("\nScene {}: {}\n", scene.numeral, scene.description));
                for line in &scene.lines {
                    match line {
                        PlayLine::Direction(text) => out.push_str(&format!("\n[{}]\n", text)),
                        PlayLine::Speech { speaker, sentences } => {
                            out.push_str(&format!("\n{}:\n {}\n", speaker, sentences.join(" ")))
                        }
                    }
                }
            }
        }
        out
    }

    /// Read a play laid out as by [`Play::render`]. Blank lines and leading
    /// indentation are insignificant; a speech runs until the next heading,
    /// stage direction or speaker.
    pub fn parse(text: &str) -> Result<Play, PlayError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .peekable();

        let title = match lines.next() {
            Some((_, title)) => title.to_string(),
            None => return Err(PlayError::MissingTitle),
        };

        let mut personae = Vec::new();
        while let Some(&(line, text)) = lines.peek() {
            if heading(text, "Act").is_some() {
                break;
            }
            lines.next();
            let (name, description) = text.split_once(',').ok_or_else(|| PlayError::Persona {
                line,
                text: text.to_string(),
            })?;
            personae.push(Persona {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
            });
        }

        let mut builder = PlayBuilder::default();
        for (line, text) in lines {
            if let Some((numeral, description)) = heading(text, "Act") {
                builder.close_speech();
                builder.acts.push(PlayAct {
                    numeral,
                    description,
                    scenes: Vec::new(),
                });
            } else if let Some((numeral, description)) = heading(text, "Scene") {
                builder.close_speech();
                let act = builder.acts.last_mut().ok_or_else(|| stray(line, text))?;
                act.scenes.push(PlayScene {
                    numeral,
                    description,
                    lines: Vec::new(),
                });
            } else if let Some(inner) = text.strip_prefix('[') {
                let inner = inner
                    .strip_suffix(']')
                    .ok_or_else(|| PlayError::UnterminatedDirection {
                        line,
                        text: text.to_string(),
                    })?;
                builder.close_speech();
                builder
                    .scene(line, text)?
                    .lines
                    .push(PlayLine::Direction(inner.trim().to_string()));
            } else if let Some(name) = text.strip_suffix(':') {
                let persona = personae
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
                    .ok_or_else(|| PlayError::UnknownSpeaker {
                        line,
                        name: name.trim().to_string(),
                    })?;
                builder.close_speech();
                builder.scene(line, text)?;
                builder.speech = Some((persona.name.clone(), String::new()));
            } else {
                let (_, buffer) = builder.speech.as_mut().ok_or_else(|| stray(line, text))?;
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(text);
            }
        }
        builder.close_speech();

        Ok(Play {
            title,
            personae,
            acts: builder.acts,
        })
    }
}

#[derive(Default)]
struct PlayBuilder {
    acts: Vec<PlayAct>,
    speech: Option<(String, String)>,
}

impl PlayBuilder {
    fn scene(&mut self, line: usize, text: &str) -> Result<&mut PlayScene, PlayError> {
        self.acts
            .last_mut()
            .and_then(|act| act.scenes.last_mut())
            .ok_or_else(|| stray(line, text))
    }

    fn close_speech(&mut self) {
        let Some((speaker, buffer)) = self.speech.take() else {
            return;
        };
        let sentences = split_sentences(&buffer);
        if let Some(scene) = self.acts.last_mut().and_then(|act| act.scenes.last_mut()) {
            scene.lines.push(PlayLine::Speech { speaker, sentences });
        }
    }
}

fn stray(line: usize, text: &str) -> PlayError {
    PlayError::Stray {
        line,
        text: text.to_string(),
    }
}

/// Match `"<keyword> <numeral>: <description>"`.
fn heading(text: &str, keyword: &str) -> Option<(String, String)> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = text[keyword.len()..].strip_prefix(' ')?;
    let (numeral, description) = rest.split_once(':')?;
    let numeral = numeral.trim();
    if numeral.is_empty() || numeral.contains(char::is_whitespace) {
        return None;
    }
    Some((numeral.to_string(), description.trim().to_string()))
}

/// Split running text after each `.`, `!` or `?`.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

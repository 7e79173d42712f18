//! Whole-program translation between [`Program`] and [`Play`].

use thiserror::Error;

use crate::core::cast::{Cast, CastError};
use crate::core::composer::{ComposeError, Composer};
use crate::core::control::{ControlError, ControlFlow};
use crate::core::engine::Location;
use crate::core::lexicon::Lexicon;
use crate::schema::play::{Persona, Play, PlayAct, PlayLine, PlayScene};
use crate::schema::program::{Act, Declaration, Line, Program, Scene};
use crate::schema::value::Ident;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("{at}: {source}")]
    Sentence {
        at: Location,
        #[source]
        source: ComposeError,
    },
    #[error("{at}: '{speaker}' speaks but has no name")]
    UnnamedSpeaker { at: Location, speaker: Ident },
    #[error("{at}: '{name}' speaks but is not in the dramatis personae")]
    UnknownSpeaker { at: Location, name: String },
    #[error("expected {kind} {expected}, found '{found}'")]
    OutOfSequence {
        kind: &'static str,
        expected: String,
        found: String,
    },
}

/// Translates whole programs with one lexicon. Word choice is seeded, so
/// the same program and seed always give the same play.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    lexicon: &'a Lexicon,
    seed: u64,
}

impl<'a> Translator<'a> {
    pub fn new(lexicon: &'a Lexicon, seed: u64) -> Self {
        Self { lexicon, seed }
    }

    /// Structured form to prose form.
    pub fn to_prose(&self, program: &Program) -> Result<Play, TranslateError> {
        let mut cast = Cast::from_lexicon(self.lexicon);
        for declaration in &program.characters {
            cast.allocate(&declaration.id)?;
        }
        let title = cast.substitute(&program.title)?;
        let mut descriptions = Vec::with_capacity(program.characters.len());
        for declaration in &program.characters {
            descriptions.push(cast.substitute(&declaration.description)?);
        }
        let mut headings = Vec::with_capacity(program.acts.len());
        for act in &program.acts {
            let scenes = act
                .scenes
                .iter()
                .map(|scene| cast.substitute(&scene.description))
                .collect::<Result<Vec<_>, _>>()?;
            headings.push((cast.substitute(&act.description)?, scenes));
        }

        let personae = program
            .characters
            .iter()
            .zip(descriptions)
            .map(|(declaration, description)| Persona {
                name: cast.name_of(&declaration.id).unwrap_or_default().to_string(),
                description,
            })
            .collect();

        let mut composer = Composer::new(self.lexicon, &cast, self.seed);
        let control = ControlFlow::new(self.lexicon);
        let mut acts = Vec::with_capacity(program.acts.len());
        for (a, (act, (act_description, scene_descriptions))) in
            program.acts.iter().zip(headings).enumerate()
        {
            let mut scenes = Vec::with_capacity(act.scenes.len());
            for (s, (scene, description)) in act.scenes.iter().zip(scene_descriptions).enumerate() {
                let at = Location {
                    act: a + 1,
                    scene: s + 1,
                };
                let lines = scene
                    .lines
                    .iter()
                    .map(|line| compose_line(&mut composer, &cast, line, at))
                    .collect::<Result<Vec<_>, _>>()?;
                scenes.push(PlayScene {
                    numeral: control.numeral(s + 1)?.to_string(),
                    description,
                    lines,
                });
            }
            acts.push(PlayAct {
                numeral: control.numeral(a + 1)?.to_string(),
                description: act_description,
                scenes,
            });
        }
        tracing::debug!(title = %title, characters = cast.len(), "dramatized program");
        Ok(Play {
            title,
            personae,
            acts,
        })
    }

    /// Prose form to structured form. Identifiers are derived from the
    /// characters' names.
    pub fn to_structured(&self, play: &Play) -> Result<Program, TranslateError> {
        let cast = Cast::recover(play.personae.iter().map(|p| p.name.as_str()))?;
        let characters = cast
            .characters()
            .zip(&play.personae)
            .map(|((ident, _), persona)| Declaration {
                id: ident.clone(),
                description: cast.restore(&persona.description),
            })
            .collect();

        let composer = Composer::new(self.lexicon, &cast, self.seed);
        let control = ControlFlow::new(self.lexicon);
        let mut acts = Vec::with_capacity(play.acts.len());
        for (a, act) in play.acts.iter().enumerate() {
            expect_numeral(&control, "act", a + 1, &act.numeral)?;
            let mut scenes = Vec::with_capacity(act.scenes.len());
            for (s, scene) in act.scenes.iter().enumerate() {
                expect_numeral(&control, "scene", s + 1, &scene.numeral)?;
                let at = Location {
                    act: a + 1,
                    scene: s + 1,
                };
                let lines = scene
                    .lines
                    .iter()
                    .map(|line| parse_line(&composer, &cast, line, at))
                    .collect::<Result<Vec<_>, _>>()?;
                let scene = Scene {
                    description: cast.restore(&scene.description),
                    lines,
                };
                for guard in scene.guards() {
                    if guard.comparison.is_none() {
                        tracing::warn!(
                            %at,
                            line = guard.conditional.line + 1,
                            "conditional has no comparison before it in its scene"
                        );
                    }
                }
                scenes.push(scene);
            }
            acts.push(Act {
                description: cast.restore(&act.description),
                scenes,
            });
        }
        tracing::debug!(title = %play.title, characters = cast.len(), "transcribed play");
        Ok(Program {
            title: cast.restore(&play.title),
            characters,
            acts,
        })
    }
}

fn compose_line(
    composer: &mut Composer<'_>,
    cast: &Cast,
    line: &Line,
    at: Location,
) -> Result<PlayLine, TranslateError> {
    let in_scene = |source| TranslateError::Sentence { at, source };
    match line {
        Line::Direction(direction) => composer
            .compose_direction(direction)
            .map(PlayLine::Direction)
            .map_err(in_scene),
        Line::Speech {
            speaker,
            statements,
        } => {
            let name = cast
                .name_of(speaker)
                .ok_or_else(|| TranslateError::UnnamedSpeaker {
                    at,
                    speaker: speaker.clone(),
                })?;
            let sentences = statements
                .iter()
                .map(|statement| composer.compose(statement, speaker))
                .collect::<Result<Vec<_>, _>>()
                .map_err(in_scene)?;
            Ok(PlayLine::Speech {
                speaker: name.to_string(),
                sentences,
            })
        }
    }
}

fn parse_line(
    composer: &Composer<'_>,
    cast: &Cast,
    line: &PlayLine,
    at: Location,
) -> Result<Line, TranslateError> {
    let in_scene = |source| TranslateError::Sentence { at, source };
    match line {
        PlayLine::Direction(text) => composer
            .parse_direction(text)
            .map(Line::Direction)
            .map_err(in_scene),
        PlayLine::Speech { speaker, sentences } => {
            let ident = cast
                .ident_of(speaker)
                .ok_or_else(|| TranslateError::UnknownSpeaker {
                    at,
                    name: speaker.clone(),
                })?;
            let statements = sentences
                .iter()
                .map(|sentence| composer.parse(sentence))
                .collect::<Result<Vec<_>, _>>()
                .map_err(in_scene)?;
            Ok(Line::Speech {
                speaker: ident.clone(),
                statements,
            })
        }
    }
}

fn expect_numeral(
    control: &ControlFlow<'_>,
    kind: &'static str,
    position: usize,
    found: &str,
) -> Result<(), TranslateError> {
    match control.parse_numeral(found) {
        Ok(n) if n == position => Ok(()),
        _ => Err(TranslateError::OutOfSequence {
            kind,
            expected: control.numeral(position)?.to_string(),
            found: found.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::composer::canonical;
    use crate::schema::statement::{Channel, Comparison, JumpTarget, Relation, StageDirection, Statement};
    use crate::schema::value::{BinaryOp, Role, SemanticValue};

    fn id(name: &str) -> Ident {
        Ident::from(name)
    }

    fn sample() -> Program {
        Program {
            title: "{romeo} counts down.".to_string(),
            characters: vec![
                Declaration {
                    id: id("romeo"),
                    description: "a counter.".to_string(),
                },
                Declaration {
                    id: id("juliet"),
                    description: "counted by {romeo}.".to_string(),
                },
            ],
            acts: vec![Act {
                description: "Counting.".to_string(),
                scenes: vec![
                    Scene {
                        description: "Setup.".to_string(),
                        lines: vec![
                            Line::Direction(StageDirection::Enter(vec![id("romeo"), id("juliet")])),
                            Line::Speech {
                                speaker: id("romeo"),
                                statements: vec![Statement::Assign(3.into())],
                            },
                        ],
                    },
                    Scene {
                        description: "The loop.".to_string(),
                        lines: vec![Line::Speech {
                            speaker: id("romeo"),
                            statements: vec![
                                Statement::Output(Channel::Integer),
                                Statement::Assign(SemanticValue::binary(
                                    BinaryOp::Sub,
                                    SemanticValue::Role(Role::Addressee),
                                    1.into(),
                                )),
                                Statement::Compare(Comparison {
                                    relation: Relation::Greater,
                                    negated: false,
                                    lhs: SemanticValue::Role(Role::Addressee),
                                    rhs: 0.into(),
                                }),
                                Statement::conditional(true, Statement::Jump(JumpTarget::scene(2))),
                            ],
                        }],
                    },
                ],
            }],
        }
    }

    #[test]
    fn placeholders_become_names() {
        let lexicon = Lexicon::standard();
        let play = Translator::new(&lexicon, 1).to_prose(&sample()).unwrap();
        assert_eq!(play.title, "Romeo counts down.");
        assert_eq!(play.personae[1].name, "Juliet");
        assert_eq!(play.personae[1].description, "counted by Romeo.");
        assert_eq!(play.acts[0].scenes[1].numeral, "II");
        assert_eq!(
            play.acts[0].scenes[0].lines[0],
            PlayLine::Direction("Enter Romeo and Juliet".to_string())
        );
    }

    #[test]
    fn round_trip_through_text() {
        let lexicon = Lexicon::standard();
        let translator = Translator::new(&lexicon, 9);
        let program = sample();
        let text = translator.to_prose(&program).unwrap().render();
        let back = translator.to_structured(&Play::parse(&text).unwrap()).unwrap();
        assert_eq!(back.title, program.title);
        assert_eq!(back.characters, program.characters);
        let scene = &back.acts[0].scenes[1];
        let Line::Speech { statements, .. } = &scene.lines[0] else {
            panic!("expected a speech");
        };
        let Line::Speech { statements: original, .. } = &program.acts[0].scenes[1].lines[0] else {
            unreachable!()
        };
        let expected: Vec<_> = original.iter().map(|s| canonical(s, &id("romeo"))).collect();
        assert_eq!(statements, &expected);
    }

    #[test]
    fn numerals_must_be_in_sequence() {
        let lexicon = Lexicon::standard();
        let translator = Translator::new(&lexicon, 0);
        let mut play = translator.to_prose(&sample()).unwrap();
        play.acts[0].scenes[1].numeral = "IV".to_string();
        assert_eq!(
            translator.to_structured(&play),
            Err(TranslateError::OutOfSequence {
                kind: "scene",
                expected: "II".to_string(),
                found: "IV".to_string(),
            })
        );
    }

    #[test]
    fn errors_carry_their_scene() {
        let lexicon = Lexicon::standard();
        let translator = Translator::new(&lexicon, 0);
        let mut play = translator.to_prose(&sample()).unwrap();
        play.acts[0].scenes[1].lines[0] = PlayLine::Speech {
            speaker: "Romeo".to_string(),
            sentences: vec!["You are a unicorn.".to_string()],
        };
        let err = translator.to_structured(&play).unwrap_err();
        assert!(matches!(err, TranslateError::Sentence { at: Location { act: 1, scene: 2 }, .. }));
        assert!(err.to_string().starts_with("act 1, scene 2: "));
    }

    #[test]
    fn exhausted_cast() {
        let lexicon = Lexicon::load_from_ron(std::path::Path::new("tests/fixtures/test_lexicon.ron")).unwrap();
        let mut program = sample();
        for extra in ["a", "b"] {
            program.characters.push(Declaration {
                id: id(extra),
                description: "extra.".to_string(),
            });
        }
        assert_eq!(
            Translator::new(&lexicon, 0).to_prose(&program),
            Err(TranslateError::Cast(CastError::Exhausted(id("b"))))
        );
    }
}

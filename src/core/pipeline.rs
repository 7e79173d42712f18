/// The top-level facade: translation in both directions and performance.
///
/// Holds one lexicon and one seed, so every translation it makes is
/// reproducible.

use std::path::Path;
use thiserror::Error;

use crate::core::console::Console;
use crate::core::engine::{self, CompileError, Compiled, Engine, Fault};
use crate::core::lexicon::{Lexicon, LexiconError};
use crate::core::translate::{TranslateError, Translator};
use crate::schema::play::{Play, PlayError};
use crate::schema::program::Program;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("lexicon error: {0}")]
    Lexicon(#[from] LexiconError),
    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),
    #[error("play error: {0}")]
    Play(#[from] PlayError),
    #[error("{}", describe_compile_errors(.0))]
    Compile(Vec<CompileError>),
    #[error("runtime error at {0}")]
    Runtime(#[from] Fault),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),
}

impl From<Vec<CompileError>> for PipelineError {
    fn from(errors: Vec<CompileError>) -> Self {
        Self::Compile(errors)
    }
}

fn describe_compile_errors(errors: &[CompileError]) -> String {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} compile error(s): {}", errors.len(), lines.join("; "))
}

/// Translates and performs programs. Built via `Theatre::builder()`.
pub struct Theatre {
    lexicon: Lexicon,
    seed: u64,
}

/// Builder for constructing a `Theatre`.
pub struct TheatreBuilder {
    lexicon_path: Option<String>,
    seed: u64,
    /// Directly provided lexicon (for testing without files).
    lexicon: Option<Lexicon>,
}

impl Theatre {
    pub fn builder() -> TheatreBuilder {
        TheatreBuilder {
            lexicon_path: None,
            seed: 0,
            lexicon: None,
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn translator(&self) -> Translator<'_> {
        Translator::new(&self.lexicon, self.seed)
    }

    /// Structured form to prose form.
    pub fn dramatize(&self, program: &Program) -> Result<Play, PipelineError> {
        Ok(self.translator().to_prose(program)?)
    }

    /// Prose form to structured form.
    pub fn transcribe(&self, play: &Play) -> Result<Program, PipelineError> {
        Ok(self.translator().to_structured(play)?)
    }

    pub fn compile(&self, program: &Program) -> Result<Compiled, PipelineError> {
        Ok(engine::compile(program)?)
    }

    /// Compile and run a program to completion.
    pub fn perform<C: Console>(&self, program: &Program, console: &mut C) -> Result<(), PipelineError> {
        let compiled = self.compile(program)?;
        Engine::new(&compiled, console).run()?;
        Ok(())
    }

    pub fn perform_play<C: Console>(&self, play: &Play, console: &mut C) -> Result<(), PipelineError> {
        let program = self.transcribe(play)?;
        self.perform(&program, console)
    }

    /// Load a structured program from a RON file.
    pub fn load_program(path: &Path) -> Result<Program, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }

    /// Load a play from its text layout.
    pub fn load_play(path: &Path) -> Result<Play, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Play::parse(&contents)?)
    }

    /// Load a program from either form: `.ron` files hold the structured
    /// form, anything else is read as a play.
    pub fn load(&self, path: &Path) -> Result<Program, PipelineError> {
        if path.extension().is_some_and(|ext| ext == "ron") {
            Self::load_program(path)
        } else {
            self.transcribe(&Self::load_play(path)?)
        }
    }

    /// Serialize a program to pretty RON.
    pub fn to_ron(program: &Program) -> Result<String, PipelineError> {
        let config = ron::ser::PrettyConfig::new().struct_names(true);
        Ok(ron::ser::to_string_pretty(program, config)?)
    }
}

impl TheatreBuilder {
    pub fn lexicon_path(mut self, path: &str) -> Self {
        self.lexicon_path = Some(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Provide a lexicon directly.
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn build(self) -> Result<Theatre, PipelineError> {
        let lexicon = match (self.lexicon, self.lexicon_path) {
            (Some(lexicon), _) => {
                lexicon.validate()?;
                lexicon
            }
            (None, Some(path)) => Lexicon::load_from_ron(Path::new(&path))?,
            (None, None) => Lexicon::standard(),
        };
        tracing::debug!(seed = self.seed, cast = lexicon.cast.len(), "theatre ready");
        Ok(Theatre {
            lexicon,
            seed: self.seed,
        })
    }
}

/// Translate: convert a program between its structured and prose forms.
///
/// Usage: translate <input> [--to prose|structured] [--seed <n>] [--lexicon <path>] [--output <path>]
///
/// Without `--to`, `.ron` input becomes a play and anything else becomes RON.
use clap::{Parser, ValueEnum};
use soliloquy::core::pipeline::{PipelineError, Theatre};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Form {
    Prose,
    Structured,
}

#[derive(Parser, Debug)]
#[clap(version, about = "Translate between plays and structured programs")]
struct Cli {
    /// The program to translate
    #[clap(value_parser)]
    input: PathBuf,

    /// Form to produce
    #[clap(long, value_enum)]
    to: Option<Form>,

    /// Seed for word choice
    #[clap(long, value_parser, default_value_t = 0)]
    seed: u64,

    /// Lexicon RON file replacing the bundled vocabulary
    #[clap(long, value_parser)]
    lexicon: Option<String>,

    /// Write here instead of stdout
    #[clap(long, short, value_parser)]
    output: Option<PathBuf>,
}

fn main() {
    let subscriber = Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env());
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install logging: {e}");
    }

    let cli = Cli::parse();
    match run(&cli) {
        Ok(text) => match &cli.output {
            Some(path) => {
                if let Err(e) = std::fs::write(path, text) {
                    eprintln!("Error writing {}: {e}", path.display());
                    std::process::exit(1);
                }
            }
            None => print!("{text}"),
        },
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, PipelineError> {
    let mut builder = Theatre::builder().seed(cli.seed);
    if let Some(path) = &cli.lexicon {
        builder = builder.lexicon_path(path);
    }
    let theatre = builder.build()?;

    let is_ron = cli.input.extension().is_some_and(|ext| ext == "ron");
    let target = cli.to.unwrap_or(if is_ron { Form::Prose } else { Form::Structured });
    let program = theatre.load(&cli.input)?;
    match target {
        Form::Prose => Ok(theatre.dramatize(&program)?.render()),
        Form::Structured => Theatre::to_ron(&program),
    }
}

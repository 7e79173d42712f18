/// Perform: run a program through the execution engine.
///
/// Usage: perform <program> [--lexicon <path>] [--seed <n>] [--debug]
///
/// `.ron` files are read as structured programs, anything else as a play.
/// Set `RUST_LOG=soliloquy=debug` to follow translation and jumps.
use clap::Parser;
use soliloquy::core::console::StdConsole;
use soliloquy::core::pipeline::{PipelineError, Theatre};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Parser, Debug)]
#[clap(version, about = "Run a play or a structured program")]
struct Cli {
    /// The program to perform
    #[clap(value_parser)]
    program: PathBuf,

    /// Lexicon RON file replacing the bundled vocabulary
    #[clap(long, value_parser)]
    lexicon: Option<String>,

    /// Seed for word choice when a play is read back
    #[clap(long, value_parser, default_value_t = 0)]
    seed: u64,

    /// Report every executed operation on stderr
    #[clap(long)]
    debug: bool,
}

fn main() {
    let subscriber = Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env());
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install logging: {e}");
    }

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let mut builder = Theatre::builder().seed(cli.seed);
    if let Some(path) = &cli.lexicon {
        builder = builder.lexicon_path(path);
    }
    let theatre = builder.build()?;
    let program = theatre.load(&cli.program)?;
    let mut console = StdConsole::new(cli.debug);
    theatre.perform(&program, &mut console)
}

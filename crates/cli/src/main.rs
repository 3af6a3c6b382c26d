mod env_file;
mod grammar;
mod report;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use cmdgram::{ParseOutcome, usage};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::env_file::LayeredEnv;
use crate::grammar::{BuiltGrammar, GrammarFile};
use crate::report::ParseReport;

#[derive(Parser)]
#[command(name = "cmdgram")]
#[command(version, about = "Run argument vectors against a declarative command-line grammar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample grammar.json
    Init(InitArgs),

    /// Validate a grammar file
    Check(CheckArgs),

    /// Print usage for the application or one of its commands
    Usage(UsageArgs),

    /// Parse arguments against a grammar and print the resulting values
    Parse(ParseArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Directory to write into (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite an existing grammar.json
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct CheckArgs {
    /// Grammar file
    #[arg(value_name = "GRAMMAR")]
    grammar: PathBuf,

    /// Read environment defaults from this file as well
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Print the resolved grammar model as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct UsageArgs {
    /// Grammar file
    #[arg(value_name = "GRAMMAR")]
    grammar: PathBuf,

    /// Command path to describe (default: the application)
    #[arg(value_name = "COMMAND")]
    command: Vec<String>,
}

#[derive(Parser)]
struct ParseArgs {
    /// Grammar file
    #[arg(value_name = "GRAMMAR")]
    grammar: PathBuf,

    /// Read environment defaults from this file as well
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Arguments to parse, after `--`
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Check(args) => check_command(args),
        Commands::Usage(args) => usage_command(args),
        Commands::Parse(args) => {
            let code = parse_command(args)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = grammar::write_default_grammar(&dir, args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {} to describe your CLI", path.display());
    eprintln!("  2. Run: cmdgram check {}", path.display());
    eprintln!("  3. Run: cmdgram parse {} -- --help", path.display());

    Ok(())
}

/// Load the file, declare it, and run the structural checks.
fn load(path: &Path, env: &LayeredEnv) -> Result<BuiltGrammar> {
    let mut built = GrammarFile::from_file(path)?.build()?;
    built
        .app
        .init_with_env(env)
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;
    Ok(built)
}

fn check_command(args: CheckArgs) -> Result<()> {
    tracing::debug!("executing check command");

    let env = LayeredEnv::load(args.env_file.as_deref())?;
    let built = load(&args.grammar, &env)?;
    let model = built.app.model();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        let flattened = model.flattened_commands().len();
        eprintln!("OK: {}", args.grammar.display());
        eprintln!("Application: {}", model.name);
        eprintln!("Root flags: {}", model.flags.len());
        eprintln!("Leaf commands: {flattened}");
    }
    Ok(())
}

fn usage_command(args: UsageArgs) -> Result<()> {
    tracing::debug!("executing usage command");

    let built = load(&args.grammar, &LayeredEnv::default())?;
    let text = usage::render(&built.app.model(), &args.command.join(" "))?;
    print!("{text}");
    Ok(())
}

/// Returns the status the process should exit with.
fn parse_command(args: ParseArgs) -> Result<i32> {
    tracing::debug!("executing parse command");

    let env = LayeredEnv::load(args.env_file.as_deref())?;
    let mut built = load(&args.grammar, &env)?;

    let outcome = match built.app.parse(args.args.as_slice()) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}: error: {err}", built.app.name());
            return Ok(1);
        }
    };

    match outcome {
        ParseOutcome::Command(command) => {
            let report = ParseReport::collect(&built, &command);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print_human();
            }
            Ok(0)
        }
        ParseOutcome::Help { command } => {
            print!("{}", usage::render(&built.app.model(), &command)?);
            Ok(0)
        }
        ParseOutcome::Version(version) => {
            println!("{version}");
            Ok(0)
        }
        ParseOutcome::Exit(code) => Ok(code),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

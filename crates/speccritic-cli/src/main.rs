//! SpecCritic CLI entry point.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod check;

use check::{CheckArgs, CheckStatus};

/// Evaluate software specifications for defects.
///
/// SpecCritic treats a SPEC.md file as a formal contract and reports
/// defects before implementation begins.
#[derive(Debug, Parser)]
#[command(name = "speccritic", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a specification and produce a review
    Check(CheckArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Exit code for a command line clap rejected or answered itself.
fn parse_exit_code(err: &clap::Error) -> u8 {
    use clap::error::ErrorKind;

    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => check::EXIT_INPUT,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout, usage errors to stderr.
            let _ = err.print();
            return ExitCode::from(parse_exit_code(&err));
        }
    };

    match cli.command {
        Commands::Check(args) => {
            init_tracing(args.verbose);

            match check::execute(args).await {
                Ok(CheckStatus::Passed) => ExitCode::SUCCESS,
                Ok(CheckStatus::FailOn { verdict, threshold }) => {
                    eprintln!(
                        "Error: verdict {} meets or exceeds --fail-on threshold {}",
                        verdict, threshold
                    );
                    ExitCode::from(check::EXIT_FAIL_ON)
                }
                Err(err) => {
                    eprintln!("Error: {:#}", err);
                    ExitCode::from(check::exit_code(&err))
                }
            }
        }
    }
}

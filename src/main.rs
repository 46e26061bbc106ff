//! Job Backup CLI entry point.

use clap::Parser;
use jobbackup::cli::commands::{self, Workspace};
use jobbackup::cli::{Cli, Commands};
use jobbackup::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,zip=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    match &cli.command {
        Commands::Version => commands::version::execute(json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),

        // Export side
        Commands::List => commands::list::execute(&Workspace::resolve(cli)?, json),
        Commands::Export {
            selection,
            output,
            out_dir,
        } => commands::export::execute(
            &Workspace::resolve(cli)?,
            selection,
            output.as_ref(),
            out_dir.as_ref(),
            json,
        ),

        // Import side
        Commands::Import { command } => {
            commands::import::execute(command, &Workspace::resolve(cli)?, json)
        }
        Commands::Session { command } => {
            commands::session::execute(command, &Workspace::resolve(cli)?, json)
        }
    }
}

//! Longform CLI entry point.

use clap::Parser;
use longform::cli::commands;
use longform::cli::{Cli, Commands};
use longform::error::Error;
use longform::sync::Direction;
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
            2 => EnvFilter::new("debug,notify=info"),
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
    let vault = cli.vault.as_deref();

    match &cli.command {
        Commands::Drafts => commands::drafts::execute(vault, json),
        Commands::Select { index } => {
            commands::drafts::execute_select(index.as_deref(), vault, json)
        }
        Commands::New(args) => commands::new::execute(args, vault, json),

        // Scenes
        Commands::Scenes { index } => commands::scenes::execute_list(index, vault, json),
        Commands::Indent { scene } => commands::scenes::execute_indent(scene, false, vault, json),
        Commands::Unindent { scene } => commands::scenes::execute_indent(scene, true, vault, json),
        Commands::AddScene(args) => commands::scenes::execute_add(args, vault, json),
        Commands::Next(args) => {
            commands::scenes::execute_navigate(args, Direction::Next, vault, json)
        }
        Commands::Prev(args) => {
            commands::scenes::execute_navigate(args, Direction::Previous, vault, json)
        }
        Commands::Renumber => commands::scenes::execute_renumber(vault, json),

        Commands::Watch => commands::watch::execute(vault, json),
        Commands::Version => commands::version::execute(json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}

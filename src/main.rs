mod cli;
mod commands;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Command::Repo(args) if args.debug);
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet, debug))
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Command::Repo(args) => commands::repo::run(&ctx, args),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "ght", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, ctx.verbose);
            ExitCode::FAILURE
        }
    }
}

/// Map the verbosity flags to a log level.
fn log_level(verbose: u8, quiet: bool, debug: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 if debug => log::LevelFilter::Debug,
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Print a fatal error with its cause chain and, for provisioning errors,
/// what to check next.
fn report(err: &anyhow::Error, verbose: u8) {
    ui::error(&err.to_string());

    if verbose > 0 {
        for cause in err.chain().skip(1) {
            ui::hint(&format!("caused by: {cause}"));
        }
    }

    if let Some(err) = err.downcast_ref::<repokit::Error>() {
        let category = err.category();
        ui::hint(&format!("{}: {}", category, category.advice()));
    }
}

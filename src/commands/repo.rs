//! `ght repo`: create or reconcile a repository from a template.

use crate::Context;
use crate::cli::RepoArgs;
use crate::ui;
use anyhow::Result;
use repokit::backend::github::GitHubBackend;
use repokit::{Client, RepoOptions, RunResult};

/// Run the repo command.
pub fn run(ctx: &Context, args: RepoArgs) -> Result<()> {
    log::debug!("debug mode enabled");

    let opts = options(&args);
    let backend =
        GitHubBackend::with_api_base(args.token.clone().unwrap_or_default(), &args.api_url)?;
    let client = Client::with_backend(Box::new(backend));

    let result = client.provision(&opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !ctx.quiet {
        report(&result, &opts);
    }

    Ok(())
}

/// Build the run inputs from the command-line arguments.
fn options(args: &RepoArgs) -> RepoOptions {
    RepoOptions::new(&args.owner, &args.name, &args.template)
        .description(&args.description)
        .topics(args.topics.iter().filter(|t| !t.is_empty()))
        .branches(args.branches.iter().filter(|b| !b.is_empty()))
        .debug(args.debug)
}

fn report(result: &RunResult, opts: &RepoOptions) {
    if result.created {
        ui::success(&format!("Created {}", result.full_name));
    } else {
        ui::info(&format!("{} already exists, configuration applied", result.full_name));
    }
    if !opts.topics.is_empty() {
        ui::kv("topics", &opts.topics.join(", "));
    }
    if !opts.branches.is_empty() {
        ui::kv("branches", &opts.branches.join(", "));
    }
}

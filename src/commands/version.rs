//! `ght version`: print build metadata.

/// Version of the binary.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date, injected at build time through `GHT_BUILD_DATE`.
const BUILD_DATE: Option<&str> = option_env!("GHT_BUILD_DATE");

/// Commit the binary was built from, injected through `GHT_GIT_HASH`.
const GIT_HASH: Option<&str> = option_env!("GHT_GIT_HASH");

/// Run the version command.
pub fn run() {
    print!("{}", render());
}

fn render() -> String {
    format!(
        "\nVersion: {}\nBuildDate: {}\nGitCommit: {}\n",
        VERSION,
        BUILD_DATE.unwrap_or("unknown"),
        GIT_HASH.unwrap_or("unknown"),
    )
}

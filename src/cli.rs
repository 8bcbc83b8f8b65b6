//! Shared command-line plumbing for the capture programs.

use clap::Parser;

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Parse arguments, exiting with status 1 and the usage text on bad input.
///
/// `--help` and `--version` still print to stdout and exit 0.
pub fn parse_args<A: Parser>() -> A {
    match A::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(1)
        }
        Err(err) => err.exit(),
    }
}

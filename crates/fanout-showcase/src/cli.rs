#![forbid(unsafe_code)]

//! Command-line argument parsing for the showcase.
//!
//! Parses args manually (no external dependencies) to keep the binary
//! lean. Supports environment variable overrides via `FANOUT_SHOWCASE_*`
//! prefix.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
fanout-showcase — synchronous dispatch walkthrough

USAGE:
    fanout-showcase [OPTIONS]

OPTIONS:
    --user=NAME       User name for the login/logout events (default: howard)
    --product=ID      Add a product to the cart; repeatable (default: shoe-42)
    --help, -h        Show this help message
    --version, -V     Show version

ENVIRONMENT:
    FANOUT_SHOWCASE_USER    Overrides the default user name
    RUST_LOG                tracing filter (e.g. RUST_LOG=fanout=trace)
";

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct Opts {
    pub user: String,
    pub products: Vec<String>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            user: env::var("FANOUT_SHOWCASE_USER").unwrap_or_else(|_| "howard".to_string()),
            products: Vec::new(),
        }
    }
}

impl Opts {
    /// Parse `std::env::args`, exiting on `--help`/`--version` or on an
    /// unrecognized flag.
    pub fn parse() -> Self {
        let mut opts = Opts::default();
        for arg in env::args().skip(1) {
            if let Some(value) = arg.strip_prefix("--user=") {
                opts.user = value.to_string();
            } else if let Some(value) = arg.strip_prefix("--product=") {
                opts.products.push(value.to_string());
            } else if arg == "--help" || arg == "-h" {
                print!("{HELP_TEXT}");
                process::exit(0);
            } else if arg == "--version" || arg == "-V" {
                println!("fanout-showcase {VERSION}");
                process::exit(0);
            } else {
                eprintln!("unrecognized option: {arg}");
                eprintln!("try --help");
                process::exit(2);
            }
        }
        if opts.products.is_empty() {
            opts.products.push("shoe-42".to_string());
        }
        opts
    }
}

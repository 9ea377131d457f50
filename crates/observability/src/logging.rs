use eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use crate::LogArgs;

/// Filter for `args`.
///
/// Precedence:
/// 1. `--quiet` shows errors only
/// 2. otherwise `RUST_LOG` if set, else a level from the verbosity flags
/// 3. `--log.filter` directives are added on top
pub fn build_filter(args: &LogArgs) -> EnvFilter {
    filter_from(args, std::env::var(EnvFilter::DEFAULT_ENV).ok())
}

fn filter_from(args: &LogArgs, env: Option<String>) -> EnvFilter {
    if args.quiet {
        return EnvFilter::new("error");
    }

    let base_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let mut filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(base_level));

    if let Some(custom_filter) = &args.filter {
        for directive in custom_filter.split(',') {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
    }

    filter
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(args))
        .with_writer(std::io::stderr);

    if args.json {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    }
    .map_err(|e| eyre!("failed to install tracing subscriber: {e}"))
}

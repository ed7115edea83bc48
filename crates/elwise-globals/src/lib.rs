use anyhow::bail;
use clap::{Args, ValueEnum};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

static GLOBAL_OPTS: OnceCell<GlobalOpts> = OnceCell::new();

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    // write output to a file instead of a stdout
    #[arg(short = 'o', long, value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    // pretty | json
    #[arg(
        short = 'F',
        long,
        value_enum,
        default_value = "pretty",
        value_name = "FMT",
        global = true
    )]
    pub format: OutputFormat,

    // verbosity (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

pub fn log_filter(level: u8) -> String {
    let level = match level {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("elwise={}", level)
}

// -v maps onto RUST_LOG for everything under the elwise_* crates;
// an explicit RUST_LOG still wins
pub fn setup_logging(level: u8) {
    let filter = log_filter(level);
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

pub fn init_globals(opts: GlobalOpts) -> anyhow::Result<()> {
    if GLOBAL_OPTS.set(opts).is_err() {
        bail!("global options already initialized");
    }

    let opts = get_globals();
    setup_logging(opts.verbose);
    log::debug!("globals initialised: {:?}", opts);
    Ok(())
}

/// Falls back to defaults when nothing was initialised (library callers,
/// tests).
pub fn get_globals() -> &'static GlobalOpts {
    GLOBAL_OPTS.get_or_init(|| GlobalOpts {
        output: None,
        format: OutputFormat::Pretty,
        verbose: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        g: GlobalOpts,
    }

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(log_filter(0), "elwise=info");
        assert_eq!(log_filter(1), "elwise=debug");
        assert_eq!(log_filter(5), "elwise=trace");
    }

    #[test]
    fn test_global_opts_parse() {
        let cli = TestCli::try_parse_from(["t", "-vv", "--format", "json", "-o", "out.json"]).unwrap();
        assert_eq!(cli.g.verbose, 2);
        assert_eq!(cli.g.format, OutputFormat::Json);
        assert_eq!(cli.g.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_global_opts_defaults() {
        let cli = TestCli::try_parse_from(["t"]).unwrap();
        assert_eq!(cli.g.verbose, 0);
        assert_eq!(cli.g.format, OutputFormat::Pretty);
        assert!(cli.g.output.is_none());
    }

    #[test]
    fn test_double_init_is_an_error() {
        let opts = TestCli::try_parse_from(["t"]).unwrap().g;
        let _ = init_globals(opts.clone());
        assert!(init_globals(opts).is_err());
        assert_eq!(get_globals().format, OutputFormat::Pretty);
    }
}

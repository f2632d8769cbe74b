//! Command-line interface for Hum
//!
//! Handles argument parsing and logging configuration.

use clap::Parser;
use log::LevelFilter;

/// Hum - Microphone orb visualizer
#[derive(Parser, Debug)]
#[command(name = "hum")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace (includes GUI framework deps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    // Set hum modules to requested verbosity level
    builder.filter_module("hum", args.log_level());

    // GUI framework modules only at -vvv (very verbose)
    if args.verbose >= 3 {
        builder.filter_module("naga", args.log_level());
        builder.filter_module("blade_graphics", args.log_level());
        builder.filter_module("gpui", args.log_level());
        builder.filter_module("fontdb", args.log_level());
    }

    builder.format_timestamp_millis().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        let args = Args {
            verbose: 3,
            quiet: true,
        };
        assert_eq!(args.log_level(), LevelFilter::Error);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let levels = [
            (0, LevelFilter::Warn),
            (1, LevelFilter::Info),
            (2, LevelFilter::Debug),
            (3, LevelFilter::Trace),
            (7, LevelFilter::Trace),
        ];
        for (verbose, expected) in levels {
            let args = Args {
                verbose,
                quiet: false,
            };
            assert_eq!(args.log_level(), expected);
        }
    }
}

//! Command-line argument parsing for the demo host.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, WritePlacement};

/// cellmeta demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "cellmeta-demo", about = "Simulated host for cell attribute relocation")]
pub struct CliArgs {
    /// When the relocation write pass runs.
    #[arg(long, value_enum)]
    pub placement: Option<WritePlacement>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Seed for the randomized push run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of random pushes to simulate.
    #[arg(long)]
    pub pushes: Option<u32>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(placement) = args.placement {
            self.relocation.write_placement = placement;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(seed) = args.seed {
            self.demo.seed = seed;
        }
        if let Some(pushes) = args.pushes {
            self.demo.random_pushes = pushes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from([
            "cellmeta-demo",
            "--placement",
            "immediate",
            "--seed",
            "9",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.relocation.write_placement, WritePlacement::Immediate);
        assert_eq!(config.demo.seed, 9);
        // Non-overridden fields retain defaults
        assert_eq!(config.debug.log_level, "info");
        assert_eq!(config.demo.random_pushes, 500);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        let args = CliArgs::parse_from(["cellmeta-demo"]);
        config.apply_cli_overrides(&args);
        assert_eq!(config, original);
    }

    #[test]
    fn test_unknown_placement_rejected() {
        let result = CliArgs::try_parse_from(["cellmeta-demo", "--placement", "later"]);
        assert!(result.is_err());
    }
}

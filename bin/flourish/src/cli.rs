//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flourish_garden::{Flower, PLOT_COUNT};
use flourish_observability::LogArgs;

/// flourish - journal eco-friendly actions, grow a garden, climb the leaderboard
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration (applies to all subcommands).
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Data directory for config, scores and session state.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) datadir: Option<PathBuf>,

    /// Act as this user instead of the saved anonymous identity.
    #[arg(long, global = true, value_name = "ID")]
    pub(crate) user: Option<String>,

    /// Score actions with the offline keyword oracle.
    #[arg(long, global = true)]
    pub(crate) offline: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Show the current user and their published score.
    Whoami,
    /// Publish an absolute point total.
    Record {
        points: u64,
        /// Display name to set along with the points.
        #[arg(long)]
        name: Option<String>,
    },
    /// Change the display name.
    Rename { name: String },
    /// Print the current top of the leaderboard.
    Leaderboard,
    /// Print the leaderboard and every change to it until interrupted.
    Watch,
    /// Journal an action: score it, credit the points and publish the total.
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Streak, category breakdown, wallet and garden.
    Stats,
    /// Buy a flower for the current garden.
    Buy { flower: Flower },
    /// Plant the purchased flower.
    Plant {
        /// Plot number.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=PLOT_COUNT as i64))]
        plot: u8,
    },
    /// Move on to the next garden theme once every plot is planted.
    Advance,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["flourish", "record", "42", "--name", "fern"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Record { points: 42, name: Some(ref n) } if n == "fern"
        ));

        let cli = Cli::try_parse_from(["flourish", "buy", "prickly pear", "-vv"]).unwrap();
        assert!(matches!(cli.command, Commands::Buy { flower: Flower::PricklyPear }));
        assert_eq!(cli.logs.verbosity, 2);

        let cli = Cli::try_parse_from(["flourish", "--user", "u1", "plant", "12"]).unwrap();
        assert_eq!(cli.user.as_deref(), Some("u1"));
        assert!(matches!(cli.command, Commands::Plant { plot: 12 }));
    }

    #[test]
    fn test_plot_out_of_range() {
        assert!(Cli::try_parse_from(["flourish", "plant", "0"]).is_err());
        assert!(Cli::try_parse_from(["flourish", "plant", "13"]).is_err());
    }
}

//! Command-line surface: one subcommand group per business category

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::entity::EntityKind;
use commands::records::RecordCommands;

#[derive(Parser, Debug)]
#[command(
    name = "ecc-enhance",
    version,
    about = "Track visit records for parks, companies, hotels and chain stores"
)]
pub struct Cli {
    /// Config file (default: <config_dir>/ecc-enhance/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overrides the config
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Business parks and the companies they host
    Park {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Company visit records
    Company {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Hotel visit records
    Hotel {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Chain brands and their stores
    #[command(name = "chain_band")]
    ChainBand {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Chain store visit records
    #[command(name = "chain_store")]
    ChainStore {
        #[command(subcommand)]
        action: RecordCommands,
    },
}

impl Commands {
    pub fn into_parts(self) -> (EntityKind, RecordCommands) {
        match self {
            Commands::Park { action } => (EntityKind::Park, action),
            Commands::Company { action } => (EntityKind::Company, action),
            Commands::Hotel { action } => (EntityKind::Hotel, action),
            Commands::ChainBand { action } => (EntityKind::ChainBand, action),
            Commands::ChainStore { action } => (EntityKind::ChainStore, action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_subcommands_use_slugs() {
        for kind in EntityKind::all_variants() {
            let cli = Cli::try_parse_from(["ecc-enhance", kind.slug(), "list"]).unwrap();
            let (parsed, action) = cli.command.into_parts();
            assert_eq!(parsed, *kind);
            assert!(matches!(action, RecordCommands::List { .. }));
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ecc-enhance",
            "company",
            "import",
            "visits.xlsx",
            "--database",
            "/tmp/x.db",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
        match cli.command.into_parts() {
            (EntityKind::Company, RecordCommands::Import { file }) => {
                assert_eq!(file, PathBuf::from("visits.xlsx"))
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["ecc-enhance", "questionnaire", "list"]).is_err());
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rentbot")]
#[command(author, version, about = "Telegram bot for a short-term apartment rental service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Create or migrate the database schema and exit
    InitDb,

    /// Print 7 and 30 day statistics
    Stats,

    /// Load promo codes from a file, one code per line
    ImportCodes {
        /// Pool kind: welcome, giveaway, manual or referral_reward
        #[arg(short, long)]
        kind: String,

        /// Path to the file with codes
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_codes_args() {
        let cli = Cli::try_parse_from(["rentbot", "import-codes", "--kind", "manual", "codes.txt"]).unwrap();
        match cli.command {
            Some(Commands::ImportCodes { kind, file }) => {
                assert_eq!(kind, "manual");
                assert_eq!(file, PathBuf::from("codes.txt"));
            }
            _ => panic!("expected import-codes"),
        }
    }

    #[test]
    fn test_no_command_defaults_to_none() {
        let cli = Cli::try_parse_from(["rentbot"]).unwrap();
        assert!(cli.command.is_none());
    }
}

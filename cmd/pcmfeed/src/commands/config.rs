//! Config command.

use clap::{Args, Subcommand};

use crate::Cli;
use crate::config::{self as cfg, Config};

/// Manage CLI configuration
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let path = cfg::config_path(cli.config.as_deref())?;
        match &self.command {
            ConfigSubcommand::Path => {
                println!("{}", path.display());
            }
            ConfigSubcommand::Show => {
                let config = cfg::load_config(&path)?;
                print!("{}", serde_yaml::to_string(&config)?);
            }
            ConfigSubcommand::Init { force } => {
                if path.exists() && !force {
                    anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
                }
                cfg::save_config(&path, &Config::default())?;
                println!("Wrote {}", path.display());
            }
        }
        Ok(())
    }
}

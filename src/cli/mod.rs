pub mod monitor;
pub mod report;


use std::error::Error;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use dualsense_bridge::config::BridgeConfig;
use monitor::handle_monitor;
use report::handle_translate;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the config file (defaults to the first one found in the
    /// config directories)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Connect to the controller and print every translated report
    Monitor,
    /// Translate a raw input report given in hex (e.g. "01 80 80 80 80 00 00 00 28 00 00")
    Translate {
        /// Report bytes in hex. Whitespace is ignored.
        report: Vec<String>,
    },
    /// Print the effective configuration in YAML format
    Config,
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    let Some(cmd) = args.cmd else {
        Args::command().print_help()?;
        return Ok(());
    };

    match cmd {
        Commands::Monitor => {
            let config = BridgeConfig::load(args.config.as_deref());
            handle_monitor(config).await?
        }
        Commands::Translate { report } => handle_translate(report.join(" ").as_str())?,
        Commands::Config => {
            let config = BridgeConfig::load(args.config.as_deref());
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

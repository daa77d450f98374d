use clap::Subcommand;

pub mod config;
pub mod queue;

use self::config::ConfigCommands;
use self::queue::QueueCommands;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or maintain the persisted retry queue
    #[command(visible_alias = "q")]
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Show the resolved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

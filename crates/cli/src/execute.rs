use crate::commands::Commands;
use crate::Cli;
use resindex_config::{Settings, SettingsLoader};
use resindex_core::Result;

impl Cli {
    /// Resolve settings and run the selected command, returning its output
    pub async fn run(self) -> Result<String> {
        let settings = self.load_settings()?;
        self.command.execute(settings).await
    }

    fn load_settings(&self) -> Result<Settings> {
        let mut loader = SettingsLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        let mut settings = loader.load()?;
        if let Some(path) = &self.queue_file {
            settings.indexer.retry_queue_path = Some(path.clone());
        }
        Ok(settings)
    }
}

impl Commands {
    pub async fn execute(self, settings: Settings) -> Result<String> {
        match self {
            Commands::Queue { command } => command.execute(&settings).await,
            Commands::Config { command } => command.execute(&settings),
        }
    }
}

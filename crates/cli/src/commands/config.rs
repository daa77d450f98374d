use clap::Subcommand;
use resindex_config::Settings;
use resindex_core::Result;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved settings as JSON
    Show,
}

impl ConfigCommands {
    pub fn execute(self, settings: &Settings) -> Result<String> {
        match self {
            ConfigCommands::Show => Ok(serde_json::to_string_pretty(settings)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_prints_both_sections() {
        let output = ConfigCommands::Show.execute(&Settings::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["indexer"]["on_llm_unavailable"], "store_raw_and_retry");
        assert_eq!(value["llm"]["failure_threshold"], 5);
    }
}

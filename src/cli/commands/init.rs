//! Init command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the init command: write a default configuration and prepare the
/// data directory.
pub fn run_init(settings: &Settings) -> Result<()> {
    let config_path = Settings::default_config_path();

    if config_path.exists() {
        Output::info(&format!(
            "Configuration already exists at {}",
            config_path.display()
        ));
    } else {
        settings.save()?;
        Output::success(&format!(
            "Wrote default configuration to {}",
            config_path.display()
        ));
    }

    std::fs::create_dir_all(settings.data_dir())?;
    Output::kv("data directory", &settings.data_dir().display().to_string());
    Output::kv("durable cache", &settings.cache_path().display().to_string());

    if std::env::var("OPENAI_API_KEY").is_err() {
        Output::warning("OPENAI_API_KEY is not set; embedding calls will fail.");
    }

    Ok(())
}

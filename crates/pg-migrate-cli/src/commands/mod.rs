//! CLI command implementations.

pub mod info;
pub mod migrate;
pub mod reports;
pub mod setup;

use std::path::Path;

use pg_migrate_core::config::ConfigFile;
use pg_migrate_core::Error;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "db_config.json";

/// Print a failure and exit with its stage-distinct code.
pub(crate) fn fail(err: Error) -> ! {
    match err.stage() {
        Some(stage) => eprintln!("\nFAILED at {} stage: {}", stage, err),
        None => eprintln!("\nFAILED: {}", err),
    }
    std::process::exit(err.exit_code());
}

/// Resolve the config file. An explicit path must load; the default path is
/// used only when present, so flag-only invocations stay valid.
pub(crate) async fn load_config(path: Option<&Path>) -> ConfigFile {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return ConfigFile::default();
            }
            default
        }
    };

    ConfigFile::load(path).await.unwrap_or_else(|e| fail(e))
}

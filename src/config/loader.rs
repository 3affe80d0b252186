//! Settings loading from the environment.

use clap::Parser;
use std::ffi::OsString;

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Missing or malformed variables/flags (includes `--help`/`--version`).
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from the process environment and arguments.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(std::env::args_os())
}

/// Load and validate settings from explicit arguments (environment
/// variables still fill anything the arguments leave out).
pub fn load_settings_from<I, T>(args: I) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut settings = Settings::try_parse_from(args)?;
    settings.assemble_database_urls();
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}

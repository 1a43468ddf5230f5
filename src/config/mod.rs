pub mod schema;

use std::path::Path;

use schema::AppConfig;

use crate::error::{Result, SliderError};

/// Load and parse configuration from a TOML file.
///
/// # Errors
/// Returns `SliderError::ConfigNotFound` if the file doesn't exist,
/// `SliderError::Io` on read errors, `SliderError::TomlParse` on syntax
/// errors, or `SliderError::Config` on validation failures.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(SliderError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;

    for command in config.hooks.values_mut() {
        *command = expand_env_vars(command);
    }

    validate(&config)?;
    Ok(config)
}

/// Expand `${VAR}` patterns, so hook commands can reference paths from
/// the daemon's environment. Unset variables are left verbatim.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str("${");
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Validate config constraints.
fn validate(config: &AppConfig) -> Result<()> {
    let daemon = &config.sliderd;

    if daemon.commit_poll_ms == 0 {
        return Err(SliderError::Config("commit_poll_ms must be > 0".to_string()));
    }
    if daemon.commit_timeout_ms < daemon.commit_poll_ms {
        return Err(SliderError::Config(
            "commit_timeout_ms must be >= commit_poll_ms".to_string(),
        ));
    }
    if daemon.dialog_timeout_ms == 0 {
        return Err(SliderError::Config("dialog_timeout_ms must be > 0".to_string()));
    }

    let codes = &daemon.slider_scan_codes;
    if codes.top == codes.middle || codes.top == codes.bottom || codes.middle == codes.bottom {
        return Err(SliderError::Config(
            "slider scan codes must be distinct".to_string(),
        ));
    }

    Ok(())
}

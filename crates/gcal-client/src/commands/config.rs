//! Configuration commands.

use std::path::Path;

use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The effective configuration as TOML, secrets left unresolved.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<String> {
    let body = toml::to_string_pretty(config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {e}")))?;
    Ok(format!("# {}\n{body}", config_path.display()))
}

pub fn validate(config: &ClientConfig, config_path: &Path) -> ClientResult<Value> {
    config.validate()?;
    Ok(json!({"valid": true, "config": config_path}))
}

pub fn path(config_path: &Path) -> Value {
    json!({"config": config_path, "exists": config_path.exists()})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_round_trips() {
        let mut config = ClientConfig::default();
        config.availability.start_hour = 10;
        let text = dump(&config, Path::new("/tmp/gcal/config.toml")).unwrap();
        assert!(text.starts_with("# /tmp/gcal/config.toml\n"));

        let reparsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn validate_reports_the_first_problem() {
        let mut config = ClientConfig::default();
        let path = Path::new("/tmp/gcal/config.toml");
        assert_eq!(validate(&config, path).unwrap()["valid"], true);

        config.availability.end_hour = 25;
        let err = validate(&config, path).unwrap_err();
        assert!(err.to_string().contains("[availability]"), "{err}");
    }

    #[test]
    fn path_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        assert_eq!(path(&file)["exists"], false);
        std::fs::write(&file, "").unwrap();
        assert_eq!(path(&file)["exists"], true);
    }
}

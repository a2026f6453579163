//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::HostConfig;
use crate::config::validation::{join_errors, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: HostConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_nested_repl_section() {
        let file = write_config(
            r#"
            [http]
            bind_address = "127.0.0.1:8088"

            [repl]
            port = 9200

            [repl.context]
            greeting = "hola mundo"

            [repl.shutdown]
            phase = "after_stop"
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.http.bind_address, "127.0.0.1:8088");
        assert_eq!(config.repl.port, 9200);
        assert!(config.repl.local_only);
        assert_eq!(
            config.repl.shutdown.phase,
            crate::host::StopPhase::AfterStop
        );
    }

    #[test]
    fn validation_errors_are_joined() {
        let file = write_config("[repl]\nport = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(
            err.to_string(),
            "Validation failed: port must be between 1 and 65535"
        );
    }

    #[test]
    fn out_of_range_port_is_a_parse_error() {
        let file = write_config("[repl]\nport = 70000\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}

//! `schemaforge.toml` loading and flag overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use schemaforge_core::{ConnectionDescriptor, Dialect, Error as CoreError, GenerationConfig};

pub const DEFAULT_CONFIG_FILE: &str = "schemaforge.toml";
pub const PASSWORD_ENV: &str = "SCHEMAFORGE_DB_PASSWORD";

/// On-disk configuration: a `[connection]` table next to the generation sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub connection: ConnectionDescriptor,
    #[serde(flatten)]
    pub generation: GenerationConfig,
}

/// Connection values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub dialect: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

pub fn parse_config(text: &str) -> Result<FileConfig, CoreError> {
    toml::from_str(text).map_err(|err| CoreError::Config(err.to_string()))
}

/// Load `path`, or `schemaforge.toml` in the working directory when present,
/// or the defaults. An explicit path that cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), CoreError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if !required && !path.is_file() {
        return Ok((FileConfig::default(), None));
    }
    let text = std::fs::read_to_string(&path)
        .map_err(|err| CoreError::Config(format!("{}: {err}", path.display())))?;
    Ok((parse_config(&text)?, Some(path)))
}

/// Apply flag values over the file's connection. A URL also fixes the dialect.
pub fn apply_connection_overrides(
    connection: &mut ConnectionDescriptor,
    overrides: &ConnectionOverrides,
    env_password: Option<String>,
) -> Result<(), CoreError> {
    if let Some(dialect) = &overrides.dialect {
        connection.dialect = dialect.parse()?;
    }
    if let Some(url) = &overrides.url {
        connection.url = Some(url.clone());
    }
    if let Some(url) = &connection.url {
        connection.dialect = Dialect::from_connection_url(url)?;
    }
    if let Some(host) = &overrides.host {
        connection.host = host.clone();
    }
    if let Some(port) = overrides.port {
        connection.port = Some(port);
    }
    if let Some(user) = &overrides.user {
        connection.username = user.clone();
    }
    if let Some(database) = &overrides.database {
        connection.database = database.clone();
    }
    if let Some(schema) = &overrides.schema {
        connection.schema = Some(schema.clone());
    }
    if connection.password.is_none() && connection.url.is_none() {
        connection.password = env_password.filter(|password| !password.is_empty());
    }
    Ok(())
}

/// Fail early when neither a URL nor a database name is configured.
pub fn ensure_connection(connection: &ConnectionDescriptor) -> Result<(), CoreError> {
    if connection.url.is_none() && connection.database.is_empty() {
        return Err(CoreError::Config(
            "no connection configured: pass --conn or --database, or set [connection] in the config file"
                .to_string(),
        ));
    }
    Ok(())
}

/// Command-line table selection replaces the file's lists when given.
pub fn apply_selection(config: &mut GenerationConfig, include: &[String], exclude: &[String]) {
    if !include.is_empty() {
        config.tables.include = include.to_vec();
    }
    if !exclude.is_empty() {
        config.tables.exclude = exclude.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_sections_merge_over_defaults() {
        let config = parse_config(
            r#"
[connection]
dialect = "mysql"
host = "db.internal"
username = "app"
database = "shop"

[features]
data_export = true

[export]
batch_size = 250

[tables]
exclude = ["migrations"]
"#,
        )
        .expect("config");
        assert_eq!(config.connection.dialect, Dialect::MySql);
        assert_eq!(config.connection.effective_port(), 3306);
        assert!(config.generation.features.data_export);
        assert!(config.generation.features.entities);
        assert_eq!(config.generation.export.batch_size, 250);
        assert_eq!(config.generation.tables.exclude, vec!["migrations".to_string()]);
    }

    #[test]
    fn unknown_values_are_configuration_errors() {
        let err = parse_config("[connection]\ndialect = \"oracle\"\n").expect_err("bad dialect");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn flags_override_file_values() {
        let mut connection = ConnectionDescriptor {
            host: "file-host".to_string(),
            database: "file_db".to_string(),
            ..ConnectionDescriptor::default()
        };
        let overrides = ConnectionOverrides {
            dialect: Some("mariadb".to_string()),
            host: Some("flag-host".to_string()),
            port: Some(3307),
            ..ConnectionOverrides::default()
        };
        apply_connection_overrides(&mut connection, &overrides, Some("secret".to_string()))
            .expect("overrides");
        assert_eq!(connection.dialect, Dialect::MySql);
        assert_eq!(connection.host, "flag-host");
        assert_eq!(connection.effective_port(), 3307);
        assert_eq!(connection.database, "file_db");
        assert_eq!(connection.password.as_deref(), Some("secret"));
        assert!(!connection.redacted().redacted.contains("secret"));
    }

    #[test]
    fn url_sets_dialect_and_skips_env_password() {
        let mut connection = ConnectionDescriptor::default();
        let overrides = ConnectionOverrides {
            url: Some("mysql://app:pw@localhost/shop".to_string()),
            ..ConnectionOverrides::default()
        };
        apply_connection_overrides(&mut connection, &overrides, Some("env".to_string()))
            .expect("overrides");
        assert_eq!(connection.dialect, Dialect::MySql);
        assert!(connection.password.is_none());
        ensure_connection(&connection).expect("url is enough");
        assert!(ensure_connection(&ConnectionDescriptor::default()).is_err());
    }

    #[test]
    fn selection_flags_replace_file_lists() {
        let mut config = GenerationConfig::default();
        config.tables.exclude = vec!["audit".to_string()];
        apply_selection(&mut config, &["users".to_string()], &[]);
        assert_eq!(config.tables.include, vec!["users".to_string()]);
        assert_eq!(config.tables.exclude, vec!["audit".to_string()]);
    }
}

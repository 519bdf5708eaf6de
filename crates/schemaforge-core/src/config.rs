//! Run configuration.
//!
//! Every section deserializes with defaults, so a partial TOML file merges
//! over the built-in values. The configuration is immutable once a run starts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::redaction::{RedactedConnection, redact_connection_string};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub paths: OutputPaths,
    pub features: FeatureToggles,
    pub crud: CrudOptions,
    pub entities: EntityOptions,
    pub sql: SqlOptions,
    pub export: ExportSettings,
    pub tables: TableSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub base_output: PathBuf,
    pub entities: PathBuf,
    pub crud: PathBuf,
    pub sql: PathBuf,
    pub data_export: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            base_output: PathBuf::from("./src"),
            entities: PathBuf::from("./src/entities"),
            crud: PathBuf::from("./src"),
            sql: PathBuf::from("./sql"),
            data_export: PathBuf::from("./data"),
        }
    }
}

impl OutputPaths {
    /// Re-root every relative path under `root`.
    pub fn rooted_at(&self, root: &std::path::Path) -> Self {
        let join = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            }
        };
        Self {
            base_output: join(&self.base_output),
            entities: join(&self.entities),
            crud: join(&self.crud),
            sql: join(&self.sql),
            data_export: join(&self.data_export),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub entities: bool,
    pub crud: bool,
    pub sql: bool,
    pub data_export: bool,
    pub generate_index: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            entities: true,
            crud: true,
            sql: true,
            data_export: false,
            generate_index: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudOptions {
    pub include_validation: bool,
    /// Emit API documentation decorators.
    pub include_swagger: bool,
    pub include_pagination: bool,
    pub include_filtering: bool,
    pub include_sorting: bool,
    pub include_relations: bool,
    pub generate_tests: bool,
    pub auth_guards: bool,
    pub use_dto: bool,
}

impl Default for CrudOptions {
    fn default() -> Self {
        Self {
            include_validation: true,
            include_swagger: true,
            include_pagination: true,
            include_filtering: true,
            include_sorting: true,
            include_relations: false,
            generate_tests: false,
            auth_guards: false,
            use_dto: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOptions {
    pub include_validation: bool,
    pub include_swagger: bool,
    pub include_relations: bool,
    pub generate_enums: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            include_validation: false,
            include_swagger: false,
            include_relations: true,
            generate_enums: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlOptions {
    pub include_drop_if_exists: bool,
    pub include_create_if_not_exists: bool,
    pub include_comments: bool,
    pub include_indexes: bool,
    pub mysql_engine: String,
    pub mysql_charset: String,
    pub mysql_collation: String,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            include_drop_if_exists: false,
            include_create_if_not_exists: true,
            include_comments: true,
            include_indexes: true,
            mysql_engine: "InnoDB".to_string(),
            mysql_charset: "utf8mb4".to_string(),
            mysql_collation: "utf8mb4_unicode_ci".to_string(),
        }
    }
}

/// How `NULL` cells are rendered in export scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    Null,
    Default,
    /// Render as an empty string literal.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKind {
    Email,
    Phone,
    Name,
    Custom,
}

/// Replacement policy for columns whose name contains `match_field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingRule {
    pub match_field: String,
    pub kind: MaskKind,
    /// Template for synthetic values; `{n}` is the counter, `X` a digit slot.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub preserve_length: bool,
}

impl MaskingRule {
    pub fn new(match_field: &str, kind: MaskKind) -> Self {
        Self {
            match_field: match_field.to_string(),
            kind,
            pattern: None,
            replacement: None,
            preserve_length: false,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.replacement = Some(replacement.to_string());
        self
    }
}

pub fn default_masking_rules() -> Vec<MaskingRule> {
    vec![
        MaskingRule::new("email", MaskKind::Email).with_pattern("user{n}@example.com"),
        MaskingRule::new("password", MaskKind::Custom).with_replacement("MASKED_PASSWORD"),
        MaskingRule::new("phone", MaskKind::Phone).with_pattern("XXX-XXX-XXXX"),
        MaskingRule::new("name", MaskKind::Name).with_pattern("User {n}"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub enable_masking: bool,
    pub batch_size: usize,
    /// Column-name fragments treated as sensitive.
    pub masked_fields: Vec<String>,
    pub masking_rules: Vec<MaskingRule>,
    pub null_handling: NullHandling,
    pub align_values: bool,
    pub include_headers: bool,
    pub max_rows: Option<u64>,
    /// Per-table `WHERE` clause, keyed by table name.
    pub where_conditions: BTreeMap<String, String>,
    /// Per-table `ORDER BY` clause, keyed by table name.
    pub order_by: BTreeMap<String, String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            enable_masking: false,
            batch_size: 1000,
            masked_fields: ["password", "email", "phone", "mobile", "ssn", "credit_card"]
                .into_iter()
                .map(String::from)
                .collect(),
            masking_rules: default_masking_rules(),
            null_handling: NullHandling::Null,
            align_values: false,
            include_headers: true,
            max_rows: None,
            where_conditions: BTreeMap::new(),
            order_by: BTreeMap::new(),
        }
    }
}

/// Include-then-exclude lists of exact table names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// How to reach the database. The password never serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDescriptor {
    pub dialect: Dialect,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: String,
    /// Schema to introspect; `public` on Postgres, the database on MySQL.
    pub schema: Option<String>,
    /// Full connection URL; takes precedence over the discrete fields.
    pub url: Option<String>,
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            host: "localhost".to_string(),
            port: None,
            username: String::new(),
            password: None,
            database: String::new(),
            schema: None,
            url: None,
        }
    }
}

impl ConnectionDescriptor {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.dialect.default_port())
    }

    /// Credential-free description for logs and run artifacts.
    pub fn redacted(&self) -> RedactedConnection {
        if let Some(url) = &self.url {
            return redact_connection_string(url);
        }
        let user = if self.username.is_empty() {
            String::new()
        } else if self.password.is_some() {
            format!("{}:***@", self.username)
        } else {
            format!("{}@", self.username)
        };
        RedactedConnection {
            engine: Some(self.dialect.as_str().to_string()),
            user: (!self.username.is_empty()).then(|| self.username.clone()),
            host: Some(self.host.clone()),
            port: Some(self.effective_port()),
            database: (!self.database.is_empty()).then(|| self.database.clone()),
            redacted: format!(
                "{}://{user}{}:{}/{}",
                self.dialect,
                self.host,
                self.effective_port(),
                self.database
            ),
        }
    }
}

/// Options that control how introspection behaves.
#[derive(Debug, Clone)]
pub struct IntrospectOptions {
    pub include_system_schemas: bool,
    pub include_indexes: bool,
    pub include_comments: bool,
    /// Restrict listing to these schemas. `None` means the dialect default:
    /// every user schema on Postgres, the connected database on MySQL.
    pub schemas: Option<Vec<String>>,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            include_system_schemas: false,
            include_indexes: true,
            include_comments: true,
            schemas: None,
        }
    }
}

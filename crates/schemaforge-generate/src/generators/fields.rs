//! Per-column field policy shared by the entity and transfer-object plans.

use schemaforge_core::naming::{
    parse_enum_values, sanitize_identifier, to_property_name, to_snake, to_upper_camel,
};
use schemaforge_core::{ColumnInfo, Dialect, TableInfo, TypeMapping, TypeResolver};

/// How a column participates in generated inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Primary key filled by the database.
    GeneratedId,
    /// Any other auto-increment column.
    Generated,
    CreatedAt,
    UpdatedAt,
    Regular,
}

impl FieldRole {
    pub fn classify(column: &ColumnInfo) -> Self {
        if column.is_primary_key && column.is_auto_increment {
            return FieldRole::GeneratedId;
        }
        if column.is_auto_increment {
            return FieldRole::Generated;
        }
        let snake = to_snake(&column.name);
        if snake.contains("created_at") {
            FieldRole::CreatedAt
        } else if snake.contains("updated_at") {
            FieldRole::UpdatedAt
        } else {
            FieldRole::Regular
        }
    }

    /// Managed columns never appear in create/update inputs.
    pub fn is_input(self) -> bool {
        self == FieldRole::Regular
    }
}

/// Exported enumeration derived from an enum column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPlan {
    pub name: String,
    /// `(member, literal)` pairs in declaration order.
    pub members: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub column: String,
    pub property: String,
    pub role: FieldRole,
    pub mapping: TypeMapping,
    /// Host type as written in generated code (the enum name for enums).
    pub host_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub max_length: Option<i64>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub default_value: Option<String>,
    pub comment: Option<String>,
    pub enum_plan: Option<EnumPlan>,
}

impl FieldPlan {
    pub fn is_input(&self) -> bool {
        self.role.is_input()
    }

    /// Text-like columns get a free-text filter in the query input.
    pub fn is_text(&self) -> bool {
        matches!(
            self.mapping.persistence_type.as_str(),
            "varchar" | "char" | "text"
        )
    }

    pub fn description(&self) -> String {
        self.comment
            .clone()
            .unwrap_or_else(|| self.column.replace('_', " "))
    }
}

/// Plan every column of `table` in ordinal order.
pub fn plan_fields(table: &TableInfo, dialect: Dialect, generate_enums: bool) -> Vec<FieldPlan> {
    let class_name = schemaforge_core::naming::to_class_name(&table.name);
    table
        .columns
        .iter()
        .map(|column| plan_field(&class_name, column, dialect, generate_enums))
        .collect()
}

fn plan_field(
    class_name: &str,
    column: &ColumnInfo,
    dialect: Dialect,
    generate_enums: bool,
) -> FieldPlan {
    let mapping = TypeResolver::resolve_column(column, dialect);
    let property = to_property_name(&column.name);

    let enum_plan = if generate_enums && mapping.is_enum() {
        let values = column
            .enum_values
            .clone()
            .filter(|values| !values.is_empty())
            .unwrap_or_else(|| parse_enum_values(&column.native_type));
        (!values.is_empty()).then(|| EnumPlan {
            name: format!("{class_name}{}", to_upper_camel(&property)),
            members: enum_members(values),
        })
    } else {
        None
    };

    let host_type = enum_plan
        .as_ref()
        .map(|plan| plan.name.clone())
        .unwrap_or_else(|| mapping.host_type.clone());

    FieldPlan {
        column: column.name.clone(),
        property,
        role: FieldRole::classify(column),
        host_type,
        nullable: column.nullable,
        is_primary_key: column.is_primary_key,
        is_unique: column.is_unique,
        max_length: column.max_length,
        precision: column.numeric_precision,
        scale: column.numeric_scale,
        default_value: column.default_value.clone(),
        comment: column.comment.clone(),
        enum_plan,
        mapping,
    }
}

/// Member names are unique; clashes get a numeric suffix.
fn enum_members(values: Vec<String>) -> Vec<(String, String)> {
    let mut members: Vec<(String, String)> = Vec::with_capacity(values.len());
    for value in values {
        let base = enum_member_name(&value);
        let mut name = base.clone();
        let mut suffix = 2;
        while members.iter().any(|(existing, _)| *existing == name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        members.push((name, value));
    }
    members
}

fn enum_member_name(value: &str) -> String {
    let member = to_snake(&sanitize_identifier(value)).to_uppercase();
    if member.is_empty() || member.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("_{member}")
    } else {
        member
    }
}

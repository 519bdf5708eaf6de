//! Read existing entity classes back into catalog metadata.
//!
//! Only decorator metadata is understood: `@Entity`, the column decorators,
//! and `@ManyToOne` paired with `@JoinColumn`. The result feeds the DDL
//! generator, so a directory of hand-maintained entities can produce a
//! `CREATE TABLE` script without a database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use schemaforge_core::naming::to_snake;
use schemaforge_core::{
    ColumnInfo, DatabaseSchema, Dialect, ForeignKeyInfo, ForeignKeyTarget, SCHEMA_VERSION,
    TableInfo,
};
use tracing::{debug, info, warn};

use crate::errors::GenerationError;
use crate::index::collect_entity_files;

const COLUMN_DECORATORS: &[&str] = &[
    "PrimaryGeneratedColumn",
    "PrimaryColumn",
    "Column",
    "CreateDateColumn",
    "UpdateDateColumn",
    "DeleteDateColumn",
    "VersionColumn",
];

/// One entity file, before relations are resolved against its siblings.
#[derive(Debug, Clone)]
pub struct ParsedEntity {
    pub class_name: String,
    pub table: TableInfo,
    pub relations: Vec<ParsedRelation>,
}

/// A `@ManyToOne` side whose join column is a scalar column of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelation {
    pub column: String,
    pub target_class: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Decorator {
    name: String,
    args: String,
}

#[derive(Debug, Clone)]
struct Property {
    decorators: Vec<Decorator>,
    name: String,
    optional: bool,
    ts_type: String,
}

impl Property {
    fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|decorator| decorator.name == name)
    }
}

/// Parse one entity source file. `None` when it declares no exported class.
pub fn parse_entity_source(source: &str, dialect: Dialect) -> Option<ParsedEntity> {
    let class_re = Regex::new(r"export\s+class\s+(\w+)").ok()?;
    let captures = class_re.captures(source)?;
    let declaration = captures.get(0)?;
    let class_name = captures.get(1)?.as_str().to_string();
    let header = &source[..declaration.start()];
    let body = &source[declaration.end()..];

    let (explicit_name, explicit_schema) = find_decorator(header, "Entity")
        .map(|args| entity_target(&args))
        .unwrap_or_default();
    let table_name = explicit_name.unwrap_or_else(|| to_snake(&class_name));
    let schema_name = explicit_schema.unwrap_or_else(|| match dialect {
        Dialect::Postgres => "public".to_string(),
        _ => String::new(),
    });

    let enums = enum_members(header);
    let mut columns: Vec<ColumnInfo> = Vec::new();
    let mut relations = Vec::new();
    let mut relation_properties = Vec::new();

    for property in decorated_properties(body) {
        let column_decorator = property
            .decorators
            .iter()
            .find(|decorator| COLUMN_DECORATORS.contains(&decorator.name.as_str()))
            .cloned();
        if let Some(decorator) = column_decorator {
            let ordinal = columns.len() as i32 + 1;
            columns.push(column_from(&property, &decorator, &enums, ordinal));
        } else if property.decorator("ManyToOne").is_some() {
            relation_properties.push(property);
        }
    }

    for property in relation_properties {
        let Some(relation) = relation_from(&property) else {
            continue;
        };
        if columns.iter().any(|column| column.name == relation.column) {
            relations.push(relation);
        } else {
            warn!(
                table = %table_name,
                property = %property.name,
                column = %relation.column,
                "relation join column has no scalar column; skipped"
            );
        }
    }

    let primary_keys = columns
        .iter()
        .filter(|column| column.is_primary_key)
        .map(|column| column.name.clone())
        .collect();

    Some(ParsedEntity {
        class_name,
        table: TableInfo {
            name: table_name,
            schema_name,
            comment: table_comment(header),
            columns,
            primary_keys,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        },
        relations,
    })
}

/// Parse every entity file under `dir` and resolve relations between them.
///
/// Tables come back sorted by name. Relations whose target class is not in the
/// directory are dropped with a warning.
pub fn parse_entity_dir(dir: &Path, dialect: Dialect) -> Result<Vec<TableInfo>, GenerationError> {
    if !dir.is_dir() {
        return Err(GenerationError::EntityDirectory(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = Vec::new();
    collect_entity_files(dir, &mut files)?;
    files.sort();

    let mut parsed = Vec::new();
    for file in &files {
        let source = std::fs::read_to_string(file)?;
        match parse_entity_source(&source, dialect) {
            Some(entity) => {
                debug!(
                    path = %file.display(),
                    table = %entity.table.name,
                    columns = entity.table.columns.len(),
                    "parsed entity"
                );
                parsed.push(entity);
            }
            None => warn!(path = %file.display(), "no exported class in entity file"),
        }
    }

    let targets: BTreeMap<String, (String, String, String)> = parsed
        .iter()
        .map(|entity| {
            let key_column = entity
                .table
                .primary_keys
                .first()
                .cloned()
                .unwrap_or_else(|| "id".to_string());
            (
                entity.class_name.clone(),
                (entity.table.schema_name.clone(), entity.table.name.clone(), key_column),
            )
        })
        .collect();

    let mut tables = Vec::with_capacity(parsed.len());
    for entity in parsed {
        let mut table = entity.table;
        for relation in entity.relations {
            let Some((schema, target_table, target_column)) = targets.get(&relation.target_class)
            else {
                warn!(
                    table = %table.name,
                    target = %relation.target_class,
                    "relation target is not in the entity directory; skipped"
                );
                continue;
            };
            if let Some(column) = table.columns.iter_mut().find(|c| c.name == relation.column) {
                column.foreign_key_target = Some(ForeignKeyTarget {
                    schema: schema.clone(),
                    table: target_table.clone(),
                    column: target_column.clone(),
                    on_delete: relation.on_delete.clone(),
                    on_update: relation.on_update.clone(),
                });
            }
            table.foreign_keys.push(ForeignKeyInfo {
                constraint_name: format!("fk_{}_{}", table.name, relation.column),
                column_name: relation.column,
                target_schema: schema.clone(),
                target_table: target_table.clone(),
                target_column: target_column.clone(),
                on_delete: relation.on_delete,
                on_update: relation.on_update,
            });
        }
        tables.push(table);
    }
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    info!(dir = %dir.display(), tables = tables.len(), "entity directory parsed");
    Ok(tables)
}

/// A schema snapshot built from an entity directory.
pub fn schema_from_entities(dir: &Path, dialect: Dialect) -> Result<DatabaseSchema, GenerationError> {
    Ok(DatabaseSchema {
        schema_version: SCHEMA_VERSION.to_string(),
        dialect,
        database: None,
        tables: parse_entity_dir(dir, dialect)?,
    })
}

fn column_from(
    property: &Property,
    decorator: &Decorator,
    enums: &BTreeMap<String, Vec<String>>,
    ordinal: i32,
) -> ColumnInfo {
    let args = decorator.args.as_str();
    let name = option_string(args, "name").unwrap_or_else(|| to_snake(&property.name));
    let explicit_type = option_string(args, "type");
    let length = option_number(args, "length");
    let precision = option_number(args, "precision").map(|value| value as i32);
    let scale = option_number(args, "scale").map(|value| value as i32);

    let mut column = ColumnInfo::new(name, "", ordinal);
    column.max_length = length;
    column.numeric_precision = precision;
    column.numeric_scale = scale;
    column.comment = option_string(args, "comment");
    column.is_unique = option_bool(args, "unique").unwrap_or(false);
    column.nullable = property.optional || option_bool(args, "nullable").unwrap_or(false);
    column.default_value = option_default(args);

    let enum_values = option_ident(args, "enum").and_then(|name| enums.get(&name).cloned());
    let inferred = || ts_column_type(&property.ts_type, length, precision, scale);

    match decorator.name.as_str() {
        "PrimaryGeneratedColumn" => {
            let strategy = string_literal(args);
            column.is_primary_key = true;
            column.nullable = false;
            if strategy.as_deref() == Some("uuid") {
                column.native_type = "uuid".to_string();
            } else {
                column.native_type = explicit_type.unwrap_or_else(|| "int".to_string());
                column.is_auto_increment = true;
            }
        }
        "PrimaryColumn" => {
            column.is_primary_key = true;
            column.nullable = false;
            column.native_type = explicit_type.unwrap_or_else(inferred);
        }
        "CreateDateColumn" | "UpdateDateColumn" => {
            column.native_type = explicit_type.unwrap_or_else(|| "timestamp".to_string());
            column.nullable = property.optional;
            if column.default_value.is_none() {
                column.default_value = Some("CURRENT_TIMESTAMP".to_string());
            }
        }
        "DeleteDateColumn" => {
            column.native_type = explicit_type.unwrap_or_else(|| "timestamp".to_string());
            column.nullable = true;
        }
        "VersionColumn" => {
            column.native_type = explicit_type.unwrap_or_else(|| "int".to_string());
            column.nullable = false;
        }
        _ => {
            column.native_type = match (explicit_type, &enum_values) {
                (Some(explicit), _) => explicit,
                (None, Some(_)) => "enum".to_string(),
                (None, None) => inferred(),
            };
        }
    }
    if column.native_type == "enum" {
        column.enum_values = enum_values;
    }
    column
}

fn relation_from(property: &Property) -> Option<ParsedRelation> {
    let many_to_one = property.decorator("ManyToOne")?;
    let target_re = Regex::new(r"^\(\s*\w*\s*\)\s*=>\s*(\w+)").ok()?;
    let target_class = target_re
        .captures(many_to_one.args.trim())?
        .get(1)?
        .as_str()
        .to_string();
    let column = property
        .decorator("JoinColumn")
        .and_then(|join| option_string(&join.args, "name"))
        .unwrap_or_else(|| format!("{}_id", to_snake(&property.name)));
    Some(ParsedRelation {
        column,
        target_class,
        on_delete: option_string(&many_to_one.args, "onDelete"),
        on_update: option_string(&many_to_one.args, "onUpdate"),
    })
}

/// Catalog type for an undecorated property type.
fn ts_column_type(ts_type: &str, length: Option<i64>, precision: Option<i32>, scale: Option<i32>) -> String {
    let cleaned = ts_type
        .split('|')
        .map(str::trim)
        .filter(|part| !matches!(*part, "null" | "undefined"))
        .collect::<Vec<_>>()
        .join(" | ");
    let mapped = match cleaned.as_str() {
        "string" if length.is_some() => "varchar",
        "string" => "text",
        "number" if precision.is_some() && scale.is_some() => "decimal",
        "number" => "int",
        "boolean" => "boolean",
        "Date" => "timestamp",
        "Buffer" => "bytea",
        "any" | "object" => "json",
        other if other.ends_with("[]") || other.starts_with("Record<") => "json",
        _ => "varchar",
    };
    mapped.to_string()
}

/// `@Entity('name')` or `@Entity({ name, schema })`.
fn entity_target(args: &str) -> (Option<String>, Option<String>) {
    if let Some(name) = string_literal(args) {
        return (Some(name), None);
    }
    (option_string(args, "name"), option_string(args, "schema"))
}

/// Members of every `export enum` with string initializers, by enum name.
fn enum_members(source: &str) -> BTreeMap<String, Vec<String>> {
    let mut enums = BTreeMap::new();
    let (Ok(enum_re), Ok(member_re)) = (
        Regex::new(r"export\s+enum\s+(\w+)\s*\{([^}]*)\}"),
        Regex::new(r#"=\s*['"]([^'"]*)['"]"#),
    ) else {
        return enums;
    };
    for captures in enum_re.captures_iter(source) {
        let (Some(name), Some(body)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let members: Vec<String> = member_re
            .captures_iter(body.as_str())
            .filter_map(|member| member.get(1))
            .map(|member| member.as_str().to_string())
            .collect();
        enums.insert(name.as_str().to_string(), members);
    }
    enums
}

/// Doc comment directly above `@Entity`, folded onto one line.
fn table_comment(header: &str) -> Option<String> {
    let re = Regex::new(r"/\*\*((?:[^*]|\*[^/])*)\*/\s*@Entity").ok()?;
    let body = re.captures(header)?.get(1)?.as_str();
    let text = body
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Arguments of the last `@name(...)` in `text`.
fn find_decorator(text: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(r"@{name}\s*\(")).ok()?;
    let found = re.find_iter(text).last()?;
    let open = found.end() - 1;
    let close = matching_paren(text, open)?;
    Some(text[open + 1..close].trim().to_string())
}

/// Properties preceded by at least one decorator, in declaration order.
fn decorated_properties(body: &str) -> Vec<Property> {
    let (Ok(decorator_re), Ok(property_re)) = (
        Regex::new(r"^@(\w+)\s*\("),
        Regex::new(r"^(\w+)([?!])?\s*:\s*([^;=\n]+)"),
    ) else {
        return Vec::new();
    };

    let mut properties = Vec::new();
    let mut pending: Vec<Decorator> = Vec::new();
    let mut cursor = 0;
    while cursor < body.len() {
        let rest = &body[cursor..];
        let trimmed = rest.trim_start();
        cursor += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }

        if let Some(captures) = decorator_re.captures(trimmed) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                break;
            };
            let open = whole.end() - 1;
            let Some(close) = matching_paren(trimmed, open) else {
                break;
            };
            pending.push(Decorator {
                name: name.as_str().to_string(),
                args: trimmed[open + 1..close].trim().to_string(),
            });
            cursor += close + 1;
            continue;
        }

        if !pending.is_empty() {
            if let Some(captures) = property_re.captures(trimmed) {
                let (Some(whole), Some(name), Some(ts_type)) =
                    (captures.get(0), captures.get(1), captures.get(3))
                else {
                    break;
                };
                properties.push(Property {
                    decorators: std::mem::take(&mut pending),
                    name: name.as_str().to_string(),
                    optional: captures.get(2).is_some_and(|mark| mark.as_str() == "?"),
                    ts_type: ts_type.as_str().trim().to_string(),
                });
                cursor += whole.end();
                continue;
            }
            pending.clear();
        }

        match trimmed.find('\n') {
            Some(newline) => cursor += newline + 1,
            None => break,
        }
    }
    properties
}

/// Byte index of the `)` closing the `(` at `open`, skipping string literals.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in text[open..].char_indices() {
        if let Some(delimiter) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == delimiter {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Leading string literal of decorator arguments, unescaped.
fn string_literal(args: &str) -> Option<String> {
    let re = Regex::new(r#"^\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)"|`([^`]*)`)"#).ok()?;
    let captures = re.captures(args)?;
    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?;
    Some(unescape(raw.as_str()))
}

fn option_value<'a>(args: &'a str, key: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(r"(?:^|[{{,\s]){key}\s*:\s*")).ok()?;
    let found = re.find(args)?;
    Some(&args[found.end()..])
}

fn option_string(args: &str, key: &str) -> Option<String> {
    string_literal(option_value(args, key)?)
}

fn option_ident(args: &str, key: &str) -> Option<String> {
    let re = Regex::new(r"^([A-Za-z_]\w*)").ok()?;
    let value = option_value(args, key)?;
    Some(re.captures(value)?.get(1)?.as_str().to_string())
}

fn option_number(args: &str, key: &str) -> Option<i64> {
    let re = Regex::new(r"^(\d+)").ok()?;
    re.captures(option_value(args, key)?)?.get(1)?.as_str().parse().ok()
}

fn option_bool(args: &str, key: &str) -> Option<bool> {
    match option_ident(args, key)?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// `default:` as a catalog default expression.
///
/// Arrow functions yield their raw SQL, string literals come back single-quoted
/// with `''` escaping, other tokens are kept verbatim.
fn option_default(args: &str) -> Option<String> {
    let value = option_value(args, "default")?;
    let arrow_re = Regex::new(r"^\(\)\s*=>\s*").ok()?;
    if let Some(arrow) = arrow_re.find(value) {
        return string_literal(&value[arrow.end()..]);
    }
    if let Some(literal) = string_literal(value) {
        return Some(format!("'{}'", literal.replace('\'', "''")));
    }
    let token_re = Regex::new(r"^(-?[\w.]+)").ok()?;
    Some(token_re.captures(value)?.get(1)?.as_str().to_string())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        out.push(ch);
    }
    out
}

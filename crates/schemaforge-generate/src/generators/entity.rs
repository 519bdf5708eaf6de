use std::path::Path;

use schemaforge_core::naming::to_lower_camel;
use schemaforge_core::{Dialect, GenerationConfig};

use crate::generators::writer::{CodeWriter, import_line, quote};
use crate::generators::{
    EnumPlan, FieldPlan, FieldRole, RunTables, TableContext, many_to_one_property,
    one_to_many_property, property_type, single_column_foreign_keys, validator_for,
};
use crate::paths::import_specifier;

/// Decorator families emitted on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityStyle {
    pub include_validation: bool,
    pub include_swagger: bool,
    pub include_relations: bool,
}

impl EntityStyle {
    /// Entities written to the shared directory follow the entity options.
    pub fn shared(config: &GenerationConfig) -> Self {
        Self {
            include_validation: config.entities.include_validation,
            include_swagger: config.entities.include_swagger,
            include_relations: config.entities.include_relations,
        }
    }

    /// Entities written next to a CRUD module follow the CRUD options.
    pub fn local(config: &GenerationConfig) -> Self {
        Self {
            include_validation: config.crud.include_validation,
            include_swagger: config.crud.include_swagger,
            include_relations: config.crud.include_relations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    ManyToOne,
    OneToMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPlan {
    pub kind: RelationKind,
    pub property: String,
    pub target_class: String,
    /// Owning column for many-to-one relations.
    pub join_column: Option<String>,
    /// Property on the other side, for one-to-many relations.
    pub inverse_property: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityImport {
    pub class_name: String,
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityPlan {
    pub class_name: String,
    pub table_name: String,
    /// Set for Postgres tables outside `public`.
    pub schema_name: Option<String>,
    pub comment: Option<String>,
    pub fields: Vec<FieldPlan>,
    pub enums: Vec<EnumPlan>,
    pub relations: Vec<RelationPlan>,
    pub orm_imports: Vec<&'static str>,
    pub related_imports: Vec<EntityImport>,
    pub validator_imports: Vec<&'static str>,
    /// Foreign-key columns whose target has no entity in reach.
    pub omitted_relations: Vec<String>,
    pub style: EntityStyle,
}

const ORM_ORDER: &[&str] = &[
    "Entity",
    "PrimaryGeneratedColumn",
    "PrimaryColumn",
    "Column",
    "Generated",
    "CreateDateColumn",
    "UpdateDateColumn",
    "ManyToOne",
    "OneToMany",
    "JoinColumn",
];

const VALIDATOR_ORDER: &[&str] = &[
    "IsOptional",
    "IsString",
    "IsNumber",
    "IsBoolean",
    "IsDate",
    "IsEnum",
];

pub fn plan_entity(
    ctx: &TableContext<'_>,
    run: &RunTables<'_>,
    entity_path: &Path,
    style: EntityStyle,
) -> EntityPlan {
    let table = ctx.table;
    let entity_dir = entity_path.parent().unwrap_or_else(|| Path::new("."));

    let mut relations = Vec::new();
    let mut related_imports: Vec<EntityImport> = Vec::new();
    let mut omitted_relations = Vec::new();

    if style.include_relations {
        let mut import_target = |class_name: String, location: &Path| {
            if class_name == ctx.layout.class_name
                || related_imports.iter().any(|import| import.class_name == class_name)
            {
                return;
            }
            related_imports.push(EntityImport {
                class_name,
                specifier: import_specifier(entity_dir, location),
            });
        };

        for fk in single_column_foreign_keys(table) {
            let Some(location) = run.entity_location(&fk.target_schema, &fk.target_table) else {
                omitted_relations.push(fk.column_name.clone());
                continue;
            };
            let target_class = schemaforge_core::naming::to_class_name(&fk.target_table);
            import_target(target_class.clone(), &location);
            relations.push(RelationPlan {
                kind: RelationKind::ManyToOne,
                property: many_to_one_property(table, fk),
                target_class,
                join_column: Some(fk.column_name.clone()),
                inverse_property: None,
                on_delete: meaningful_action(fk.on_delete.as_deref()),
                on_update: meaningful_action(fk.on_update.as_deref()),
                nullable: table
                    .column(&fk.column_name)
                    .is_some_and(|column| column.nullable),
            });
        }

        for (source, fk) in run.referencing(table) {
            let Some(location) = run.entity_location(&source.schema_name, &source.name) else {
                continue;
            };
            let source_class = schemaforge_core::naming::to_class_name(&source.name);
            import_target(source_class.clone(), &location);
            relations.push(RelationPlan {
                kind: RelationKind::OneToMany,
                property: one_to_many_property(source, fk, table),
                target_class: source_class,
                join_column: None,
                inverse_property: Some(many_to_one_property(source, fk)),
                on_delete: None,
                on_update: None,
                nullable: false,
            });
        }
    }

    let enums: Vec<EnumPlan> = ctx
        .fields
        .iter()
        .filter_map(|field| field.enum_plan.clone())
        .collect();

    let mut orm = vec!["Entity"];
    for field in &ctx.fields {
        match field.role {
            FieldRole::GeneratedId => orm.push("PrimaryGeneratedColumn"),
            FieldRole::CreatedAt => orm.push("CreateDateColumn"),
            FieldRole::UpdatedAt => orm.push("UpdateDateColumn"),
            FieldRole::Generated => {
                orm.push("Generated");
                orm.push(if field.is_primary_key { "PrimaryColumn" } else { "Column" });
            }
            FieldRole::Regular if field.is_primary_key => orm.push("PrimaryColumn"),
            FieldRole::Regular => orm.push("Column"),
        }
    }
    for relation in &relations {
        match relation.kind {
            RelationKind::ManyToOne => {
                orm.push("ManyToOne");
                orm.push("JoinColumn");
            }
            RelationKind::OneToMany => orm.push("OneToMany"),
        }
    }

    let mut validators = Vec::new();
    if style.include_validation {
        for field in &ctx.fields {
            if field.nullable {
                validators.push("IsOptional");
            }
            if field.enum_plan.is_some() {
                validators.push("IsEnum");
            } else if let Some(validator) = validator_for(&field.host_type) {
                validators.push(validator);
            }
        }
    }

    let schema_name = (ctx.dialect == Dialect::Postgres
        && !table.schema_name.is_empty()
        && table.schema_name != "public")
        .then(|| table.schema_name.clone());

    EntityPlan {
        class_name: ctx.layout.class_name.clone(),
        table_name: table.name.clone(),
        schema_name,
        comment: table.comment.clone(),
        fields: ctx.fields.clone(),
        enums,
        relations,
        orm_imports: ordered(ORM_ORDER, &orm),
        related_imports,
        validator_imports: ordered(VALIDATOR_ORDER, &validators),
        omitted_relations,
        style,
    }
}

fn ordered(order: &[&'static str], used: &[&'static str]) -> Vec<&'static str> {
    order
        .iter()
        .copied()
        .filter(|name| used.contains(name))
        .collect()
}

fn meaningful_action(action: Option<&str>) -> Option<String> {
    action
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty() && value != "NO ACTION")
}

pub fn render_entity(plan: &EntityPlan) -> String {
    let mut out = CodeWriter::new();
    out.line(import_line(&plan.orm_imports, "typeorm"));
    if plan.style.include_swagger {
        out.line(import_line(&["ApiProperty"], "@nestjs/swagger"));
    }
    if !plan.validator_imports.is_empty() {
        out.line(import_line(&plan.validator_imports, "class-validator"));
    }
    for import in &plan.related_imports {
        out.line(import_line(&[import.class_name.as_str()], &import.specifier));
    }
    out.blank();

    for plan_enum in &plan.enums {
        render_enum(&mut out, plan_enum);
        out.blank();
    }

    if let Some(comment) = &plan.comment {
        out.line(format!("/** {} */", comment.replace("*/", "* /")));
    }
    match &plan.schema_name {
        Some(schema) => out.line(format!(
            "@Entity({{ name: {}, schema: {} }})",
            quote(&plan.table_name),
            quote(schema)
        )),
        None => out.line(format!("@Entity({})", quote(&plan.table_name))),
    };
    out.open(format!("export class {}", plan.class_name));

    for (idx, field) in plan.fields.iter().enumerate() {
        if idx > 0 {
            out.blank();
        }
        for decorator in column_decorators(field, plan.style) {
            out.line(decorator);
        }
        let optional = if field.nullable { "?" } else { "" };
        out.line(format!("{}{optional}: {};", field.property, property_type(field)));
    }

    for relation in &plan.relations {
        out.blank();
        render_relation(&mut out, relation);
    }

    out.close("");
    out.finish()
}

pub fn render_enum(out: &mut CodeWriter, plan_enum: &EnumPlan) {
    out.open(format!("export enum {}", plan_enum.name));
    for (member, value) in &plan_enum.members {
        out.line(format!("{member} = {},", quote(value)));
    }
    out.close("");
}

fn column_decorators(field: &FieldPlan, style: EntityStyle) -> Vec<String> {
    let mut decorators = Vec::new();
    let name_option = (field.property != field.column)
        .then(|| format!("name: {}", quote(&field.column)));

    match field.role {
        FieldRole::GeneratedId => decorators.push(format!(
            "@PrimaryGeneratedColumn({})",
            options_object(name_option.into_iter().collect())
        )),
        FieldRole::CreatedAt => decorators.push(format!(
            "@CreateDateColumn({})",
            options_object(name_option.into_iter().collect())
        )),
        FieldRole::UpdatedAt => decorators.push(format!(
            "@UpdateDateColumn({})",
            options_object(name_option.into_iter().collect())
        )),
        FieldRole::Generated | FieldRole::Regular => {
            if field.role == FieldRole::Generated {
                decorators.push("@Generated('increment')".to_string());
            }
            let decorator = if field.is_primary_key { "PrimaryColumn" } else { "Column" };
            decorators.push(format!("@{decorator}({})", options_object(column_options(field))));
        }
    }

    if style.include_swagger {
        let mut options = Vec::new();
        if let Some(comment) = &field.comment {
            options.push(format!("description: {}", quote(comment)));
        }
        if let Some(plan_enum) = &field.enum_plan {
            options.push(format!("enum: {}", plan_enum.name));
        }
        if field.nullable {
            options.push("required: false".to_string());
        }
        decorators.push(format!("@ApiProperty({})", options_object(options)));
    }

    if style.include_validation {
        if field.nullable {
            decorators.push("@IsOptional()".to_string());
        }
        if let Some(plan_enum) = &field.enum_plan {
            decorators.push(format!("@IsEnum({})", plan_enum.name));
        } else if let Some(validator) = validator_for(&field.host_type) {
            decorators.push(format!("@{validator}()"));
        }
    }
    decorators
}

fn column_options(field: &FieldPlan) -> Vec<String> {
    let mut options = Vec::new();
    if field.property != field.column {
        options.push(format!("name: {}", quote(&field.column)));
    }
    let persistence = field.mapping.persistence_type.as_str();
    options.push(format!("type: {}", quote(persistence)));
    if let Some(plan_enum) = &field.enum_plan {
        options.push(format!("enum: {}", plan_enum.name));
    }
    if matches!(persistence, "varchar" | "char") {
        if let Some(length) = field.max_length {
            options.push(format!("length: {length}"));
        }
    }
    if persistence == "decimal" {
        if let Some(precision) = field.precision {
            options.push(format!("precision: {precision}"));
        }
        if let Some(scale) = field.scale {
            options.push(format!("scale: {scale}"));
        }
    }
    let default = field
        .default_value
        .as_deref()
        .and_then(|raw| format_default(raw, field));
    if let (FieldRole::Regular, Some(default)) = (field.role, default) {
        options.push(format!("default: {default}"));
    }
    if field.nullable {
        options.push("nullable: true".to_string());
    }
    if field.is_unique {
        options.push("unique: true".to_string());
    }
    options
}

fn options_object(options: Vec<String>) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!("{{ {} }}", options.join(", "))
    }
}

/// Render a catalog default as a decorator value, or `None` to omit it.
///
/// Function calls and SQL constants become raw expressions; quoted literals
/// lose their catalog casts (`'x'::character varying`).
pub fn format_default(raw: &str, field: &FieldPlan) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("nextval(") {
        return None;
    }
    if let Some(literal) = quoted_literal(trimmed) {
        if field.mapping.host_type == "boolean" {
            return Some(boolean_literal(&literal));
        }
        if field.mapping.is_numeric() && literal.parse::<f64>().is_ok() {
            return Some(literal);
        }
        return Some(quote(&literal));
    }
    if lower.contains('(') || lower.starts_with("current_") || lower == "localtimestamp" {
        return Some(format!("() => \"{}\"", trimmed.replace('"', "\\\"")));
    }
    if field.mapping.host_type == "boolean" {
        return Some(boolean_literal(trimmed));
    }
    let bare = trimmed.split("::").next().unwrap_or(trimmed);
    if bare.parse::<f64>().is_ok() {
        return Some(bare.to_string());
    }
    Some(quote(bare))
}

fn quoted_literal(raw: &str) -> Option<String> {
    let body = raw.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                value.push('\'');
                chars.next();
                continue;
            }
            return Some(value);
        }
        value.push(ch);
    }
    None
}

fn boolean_literal(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "b'1'" => "true".to_string(),
        _ => "false".to_string(),
    }
}

fn render_relation(out: &mut CodeWriter, relation: &RelationPlan) {
    let param = to_lower_camel(&relation.target_class);
    match relation.kind {
        RelationKind::ManyToOne => {
            let mut options = Vec::new();
            if let Some(action) = &relation.on_delete {
                options.push(format!("onDelete: {}", quote(action)));
            }
            if let Some(action) = &relation.on_update {
                options.push(format!("onUpdate: {}", quote(action)));
            }
            if relation.nullable {
                options.push("nullable: true".to_string());
            }
            if options.is_empty() {
                out.line(format!("@ManyToOne(() => {})", relation.target_class));
            } else {
                out.line(format!(
                    "@ManyToOne(() => {}, {})",
                    relation.target_class,
                    options_object(options)
                ));
            }
            if let Some(column) = &relation.join_column {
                out.line(format!("@JoinColumn({{ name: {} }})", quote(column)));
            }
            if relation.nullable {
                out.line(format!(
                    "{}?: {} | null;",
                    relation.property, relation.target_class
                ));
            } else {
                out.line(format!("{}: {};", relation.property, relation.target_class));
            }
        }
        RelationKind::OneToMany => {
            let inverse = relation.inverse_property.as_deref().unwrap_or("id");
            out.line(format!(
                "@OneToMany(() => {}, ({param}) => {param}.{inverse})",
                relation.target_class
            ));
            out.line(format!("{}: {}[];", relation.property, relation.target_class));
        }
    }
}

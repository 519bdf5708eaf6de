//! Transfer objects: create, update and query inputs.

use crate::generators::writer::{CodeWriter, import_line, quote};
use crate::generators::{FieldPlan, TableContext, validator_for};

/// Property names owned by the query input itself.
const QUERY_RESERVED: &[&str] = &["page", "limit", "sortBy", "sortOrder"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtoField {
    pub property: String,
    pub host_type: String,
    pub optional: bool,
    pub nullable: bool,
    pub description: String,
    pub enum_name: Option<String>,
}

impl DtoField {
    fn from_field(field: &FieldPlan) -> Self {
        Self {
            property: field.property.clone(),
            host_type: field.host_type.clone(),
            optional: field.nullable,
            nullable: field.nullable,
            description: field.description(),
            enum_name: field.enum_plan.as_ref().map(|plan| plan.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub class_name: String,
    pub pagination: bool,
    /// Free-text filters as `(property, column)`.
    pub filters: Vec<(String, String)>,
    /// Properties accepted by `sortBy`; empty when sorting is off.
    pub sortable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtoPlan {
    pub entity_class: String,
    pub stem: String,
    pub create_class: String,
    pub update_class: String,
    pub create_fields: Vec<DtoField>,
    /// Same fields as the create input, all optional.
    pub update_fields: Vec<DtoField>,
    pub query: Option<QueryPlan>,
    /// Entity import from the `dto/` directory, when enums are referenced.
    pub entity_import: Option<(Vec<String>, String)>,
    pub include_swagger: bool,
    pub include_validation: bool,
}

impl DtoPlan {
    pub fn query_class(&self) -> Option<&str> {
        self.query.as_ref().map(|query| query.class_name.as_str())
    }
}

pub fn plan_dtos(ctx: &TableContext<'_>) -> DtoPlan {
    let crud = &ctx.config.crud;
    let class_name = &ctx.layout.class_name;

    let create_fields: Vec<DtoField> = ctx.input_fields().map(DtoField::from_field).collect();
    let update_fields = create_fields
        .iter()
        .cloned()
        .map(|field| DtoField {
            optional: true,
            ..field
        })
        .collect();

    let enum_names: Vec<String> = create_fields
        .iter()
        .filter_map(|field| field.enum_name.clone())
        .collect();
    let entity_import = (!enum_names.is_empty())
        .then(|| (enum_names, ctx.layout.entity_import_from(&ctx.layout.dto_dir())));

    let wants_query = crud.include_pagination || crud.include_filtering || crud.include_sorting;
    let query = wants_query.then(|| QueryPlan {
        class_name: format!("Query{class_name}Dto"),
        pagination: crud.include_pagination,
        filters: if crud.include_filtering {
            ctx.fields
                .iter()
                .filter(|field| field.is_text())
                .filter(|field| !QUERY_RESERVED.contains(&field.property.as_str()))
                .map(|field| (field.property.clone(), field.column.clone()))
                .collect()
        } else {
            Vec::new()
        },
        sortable: if crud.include_sorting {
            ctx.fields.iter().map(|field| field.property.clone()).collect()
        } else {
            Vec::new()
        },
    });

    DtoPlan {
        entity_class: class_name.clone(),
        stem: ctx.layout.stem.clone(),
        create_class: format!("Create{class_name}Dto"),
        update_class: format!("Update{class_name}Dto"),
        create_fields,
        update_fields,
        query,
        entity_import,
        include_swagger: crud.include_swagger,
        include_validation: crud.include_validation,
    }
}

pub fn render_create_dto(plan: &DtoPlan) -> String {
    let mut out = CodeWriter::new();
    if plan.include_swagger {
        out.line(import_line(&["ApiProperty", "ApiPropertyOptional"], "@nestjs/swagger"));
    }
    if plan.include_validation {
        let validators = create_validators(&plan.create_fields);
        if !validators.is_empty() {
            out.line(import_line(&validators, "class-validator"));
        }
        if plan.create_fields.iter().any(|field| field.host_type == "Date") {
            out.line(import_line(&["Type"], "class-transformer"));
        }
    }
    if let Some((names, specifier)) = &plan.entity_import {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        out.line(import_line(&names, specifier));
    }
    out.blank();

    out.open(format!("export class {}", plan.create_class));
    for (idx, field) in plan.create_fields.iter().enumerate() {
        if idx > 0 {
            out.blank();
        }
        if plan.include_swagger {
            let mut options = vec![format!("description: {}", quote(&field.description))];
            if let Some(name) = &field.enum_name {
                options.push(format!("enum: {name}"));
            }
            let decorator = if field.optional { "ApiPropertyOptional" } else { "ApiProperty" };
            out.line(format!("@{decorator}({{ {} }})", options.join(", ")));
        }
        if plan.include_validation {
            if field.optional {
                out.line("@IsOptional()");
            }
            if let Some(name) = &field.enum_name {
                out.line(format!("@IsEnum({name})"));
            } else if let Some(validator) = validator_for(&field.host_type) {
                if field.host_type == "Date" {
                    out.line("@Type(() => Date)");
                }
                out.line(format!("@{validator}()"));
            }
        }
        let optional = if field.optional { "?" } else { "" };
        let host = if field.nullable {
            format!("{} | null", field.host_type)
        } else {
            field.host_type.clone()
        };
        out.line(format!("{}{optional}: {host};", field.property));
    }
    out.close("");
    out.finish()
}

fn create_validators(fields: &[DtoField]) -> Vec<&'static str> {
    let mut used = Vec::new();
    if fields.iter().any(|field| field.optional) {
        used.push("IsOptional");
    }
    for field in fields {
        let validator = if field.enum_name.is_some() {
            Some("IsEnum")
        } else {
            validator_for(&field.host_type)
        };
        if let Some(validator) = validator {
            if !used.contains(&validator) {
                used.push(validator);
            }
        }
    }
    used
}

pub fn render_update_dto(plan: &DtoPlan) -> String {
    let mut out = CodeWriter::new();
    out.line(import_line(&["PartialType"], "@nestjs/mapped-types"));
    out.line(import_line(
        &[plan.create_class.as_str()],
        &format!("./create-{}.dto", plan.stem),
    ));
    out.blank();
    out.line(format!(
        "export class {} extends PartialType({}) {{}}",
        plan.update_class, plan.create_class
    ));
    out.finish()
}

pub fn render_query_dto(plan: &DtoPlan, query: &QueryPlan) -> String {
    let mut out = CodeWriter::new();
    if plan.include_swagger {
        out.line(import_line(&["ApiPropertyOptional"], "@nestjs/swagger"));
    }
    if plan.include_validation {
        let mut validators = vec!["IsOptional"];
        if query.pagination {
            validators.push("IsInt");
            validators.push("Min");
        }
        if !query.filters.is_empty() {
            validators.push("IsString");
        }
        if !query.sortable.is_empty() {
            validators.push("IsIn");
        }
        out.line(import_line(&validators, "class-validator"));
        if query.pagination {
            out.line(import_line(&["Type"], "class-transformer"));
        }
    }
    out.blank();

    out.open(format!("export class {}", query.class_name));
    let mut first = true;
    let mut separate = |out: &mut CodeWriter| {
        if !first {
            out.blank();
        }
        first = false;
    };

    if query.pagination {
        for (property, description) in [
            ("page", "Page number for pagination"),
            ("limit", "Number of items per page"),
        ] {
            separate(&mut out);
            if plan.include_swagger {
                out.line(format!(
                    "@ApiPropertyOptional({{ description: {} }})",
                    quote(description)
                ));
            }
            if plan.include_validation {
                out.line("@IsOptional()");
                out.line("@Type(() => Number)");
                out.line("@IsInt()");
                out.line("@Min(1)");
            }
            out.line(format!("{property}?: number;"));
        }
    }

    for (property, column) in &query.filters {
        separate(&mut out);
        if plan.include_swagger {
            out.line(format!(
                "@ApiPropertyOptional({{ description: {} }})",
                quote(&format!("Filter by {column}"))
            ));
        }
        if plan.include_validation {
            out.line("@IsOptional()");
            out.line("@IsString()");
        }
        out.line(format!("{property}?: string;"));
    }

    if !query.sortable.is_empty() {
        let allowed = query
            .sortable
            .iter()
            .map(|property| quote(property))
            .collect::<Vec<_>>()
            .join(", ");
        separate(&mut out);
        if plan.include_swagger {
            out.line(format!(
                "@ApiPropertyOptional({{ description: 'Field to sort by', enum: [{allowed}] }})"
            ));
        }
        if plan.include_validation {
            out.line("@IsOptional()");
            out.line(format!("@IsIn([{allowed}])"));
        }
        out.line("sortBy?: string;");

        separate(&mut out);
        if plan.include_swagger {
            out.line("@ApiPropertyOptional({ description: 'Sort direction', enum: ['ASC', 'DESC'] })");
        }
        if plan.include_validation {
            out.line("@IsOptional()");
            out.line("@IsIn(['ASC', 'DESC'])");
        }
        out.line("sortOrder?: 'ASC' | 'DESC';");
    }

    out.close("");
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_core::{ColumnInfo, Dialect, GenerationConfig, TableInfo};

    fn users() -> TableInfo {
        let mut id = ColumnInfo::new("id", "integer", 1);
        id.nullable = false;
        id.is_primary_key = true;
        id.is_auto_increment = true;
        let mut email = ColumnInfo::new("email", "character varying", 2);
        email.nullable = false;
        let nickname = ColumnInfo::new("nickname", "text", 3);
        let mut page = ColumnInfo::new("page", "varchar", 4);
        page.nullable = false;
        let mut updated = ColumnInfo::new("updated_at", "timestamp", 5);
        updated.nullable = false;
        TableInfo {
            name: "users".to_string(),
            schema_name: "public".to_string(),
            comment: None,
            columns: vec![id, email, nickname, page, updated],
            primary_keys: vec!["id".to_string()],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    #[test]
    fn create_fields_skip_managed_columns() {
        let table = users();
        let config = GenerationConfig::default();
        let ctx = TableContext::new(&table, Dialect::Postgres, &config);
        let plan = plan_dtos(&ctx);
        let names: Vec<_> = plan.create_fields.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(names, vec!["email", "nickname", "page"]);
        assert!(!plan.create_fields[0].optional);
        assert!(plan.create_fields[1].optional);
        assert!(plan.update_fields.iter().all(|field| field.optional));
    }

    #[test]
    fn query_input_follows_toggles() {
        let table = users();
        let mut config = GenerationConfig::default();
        let ctx = TableContext::new(&table, Dialect::Postgres, &config);
        let plan = plan_dtos(&ctx);
        let query = plan.query.as_ref().expect("query input");
        let filters: Vec<_> = query.filters.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(filters, vec!["email", "nickname"]);
        assert!(query.pagination);
        assert_eq!(query.sortable.len(), 5);

        config.crud.include_pagination = false;
        config.crud.include_filtering = false;
        config.crud.include_sorting = false;
        let ctx = TableContext::new(&table, Dialect::Postgres, &config);
        assert!(plan_dtos(&ctx).query.is_none());
    }

    #[test]
    fn renders_update_input_as_partial_of_create() {
        let table = users();
        let config = GenerationConfig::default();
        let ctx = TableContext::new(&table, Dialect::Postgres, &config);
        let plan = plan_dtos(&ctx);
        let text = render_update_dto(&plan);
        assert!(text.contains("import { CreateUsersDto } from './create-users.dto';"));
        assert!(text.contains("export class UpdateUsersDto extends PartialType(CreateUsersDto) {}"));

        let create = render_create_dto(&plan);
        assert!(create.contains("email: string;"));
        assert!(create.contains("nickname?: string | null;"));
        assert!(!create.contains("updatedAt"));
    }
}

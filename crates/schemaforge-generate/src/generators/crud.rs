//! Names and signatures shared by the repository, service, controller,
//! module and test artifacts of one table.

use crate::generators::TableContext;
use crate::generators::dto::DtoPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudShape {
    pub entity_class: String,
    pub stem: String,
    /// Lower camel table name, used for injected member names.
    pub member: String,
    pub route: String,
    pub repository_class: String,
    pub service_class: String,
    pub controller_class: String,
    pub module_class: String,
    /// Entity import from the module directory.
    pub entity_import: String,
    pub create_input: String,
    pub update_input: String,
    /// `(class, specifier)` for transfer objects, relative to the module directory.
    pub dto_imports: Vec<(String, String)>,
    pub query_class: Option<String>,
    pub id_property: String,
    pub numeric_id: bool,
    pub pagination: bool,
    pub filters: Vec<String>,
    pub sorting: bool,
    pub default_sort: String,
}

impl CrudShape {
    pub fn new(ctx: &TableContext<'_>, dto: Option<&DtoPlan>) -> Self {
        let layout = &ctx.layout;
        let class = &layout.class_name;
        let entity_import = layout.entity_import_from(&layout.module_dir);

        let (create_input, update_input, dto_imports) = match dto {
            Some(plan) => {
                let mut imports = vec![
                    (plan.create_class.clone(), format!("./dto/create-{}.dto", plan.stem)),
                    (plan.update_class.clone(), format!("./dto/update-{}.dto", plan.stem)),
                ];
                if let Some(query) = plan.query_class() {
                    imports.push((query.to_string(), format!("./dto/query-{}.dto", plan.stem)));
                }
                (plan.create_class.clone(), plan.update_class.clone(), imports)
            }
            None => (
                format!("DeepPartial<{class}>"),
                format!("DeepPartial<{class}>"),
                Vec::new(),
            ),
        };

        let query = dto.and_then(|plan| plan.query.as_ref());
        let id_property = ctx.id_property();
        let default_sort = if ctx.id_field().is_some() {
            id_property.clone()
        } else {
            ctx.fields
                .first()
                .map(|field| field.property.clone())
                .unwrap_or_else(|| "id".to_string())
        };

        Self {
            entity_class: class.clone(),
            stem: layout.stem.clone(),
            member: layout.module_name.clone(),
            route: layout.stem.clone(),
            repository_class: format!("{class}Repository"),
            service_class: format!("{class}Service"),
            controller_class: format!("{class}Controller"),
            module_class: format!("{class}Module"),
            entity_import,
            create_input,
            update_input,
            dto_imports,
            query_class: query.map(|query| query.class_name.clone()),
            id_property,
            numeric_id: ctx.id_type() == "number",
            pagination: query.is_some_and(|query| query.pagination),
            filters: query
                .map(|query| query.filters.iter().map(|(property, _)| property.clone()).collect())
                .unwrap_or_default(),
            sorting: query.is_some_and(|query| !query.sortable.is_empty()),
            default_sort,
        }
    }

    pub fn id_type(&self) -> &'static str {
        if self.numeric_id { "number" } else { "string" }
    }

    pub fn uses_dto(&self) -> bool {
        !self.dto_imports.is_empty()
    }
}

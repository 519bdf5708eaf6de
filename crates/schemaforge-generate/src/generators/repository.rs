use crate::generators::crud::CrudShape;
use crate::generators::writer::{CodeWriter, import_line, quote};

/// Persistence-access layer for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPlan {
    pub shape: CrudShape,
    /// `(names, specifier)` in emission order.
    pub imports: Vec<(Vec<String>, String)>,
}

impl RepositoryPlan {
    pub fn import_for(&self, name: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|(names, _)| names.iter().any(|candidate| candidate == name))
            .map(|(_, specifier)| specifier.as_str())
    }
}

pub fn plan_repository(shape: &CrudShape) -> RepositoryPlan {
    let mut typeorm = Vec::new();
    if !shape.uses_dto() {
        typeorm.push("DeepPartial".to_string());
    }
    if shape.sorting {
        typeorm.push("FindOptionsOrder".to_string());
    }
    typeorm.push("FindOptionsWhere".to_string());
    typeorm.push("Repository".to_string());

    let mut imports = vec![
        (vec!["Injectable".to_string()], "@nestjs/common".to_string()),
        (vec!["InjectRepository".to_string()], "@nestjs/typeorm".to_string()),
        (typeorm, "typeorm".to_string()),
        (vec![shape.entity_class.clone()], shape.entity_import.clone()),
    ];
    for (class, specifier) in &shape.dto_imports {
        imports.push((vec![class.clone()], specifier.clone()));
    }

    RepositoryPlan {
        shape: shape.clone(),
        imports,
    }
}

pub fn render_repository(plan: &RepositoryPlan) -> String {
    let shape = &plan.shape;
    let entity = &shape.entity_class;
    let id_type = shape.id_type();
    let mut out = CodeWriter::new();

    for (names, specifier) in &plan.imports {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        out.line(import_line(&names, specifier));
    }
    out.blank();

    out.line("@Injectable()");
    out.open(format!("export class {}", shape.repository_class));
    out.line("constructor(");
    out.indent();
    out.line(format!("@InjectRepository({entity})"));
    out.line(format!("private readonly repository: Repository<{entity}>,"));
    out.dedent();
    out.line(") {}");
    out.blank();

    out.open(format!(
        "async create(input: {}): Promise<{entity}>",
        shape.create_input
    ));
    out.line("const entity = this.repository.create(input);");
    out.line("return this.repository.save(entity);");
    out.close("");
    out.blank();

    match &shape.query_class {
        Some(query) => render_paged_find_all(&mut out, shape, query),
        None => {
            out.open(format!("async findAll(): Promise<{entity}[]>"));
            out.line("return this.repository.find();");
            out.close("");
        }
    }
    out.blank();

    out.open(format!(
        "async findOne(id: {id_type}): Promise<{entity} | null>"
    ));
    out.line(format!(
        "return this.repository.findOne({{ where: {{ {}: id }} as FindOptionsWhere<{entity}> }});",
        shape.id_property
    ));
    out.close("");
    out.blank();

    out.open(format!(
        "async update(id: {id_type}, input: {}): Promise<{entity} | null>",
        shape.update_input
    ));
    out.line("const entity = await this.findOne(id);");
    out.open("if (!entity)");
    out.line("return null;");
    out.close("");
    out.line("Object.assign(entity, input);");
    out.line("return this.repository.save(entity);");
    out.close("");
    out.blank();

    out.open(format!("async remove(id: {id_type}): Promise<boolean>"));
    out.line("const entity = await this.findOne(id);");
    out.open("if (!entity)");
    out.line("return false;");
    out.close("");
    out.line("await this.repository.remove(entity);");
    out.line("return true;");
    out.close("");

    if shape.query_class.is_some() {
        out.blank();
        out.open(format!(
            "private buildWhereClause(filters: Record<string, unknown>): FindOptionsWhere<{entity}>"
        ));
        out.line("const where: Record<string, unknown> = {};");
        for property in &shape.filters {
            out.open(format!("if (filters.{property} !== undefined)"));
            out.line(format!("where.{property} = filters.{property};"));
            out.close("");
        }
        out.line(format!("return where as FindOptionsWhere<{entity}>;"));
        out.close("");
    }

    out.close("");
    out.finish()
}

fn render_paged_find_all(out: &mut CodeWriter, shape: &CrudShape, query: &str) {
    let entity = &shape.entity_class;
    let mut bindings = Vec::new();
    if shape.pagination {
        bindings.push("page = 1".to_string());
        bindings.push("limit = 10".to_string());
    }
    if shape.sorting {
        bindings.push(format!("sortBy = {}", quote(&shape.default_sort)));
        bindings.push("sortOrder = 'ASC'".to_string());
    }
    bindings.push("...filters".to_string());

    out.open(format!(
        "async findAll(query?: {query}): Promise<{{ data: {entity}[]; total: number }}>"
    ));
    out.line(format!(
        "const {{ {} }} = query ?? {{}};",
        bindings.join(", ")
    ));
    out.line("const [data, total] = await this.repository.findAndCount({");
    out.indent();
    out.line("where: this.buildWhereClause(filters),");
    if shape.sorting {
        out.line(format!(
            "order: {{ [sortBy]: sortOrder }} as FindOptionsOrder<{entity}>,"
        ));
    }
    if shape.pagination {
        out.line("skip: (page - 1) * limit,");
        out.line("take: limit,");
    }
    out.dedent();
    out.line("});");
    out.line("return { data, total };");
    out.close("");
}

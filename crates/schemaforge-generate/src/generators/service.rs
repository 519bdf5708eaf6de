use crate::generators::crud::CrudShape;
use crate::generators::writer::{CodeWriter, import_line};

/// Business layer between the controller and the repository.
pub fn render_service(shape: &CrudShape) -> String {
    let entity = &shape.entity_class;
    let id_type = shape.id_type();
    let mut out = CodeWriter::new();

    out.line(import_line(&["Injectable", "NotFoundException"], "@nestjs/common"));
    if !shape.uses_dto() {
        out.line(import_line(&["DeepPartial"], "typeorm"));
    }
    out.line(import_line(&[entity.as_str()], &shape.entity_import));
    for (class, specifier) in &shape.dto_imports {
        out.line(import_line(&[class.as_str()], specifier));
    }
    out.line(import_line(
        &[shape.repository_class.as_str()],
        &format!("./{}.repository", shape.stem),
    ));
    out.blank();

    out.line("@Injectable()");
    out.open(format!("export class {}", shape.service_class));
    out.line(format!(
        "constructor(private readonly {}Repository: {}) {{}}",
        shape.member, shape.repository_class
    ));
    out.blank();

    let repo = format!("this.{}Repository", shape.member);

    out.open(format!(
        "async create(input: {}): Promise<{entity}>",
        shape.create_input
    ));
    out.line(format!("return {repo}.create(input);"));
    out.close("");
    out.blank();

    match &shape.query_class {
        Some(query) => {
            out.open(format!(
                "async findAll(query?: {query}): Promise<{{ data: {entity}[]; total: number }}>"
            ));
            out.line(format!("return {repo}.findAll(query);"));
        }
        None => {
            out.open(format!("async findAll(): Promise<{entity}[]>"));
            out.line(format!("return {repo}.findAll();"));
        }
    }
    out.close("");
    out.blank();

    out.open(format!("async findOne(id: {id_type}): Promise<{entity}>"));
    out.line(format!("const entity = await {repo}.findOne(id);"));
    not_found_guard(&mut out, entity);
    out.line("return entity;");
    out.close("");
    out.blank();

    out.open(format!(
        "async update(id: {id_type}, input: {}): Promise<{entity}>",
        shape.update_input
    ));
    out.line(format!("const entity = await {repo}.update(id, input);"));
    not_found_guard(&mut out, entity);
    out.line("return entity;");
    out.close("");
    out.blank();

    out.open(format!(
        "async remove(id: {id_type}): Promise<{{ message: string }}>"
    ));
    out.line(format!("const removed = await {repo}.remove(id);"));
    out.open("if (!removed)");
    out.line(format!(
        "throw new NotFoundException(`{entity} with id ${{id}} not found`);"
    ));
    out.close("");
    out.line(format!("return {{ message: `{entity} deleted successfully` }};"));
    out.close("");

    out.close("");
    out.finish()
}

fn not_found_guard(out: &mut CodeWriter, entity: &str) {
    out.open("if (!entity)");
    out.line(format!(
        "throw new NotFoundException(`{entity} with id ${{id}} not found`);"
    ));
    out.close("");
}

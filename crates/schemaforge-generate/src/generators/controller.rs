use schemaforge_core::CrudOptions;

use crate::generators::crud::CrudShape;
use crate::generators::writer::{CodeWriter, import_line, quote};

/// Route-handler decisions for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerPlan {
    pub shape: CrudShape,
    pub swagger: bool,
    /// Numeric identifiers parsed with `ParseIntPipe`.
    pub parse_id: bool,
    pub auth_guard: bool,
}

pub fn plan_controller(shape: &CrudShape, options: &CrudOptions) -> ControllerPlan {
    ControllerPlan {
        shape: shape.clone(),
        swagger: options.include_swagger,
        parse_id: options.include_validation && shape.numeric_id,
        auth_guard: options.auth_guards,
    }
}

pub fn render_controller(plan: &ControllerPlan) -> String {
    let shape = &plan.shape;
    let entity = &shape.entity_class;
    let service = format!("this.{}Service", shape.member);
    let mut out = CodeWriter::new();

    let mut common = vec![
        "Controller", "Get", "Post", "Body", "Patch", "Param", "Delete",
    ];
    if shape.query_class.is_some() {
        common.push("Query");
    }
    if plan.parse_id {
        common.push("ParseIntPipe");
    }
    if plan.auth_guard {
        common.push("UseGuards");
    }
    out.line(import_line(&common, "@nestjs/common"));
    if plan.swagger {
        out.line(import_line(
            &["ApiTags", "ApiOperation", "ApiResponse", "ApiParam"],
            "@nestjs/swagger",
        ));
    }
    if !shape.uses_dto() {
        out.line(import_line(&["DeepPartial"], "typeorm"));
    }
    if plan.auth_guard {
        out.line(import_line(&["JwtAuthGuard"], "../auth/jwt-auth.guard"));
    }
    out.line(import_line(
        &[shape.service_class.as_str()],
        &format!("./{}.service", shape.stem),
    ));
    if plan.swagger {
        out.line(import_line(&[entity.as_str()], &shape.entity_import));
    }
    for (class, specifier) in &shape.dto_imports {
        out.line(import_line(&[class.as_str()], specifier));
    }
    out.blank();

    if plan.swagger {
        out.line(format!("@ApiTags({})", quote(&shape.route)));
    }
    if plan.auth_guard {
        out.line("@UseGuards(JwtAuthGuard)");
    }
    out.line(format!("@Controller({})", quote(&shape.route)));
    out.open(format!("export class {}", shape.controller_class));
    out.line(format!(
        "constructor(private readonly {}Service: {}) {{}}",
        shape.member, shape.service_class
    ));
    out.blank();

    let (id_param, id_arg) = id_binding(plan);

    operation(&mut out, plan, "Create a new record", 201, "Created", Some(entity), false);
    out.line("@Post()");
    out.open(format!("create(@Body() input: {})", shape.create_input));
    out.line(format!("return {service}.create(input);"));
    out.close("");
    out.blank();

    operation(&mut out, plan, "List records", 200, "OK", None, false);
    out.line("@Get()");
    match &shape.query_class {
        Some(query) => {
            out.open(format!("findAll(@Query() query: {query})"));
            out.line(format!("return {service}.findAll(query);"));
        }
        None => {
            out.open("findAll()");
            out.line(format!("return {service}.findAll();"));
        }
    }
    out.close("");
    out.blank();

    operation(&mut out, plan, "Get one record", 200, "OK", Some(entity), true);
    out.line("@Get(':id')");
    out.open(format!("findOne({id_param})"));
    out.line(format!("return {service}.findOne({id_arg});"));
    out.close("");
    out.blank();

    operation(&mut out, plan, "Update a record", 200, "Updated", Some(entity), true);
    out.line("@Patch(':id')");
    out.open(format!(
        "update({id_param}, @Body() input: {})",
        shape.update_input
    ));
    out.line(format!("return {service}.update({id_arg}, input);"));
    out.close("");
    out.blank();

    operation(&mut out, plan, "Delete a record", 200, "Deleted", None, true);
    out.line("@Delete(':id')");
    out.open(format!("remove({id_param})"));
    out.line(format!("return {service}.remove({id_arg});"));
    out.close("");

    out.close("");
    out.finish()
}

/// Handler parameter and the expression passed to the service.
fn id_binding(plan: &ControllerPlan) -> (String, String) {
    if plan.parse_id {
        (
            "@Param('id', ParseIntPipe) id: number".to_string(),
            "id".to_string(),
        )
    } else if plan.shape.numeric_id {
        ("@Param('id') id: string".to_string(), "+id".to_string())
    } else {
        ("@Param('id') id: string".to_string(), "id".to_string())
    }
}

fn operation(
    out: &mut CodeWriter,
    plan: &ControllerPlan,
    summary: &str,
    status: u16,
    description: &str,
    response_type: Option<&String>,
    with_id: bool,
) {
    if !plan.swagger {
        return;
    }
    out.line(format!("@ApiOperation({{ summary: {} }})", quote(summary)));
    if with_id {
        out.line(format!(
            "@ApiParam({{ name: 'id', type: {} }})",
            if plan.shape.numeric_id { "Number" } else { "String" }
        ));
    }
    match response_type {
        Some(entity) => out.line(format!(
            "@ApiResponse({{ status: {status}, description: {}, type: {entity} }})",
            quote(description)
        )),
        None => out.line(format!(
            "@ApiResponse({{ status: {status}, description: {} }})",
            quote(description)
        )),
    };
    if with_id {
        out.line("@ApiResponse({ status: 404, description: 'Not found' })");
    }
}

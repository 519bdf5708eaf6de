//! Jest suites for the generated service and controller.

use crate::generators::crud::CrudShape;
use crate::generators::writer::{CodeWriter, import_line};

fn sample_id(shape: &CrudShape) -> &'static str {
    if shape.numeric_id { "1" } else { "'1'" }
}

pub fn render_service_spec(shape: &CrudShape) -> String {
    let service = &shape.service_class;
    let repository = &shape.repository_class;
    let id = sample_id(shape);
    let mut out = CodeWriter::new();

    out.line(import_line(&["NotFoundException"], "@nestjs/common"));
    out.line(import_line(&["Test", "TestingModule"], "@nestjs/testing"));
    out.line(import_line(&[service.as_str()], &format!("./{}.service", shape.stem)));
    out.line(import_line(
        &[repository.as_str()],
        &format!("./{}.repository", shape.stem),
    ));
    out.blank();

    out.open(format!("describe('{service}', () =>"));
    out.line(format!("let service: {service};"));
    out.line("const repository = {");
    out.indent();
    for method in ["create", "findAll", "findOne", "update", "remove"] {
        out.line(format!("{method}: jest.fn(),"));
    }
    out.dedent();
    out.line("};");
    out.blank();

    out.open("beforeEach(async () =>");
    out.line("jest.resetAllMocks();");
    out.line("const module: TestingModule = await Test.createTestingModule({");
    out.indent();
    out.line(format!(
        "providers: [{service}, {{ provide: {repository}, useValue: repository }}],"
    ));
    out.dedent();
    out.line("}).compile();");
    out.line(format!("service = module.get<{service}>({service});"));
    out.close(");");
    out.blank();

    out.open("it('should be defined', () =>");
    out.line("expect(service).toBeDefined();");
    out.close(");");
    out.blank();

    out.open("it('returns the record found by the repository', async () =>");
    out.line(format!("const record = {{ {}: {id} }};", shape.id_property));
    out.line("repository.findOne.mockResolvedValue(record);");
    out.line(format!("await expect(service.findOne({id})).resolves.toEqual(record);"));
    out.close(");");
    out.blank();

    out.open("it('throws when the record does not exist', async () =>");
    out.line("repository.findOne.mockResolvedValue(null);");
    out.line(format!(
        "await expect(service.findOne({id})).rejects.toBeInstanceOf(NotFoundException);"
    ));
    out.close(");");
    out.blank();

    out.open("it('reports successful removal', async () =>");
    out.line("repository.remove.mockResolvedValue(true);");
    out.line(format!(
        "await expect(service.remove({id})).resolves.toEqual({{ message: '{} deleted successfully' }});",
        shape.entity_class
    ));
    out.close(");");

    out.close(");");
    out.finish()
}

pub fn render_controller_spec(shape: &CrudShape) -> String {
    let controller = &shape.controller_class;
    let service = &shape.service_class;
    let id = sample_id(shape);
    let mut out = CodeWriter::new();

    out.line(import_line(&["Test", "TestingModule"], "@nestjs/testing"));
    out.line(import_line(
        &[controller.as_str()],
        &format!("./{}.controller", shape.stem),
    ));
    out.line(import_line(&[service.as_str()], &format!("./{}.service", shape.stem)));
    out.blank();

    out.open(format!("describe('{controller}', () =>"));
    out.line(format!("let controller: {controller};"));
    out.line("const service = {");
    out.indent();
    for method in ["create", "findAll", "findOne", "update", "remove"] {
        out.line(format!("{method}: jest.fn(),"));
    }
    out.dedent();
    out.line("};");
    out.blank();

    out.open("beforeEach(async () =>");
    out.line("jest.resetAllMocks();");
    out.line("const module: TestingModule = await Test.createTestingModule({");
    out.indent();
    out.line(format!("controllers: [{controller}],"));
    out.line(format!("providers: [{{ provide: {service}, useValue: service }}],"));
    out.dedent();
    out.line("}).compile();");
    out.line(format!("controller = module.get<{controller}>({controller});"));
    out.close(");");
    out.blank();

    out.open("it('should be defined', () =>");
    out.line("expect(controller).toBeDefined();");
    out.close(");");
    out.blank();

    out.open("it('delegates findOne to the service', async () =>");
    out.line(format!("const record = {{ {}: {id} }};", shape.id_property));
    out.line("service.findOne.mockResolvedValue(record);");
    // The controller receives route parameters as strings unless parsed.
    out.line(format!("await expect(controller.findOne({id} as never)).resolves.toEqual(record);"));
    out.line("expect(service.findOne).toHaveBeenCalled();");
    out.close(");");

    out.close(");");
    out.finish()
}

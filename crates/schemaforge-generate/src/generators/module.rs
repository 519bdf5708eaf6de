use std::path::Path;

use serde::Serialize;

use crate::generators::crud::CrudShape;
use crate::generators::writer::{CodeWriter, import_line};
use crate::paths::import_specifier;

/// How a generated module is referenced from the top-level wiring file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRegistration {
    pub class_name: String,
    pub import_line: String,
    /// Entry of the `imports: [` block, without indentation.
    pub registration: String,
}

impl ModuleRegistration {
    pub fn new(class_name: &str, base_output: &Path, module_file: &Path) -> Self {
        Self {
            class_name: class_name.to_string(),
            import_line: import_line(&[class_name], &import_specifier(base_output, module_file)),
            registration: format!("{class_name},"),
        }
    }
}

pub fn render_module(shape: &CrudShape) -> String {
    let entity = &shape.entity_class;
    let mut out = CodeWriter::new();

    out.line(import_line(&["Module"], "@nestjs/common"));
    out.line(import_line(&["TypeOrmModule"], "@nestjs/typeorm"));
    out.line(import_line(&[entity.as_str()], &shape.entity_import));
    out.line(import_line(
        &[shape.repository_class.as_str()],
        &format!("./{}.repository", shape.stem),
    ));
    out.line(import_line(
        &[shape.service_class.as_str()],
        &format!("./{}.service", shape.stem),
    ));
    out.line(import_line(
        &[shape.controller_class.as_str()],
        &format!("./{}.controller", shape.stem),
    ));
    out.blank();

    out.line("@Module({");
    out.indent();
    out.line(format!("imports: [TypeOrmModule.forFeature([{entity}])],"));
    out.line(format!("controllers: [{}],", shape.controller_class));
    out.line(format!(
        "providers: [{}, {}],",
        shape.service_class, shape.repository_class
    ));
    out.line(format!("exports: [{}],", shape.service_class));
    out.dedent();
    out.line("})");
    out.line(format!("export class {} {{}}", shape.module_class));
    out.finish()
}

//! Top-level `app.module.ts` registration.
//!
//! An existing file is only ever appended to: missing import lines go after
//! the last import and missing module entries go at the end of the
//! `imports: [` block. Lines are compared by trimmed text.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::GenerationError;
use crate::generators::module::ModuleRegistration;
use crate::generators::writer::{CodeWriter, import_line};
use crate::paths::write_text;

const IMPORTS_BLOCK: &str = "imports: [";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringOutcome {
    pub path: PathBuf,
    pub created: bool,
    pub changed: bool,
}

/// Create or merge `<base_output>/app.module.ts`. `None` when there is nothing to register.
pub fn write_app_module(
    base_output: &Path,
    registrations: &[ModuleRegistration],
) -> Result<Option<WiringOutcome>, GenerationError> {
    if registrations.is_empty() {
        debug!(event = "wiring_skipped", "no modules to register");
        return Ok(None);
    }
    let path = base_output.join("app.module.ts");

    if path.is_file() {
        let existing = std::fs::read_to_string(&path).map_err(|err| wiring_io(&path, err))?;
        let merged = merge_app_module(&existing, registrations)?;
        let changed = merged != existing;
        if changed {
            write_text(&path, &merged).map_err(|err| wiring_io(&path, err))?;
        }
        info!(path = %path.display(), changed, "merged app module");
        return Ok(Some(WiringOutcome {
            path,
            created: false,
            changed,
        }));
    }

    write_text(&path, &render_app_module(registrations)).map_err(|err| wiring_io(&path, err))?;
    info!(path = %path.display(), modules = registrations.len(), "created app module");
    Ok(Some(WiringOutcome {
        path,
        created: true,
        changed: true,
    }))
}

fn wiring_io(path: &Path, err: std::io::Error) -> GenerationError {
    GenerationError::Wiring(format!("{}: {err}", path.display()))
}

pub fn render_app_module(registrations: &[ModuleRegistration]) -> String {
    let mut out = CodeWriter::new();
    out.line(import_line(&["Module"], "@nestjs/common"));
    out.line(import_line(&["TypeOrmModule"], "@nestjs/typeorm"));
    for registration in registrations {
        out.line(&registration.import_line);
    }
    out.blank();
    out.line("@Module({");
    out.indent();
    out.line(IMPORTS_BLOCK);
    out.indent();
    out.line("TypeOrmModule.forRoot({");
    out.indent();
    out.line("// Connection settings are supplied by the application.");
    out.dedent();
    out.line("}),");
    for registration in registrations {
        out.line(&registration.registration);
    }
    out.dedent();
    out.line("],");
    out.dedent();
    out.line("})");
    out.line("export class AppModule {}");
    out.finish()
}

/// Append missing imports and registrations to existing module source.
pub fn merge_app_module(
    existing: &str,
    registrations: &[ModuleRegistration],
) -> Result<String, GenerationError> {
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    for registration in registrations {
        if !line_exists(&lines, &registration.import_line) {
            insert_after_last_match(
                &mut lines,
                |line| line.trim_start().starts_with("import "),
                registration.import_line.clone(),
            );
        }
    }

    for registration in registrations {
        if !is_registered(&lines, &registration.class_name) {
            insert_in_imports_block(&mut lines, &registration.class_name)?;
        }
    }

    Ok(reconstruct(existing, &lines))
}

fn line_exists(lines: &[String], line: &str) -> bool {
    lines.iter().any(|existing| existing.trim() == line.trim())
}

fn is_registered(lines: &[String], class_name: &str) -> bool {
    lines
        .iter()
        .any(|line| line.trim().trim_end_matches(',') == class_name)
        || block_line(lines).is_some_and(|idx| {
            inline_entries(&lines[idx]).iter().any(|entry| entry == class_name)
        })
}

fn block_line(lines: &[String]) -> Option<usize> {
    lines.iter().position(|line| line.contains(IMPORTS_BLOCK))
}

/// Entries of a single-line `imports: [A, B]`.
fn inline_entries(line: &str) -> Vec<String> {
    let Some(start) = line.find(IMPORTS_BLOCK) else {
        return Vec::new();
    };
    let body = &line[start + IMPORTS_BLOCK.len()..];
    let Some(end) = body.rfind(']') else {
        return Vec::new();
    };
    body[..end]
        .split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn insert_after_last_match(lines: &mut Vec<String>, predicate: impl Fn(&str) -> bool, new_line: String) {
    let mut insert_idx = None;
    for (idx, line) in lines.iter().enumerate() {
        if predicate(line) {
            insert_idx = Some(idx + 1);
        }
    }
    match insert_idx {
        Some(idx) => lines.insert(idx, new_line),
        None => lines.insert(0, new_line),
    }
}

/// Add `class_name` as the last entry of the `imports: [` array.
fn insert_in_imports_block(lines: &mut Vec<String>, class_name: &str) -> Result<(), GenerationError> {
    let start_idx = block_line(lines)
        .ok_or_else(|| GenerationError::Wiring(format!("no '{IMPORTS_BLOCK}' block found")))?;

    let start_line = &lines[start_idx];
    let block_offset = start_line.find(IMPORTS_BLOCK).unwrap_or(0);
    let mut depth = count_brackets(&start_line[block_offset..]);
    if depth == 0 {
        // Single-line array: splice before the closing bracket.
        let line = &mut lines[start_idx];
        if let Some(close) = line.rfind(']') {
            let before = line[..close].trim_end();
            let separator = if before.ends_with('[') || before.ends_with(',') { "" } else { ", " };
            let spliced = format!("{before}{separator}{class_name}{}", &line[close..]);
            *line = spliced;
            return Ok(());
        }
        return Err(GenerationError::Wiring(
            "unterminated single-line imports block".to_string(),
        ));
    }

    let indent = format!("{}  ", leading_whitespace(start_line));
    let mut idx = start_idx + 1;
    while idx < lines.len() {
        depth += count_brackets(&lines[idx]);
        if depth == 0 {
            ensure_trailing_comma(lines, start_idx, idx);
            lines.insert(idx, format!("{indent}{class_name},"));
            return Ok(());
        }
        idx += 1;
    }
    Err(GenerationError::Wiring(format!(
        "failed to locate end of '{IMPORTS_BLOCK}' block"
    )))
}

/// The entry before the closing bracket needs a comma once something follows it.
fn ensure_trailing_comma(lines: &mut [String], start_idx: usize, close_idx: usize) {
    let mut idx = close_idx;
    while idx > start_idx + 1 {
        idx -= 1;
        let trimmed = lines[idx].trim_end();
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with("//") {
            continue;
        }
        if !trimmed.ends_with(',') && !trimmed.ends_with('[') {
            lines[idx] = format!("{trimmed},");
        }
        return;
    }
}

fn count_brackets(line: &str) -> i32 {
    let mut depth = 0;
    for ch in line.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

fn reconstruct(original: &str, lines: &[String]) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(class: &str, specifier: &str) -> ModuleRegistration {
        ModuleRegistration {
            class_name: class.to_string(),
            import_line: import_line(&[class], specifier),
            registration: format!("{class},"),
        }
    }

    #[test]
    fn new_module_lists_every_registration() {
        let rendered = render_app_module(&[
            registration("UsersModule", "./users/users.module"),
            registration("OrdersModule", "./orders/orders.module"),
        ]);
        assert!(rendered.contains("import { UsersModule } from './users/users.module';"));
        assert!(rendered.contains("    UsersModule,\n    OrdersModule,\n  ],"));
        assert!(rendered.ends_with("export class AppModule {}\n"));
    }

    #[test]
    fn merge_appends_without_reordering() {
        let existing = "import { Module } from '@nestjs/common';\nimport { HealthModule } from './health/health.module';\n\n@Module({\n  imports: [\n    HealthModule\n  ],\n})\nexport class AppModule {}\n";
        let merged =
            merge_app_module(existing, &[registration("UsersModule", "./users/users.module")])
                .expect("merge");
        assert_eq!(
            merged,
            "import { Module } from '@nestjs/common';\nimport { HealthModule } from './health/health.module';\nimport { UsersModule } from './users/users.module';\n\n@Module({\n  imports: [\n    HealthModule,\n    UsersModule,\n  ],\n})\nexport class AppModule {}\n"
        );
        let again =
            merge_app_module(&merged, &[registration("UsersModule", "./users/users.module")])
                .expect("merge");
        assert_eq!(again, merged);
    }

    #[test]
    fn merge_handles_single_line_arrays() {
        let existing = "import { Module } from '@nestjs/common';\n@Module({ imports: [HealthModule] })\nexport class AppModule {}";
        let merged =
            merge_app_module(existing, &[registration("UsersModule", "./users/users.module")])
                .expect("merge");
        assert!(merged.contains("@Module({ imports: [HealthModule, UsersModule] })"));
        assert!(!merged.ends_with('\n'));
    }

    #[test]
    fn unwritable_app_module_reports_a_wiring_error() {
        let dir = std::env::temp_dir().join(format!("schemaforge-wiring-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("app.module.ts")).expect("dir");

        let err = write_app_module(&dir, &[registration("UsersModule", "./users/users.module")])
            .expect_err("app.module.ts is a directory");
        match err {
            GenerationError::Wiring(message) => {
                assert!(message.contains("app.module.ts"), "{message}");
            }
            other => panic!("expected wiring error, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn merge_without_imports_block_is_an_error() {
        let existing = "@Module({})\nexport class AppModule {}\n";
        let err = merge_app_module(existing, &[registration("UsersModule", "./users/users.module")])
            .expect_err("no block");
        assert!(matches!(err, GenerationError::Wiring(_)));
    }
}

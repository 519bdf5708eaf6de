//! `index.ts` aggregating every entity class in the shared entities directory.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::GenerationError;
use crate::paths::{import_specifier, write_text};

const INDEX_FILE: &str = "index.ts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntity {
    pub class_name: String,
    pub file_name: String,
    /// Import specifier relative to the index file.
    pub specifier: String,
}

/// Exported class name of an entity source file.
pub fn extract_class_name(source: &str) -> Option<String> {
    let re = Regex::new(r"export\s+class\s+(\w+)").ok()?;
    re.captures(source)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
}

/// Entity files under `dir`, recursively, sorted by class name.
pub fn scan_entities(dir: &Path) -> Result<Vec<IndexedEntity>, GenerationError> {
    let mut files = Vec::new();
    collect_entity_files(dir, &mut files)?;

    let mut entities = Vec::new();
    for file in files {
        let source = std::fs::read_to_string(&file)?;
        let Some(class_name) = extract_class_name(&source) else {
            warn!(path = %file.display(), "no exported class in entity file");
            continue;
        };
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        entities.push(IndexedEntity {
            class_name,
            file_name,
            specifier: import_specifier(dir, &file),
        });
    }
    entities.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then_with(|| a.specifier.cmp(&b.specifier))
    });
    Ok(entities)
}

pub(crate) fn collect_entity_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), GenerationError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_entity_files(&path, out)?;
            continue;
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let skipped = name == INDEX_FILE || name.ends_with(".spec.ts") || name.ends_with(".test.ts");
        if name.ends_with(".entity.ts") && !skipped {
            out.push(path);
        }
    }
    Ok(())
}

pub fn render_index(entities: &[IndexedEntity]) -> String {
    let mut lines = vec![
        "// Generated entity index - Auto-generated, do not edit manually".to_string(),
        String::new(),
    ];

    if !entities.is_empty() {
        lines.push("// Entity imports".to_string());
        for entity in entities {
            lines.push(format!(
                "import {{ {} }} from '{}';",
                entity.class_name, entity.specifier
            ));
        }
        lines.push(String::new());

        lines.push("// Named exports".to_string());
        lines.push("export {".to_string());
        push_list(&mut lines, entities, |entity| entity.class_name.clone());
        lines.push("};".to_string());
        lines.push(String::new());

        lines.push("// Entities array for TypeORM configuration".to_string());
        lines.push("export const Entities = [".to_string());
        push_list(&mut lines, entities, |entity| entity.class_name.clone());
        lines.push("];".to_string());
        lines.push(String::new());
    }

    lines.push(format!("// Total entities: {}", entities.len()));
    lines.push(format!("export const ENTITY_COUNT = {};", entities.len()));
    lines.push(String::new());

    lines.push("// Entity names for reference".to_string());
    if entities.is_empty() {
        lines.push("export const ENTITY_NAMES: string[] = [];".to_string());
    } else {
        lines.push("export const ENTITY_NAMES = [".to_string());
        push_list(&mut lines, entities, |entity| format!("'{}'", entity.class_name));
        lines.push("];".to_string());
    }
    lines.push(String::new());

    lines.push("// Entity metadata".to_string());
    lines.push("export const ENTITY_METADATA = [".to_string());
    for (position, entity) in entities.iter().enumerate() {
        let comma = if position + 1 < entities.len() { "," } else { "" };
        lines.push("  {".to_string());
        lines.push(format!("    name: '{}',", entity.class_name));
        lines.push(format!("    fileName: '{}',", entity.file_name));
        lines.push(format!("    class: {}", entity.class_name));
        lines.push(format!("  }}{comma}"));
    }
    lines.push("];".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_list(lines: &mut Vec<String>, entities: &[IndexedEntity], item: impl Fn(&IndexedEntity) -> String) {
    for (position, entity) in entities.iter().enumerate() {
        let comma = if position + 1 < entities.len() { "," } else { "" };
        lines.push(format!("  {}{comma}", item(entity)));
    }
}

/// Scan `entities_dir` and write its `index.ts`. Returns the path and entity count.
pub fn write_entity_index(entities_dir: &Path) -> Result<(PathBuf, usize), GenerationError> {
    let entities = scan_entities(entities_dir)?;
    let path = entities_dir.join(INDEX_FILE);
    write_text(&path, &render_index(&entities))?;
    debug!(path = %path.display(), entities = entities.len(), "wrote entity index");
    Ok((path, entities.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_first_exported_class() {
        let source = "import { Entity } from 'typeorm';\n\n@Entity('users')\nexport class Users {\n}\n";
        assert_eq!(extract_class_name(source).as_deref(), Some("Users"));
        assert_eq!(extract_class_name("export enum Status {}"), None);
    }

    #[test]
    fn scans_sorted_by_class_and_skips_index_files() {
        let dir = std::env::temp_dir().join(format!("schemaforge-index-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("nested")).expect("dir");
        std::fs::write(dir.join("users.entity.ts"), "export class Users {}\n").expect("write");
        std::fs::write(dir.join("nested/accounts.entity.ts"), "export class Accounts {}\n")
            .expect("write");
        std::fs::write(dir.join("index.ts"), "export class Ignored {}\n").expect("write");
        std::fs::write(dir.join("users.entity.spec.ts"), "export class Spec {}\n").expect("write");

        let (path, count) = write_entity_index(&dir).expect("index");
        assert_eq!(count, 2);
        let rendered = std::fs::read_to_string(path).expect("read");
        assert!(rendered.contains("import { Accounts } from './nested/accounts.entity';"));
        assert!(rendered.contains("import { Users } from './users.entity';"));
        assert!(rendered.contains("export const Entities = [\n  Accounts,\n  Users\n];"));
        assert!(rendered.contains("export const ENTITY_COUNT = 2;"));
        assert!(rendered.contains("export const ENTITY_NAMES = [\n  'Accounts',\n  'Users'\n];"));

        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Output locations and import specifiers.

use std::fs;
use std::path::{Component, Path, PathBuf};

use schemaforge_core::naming::{to_class_name, to_file_stem, to_module_name};
use schemaforge_core::{OutputPaths, TableInfo};

/// Lexically clean a path: drop `.` and fold `..` into a preceding name.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Path of `to` relative to the directory `from_dir`.
///
/// Both paths are compared lexically; when one is absolute and the other is
/// not, `to` is returned unchanged.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from = normalize(from_dir);
    let to = normalize(to);
    if from.is_absolute() != to.is_absolute() {
        return to;
    }

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(left, right)| left == right)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from_parts.len() {
        out.push("..");
    }
    for part in &to_parts[common..] {
        out.push(part.as_os_str());
    }
    out
}

/// Module specifier for importing `target_file` from a file in `from_dir`:
/// forward slashes, no `.ts` extension, always starting with `.`.
pub fn import_specifier(from_dir: &Path, target_file: &Path) -> String {
    let relative = relative_path(from_dir, target_file);
    let mut spec = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if let Some(stripped) = spec.strip_suffix(".ts") {
        spec = stripped.to_string();
    }
    if spec.starts_with('.') {
        spec
    } else {
        format!("./{spec}")
    }
}

/// Create parent directories and write the file.
pub fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Where every artifact for one table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub class_name: String,
    pub stem: String,
    pub module_name: String,
    pub module_dir: PathBuf,
    /// Entity file the CRUD artifacts import.
    pub entity_path: PathBuf,
    /// The entity lives in the shared entities directory.
    pub shared_entity: bool,
}

impl TableLayout {
    /// Resolve locations for `table`. The shared entity is used when it
    /// exists on disk; only existence is checked, never content.
    pub fn resolve(table: &TableInfo, paths: &OutputPaths) -> Self {
        let stem = to_file_stem(&table.name);
        let module_name = to_module_name(&table.name);
        let module_dir = paths.crud.join(&module_name);
        let shared = shared_entity_path(paths, &stem);
        let shared_entity = shared.is_file();
        let entity_path = if shared_entity {
            shared
        } else {
            module_dir.join("entities").join(entity_file_name(&stem))
        };
        Self {
            class_name: to_class_name(&table.name),
            stem,
            module_name,
            module_dir,
            entity_path,
            shared_entity,
        }
    }

    pub fn dto_dir(&self) -> PathBuf {
        self.module_dir.join("dto")
    }

    pub fn file(&self, suffix: &str) -> PathBuf {
        self.module_dir.join(format!("{}.{suffix}.ts", self.stem))
    }

    pub fn dto_file(&self, prefix: &str) -> PathBuf {
        self.dto_dir().join(format!("{prefix}-{}.dto.ts", self.stem))
    }

    /// Import specifier for the entity from a file in `from_dir`.
    pub fn entity_import_from(&self, from_dir: &Path) -> String {
        import_specifier(from_dir, &self.entity_path)
    }
}

pub fn entity_file_name(stem: &str) -> String {
    format!("{stem}.entity.ts")
}

pub fn shared_entity_path(paths: &OutputPaths, stem: &str) -> PathBuf {
    paths.entities.join(entity_file_name(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_walks_up_and_down() {
        assert_eq!(
            relative_path(Path::new("./src/orders"), Path::new("./src/entities/orders.entity.ts")),
            PathBuf::from("../entities/orders.entity.ts")
        );
        assert_eq!(
            relative_path(Path::new("src"), Path::new("src/orders/orders.module.ts")),
            PathBuf::from("orders/orders.module.ts")
        );
    }

    #[test]
    fn import_specifiers_are_dot_relative_without_extension() {
        assert_eq!(
            import_specifier(Path::new("src/orders"), Path::new("src/orders/entities/orders.entity.ts")),
            "./entities/orders.entity"
        );
        assert_eq!(
            import_specifier(Path::new("src/orders/dto"), Path::new("src/entities/orders.entity.ts")),
            "../../entities/orders.entity"
        );
    }

    #[test]
    fn normalize_folds_parent_components() {
        assert_eq!(normalize(Path::new("./a/b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn layout_falls_back_to_local_entity() {
        let root = std::env::temp_dir().join(format!("schemaforge-paths-{}", uuid::Uuid::new_v4()));
        let paths = OutputPaths::default().rooted_at(&root);
        let table = TableInfo {
            name: "order_items".to_string(),
            schema_name: "public".to_string(),
            comment: None,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        };
        let layout = TableLayout::resolve(&table, &paths);
        assert_eq!(layout.class_name, "OrderItems");
        assert_eq!(layout.module_name, "orderItems");
        assert!(!layout.shared_entity);
        assert_eq!(
            layout.entity_import_from(&layout.module_dir),
            "./entities/order-items.entity"
        );
        assert_eq!(
            layout.file("service"),
            root.join("./src").join("orderItems").join("order-items.service.ts")
        );
    }
}

//! # Catálogo de Guiones Generados
//! src/jobs/artifacts.rs
//!
//! Lectura del output store para `GET /scripts` y escritura de artefactos
//! con el formato `# <título>\n\n<cuerpo>`.

use crate::error::{Error, Result};
use crate::jobs::storage::{FileStore, Store};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Un guion terminado
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptArtifact {
    /// Nombre del archivo sin `.md`
    pub name: String,

    pub content: String,

    pub modified: DateTime<Utc>,
}

/// Arma el contenido de un artefacto
pub fn render_artifact(title: &str, body: &str) -> String {
    format!("# {}\n\n{}", title, body.trim_end())
}

/// Escribe el artefacto `key` en el output store
pub fn write_artifact(store: &FileStore, key: &str, title: &str, body: &str) -> Result<()> {
    store.write(Store::Output, key, render_artifact(title, body).as_bytes())
}

/// Lista todos los guiones del output store, ordenados por nombre
///
/// Un archivo que desaparece entre el listado y la lectura se omite.
pub fn list_scripts(store: &FileStore) -> Result<Vec<ScriptArtifact>> {
    let mut scripts = Vec::new();

    for name in store.list(Store::Output)? {
        let content = match store.read_to_string(Store::Output, &name) {
            Ok(content) => content,
            Err(Error::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        };
        let modified = match store.modified(Store::Output, &name) {
            Ok(modified) => modified,
            Err(Error::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        };

        scripts.push(ScriptArtifact {
            name,
            content,
            modified,
        });
    }

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::resolver::{ArtifactKeying, StatusResolver, StatusResult};
    use std::fs;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("queue"), dir.path().join("output"));
        store.ensure_all().unwrap();
        (dir, store)
    }

    #[test]
    fn test_empty_output_store() {
        let (_dir, store) = temp_store();
        assert!(list_scripts(&store).unwrap().is_empty());
    }

    #[test]
    fn test_list_scripts() {
        let (_dir, store) = temp_store();

        write_artifact(&store, "volcanoes", "Volcanoes", "Lava.\n").unwrap();
        write_artifact(&store, "roman-aqueducts", "Roman Aqueducts", "Arches.").unwrap();
        fs::write(store.dir(Store::Output).join("draft.txt"), "skip me").unwrap();

        let scripts = list_scripts(&store).unwrap();
        let names: Vec<&str> = scripts.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["roman-aqueducts", "volcanoes"]);
        assert_eq!(scripts[0].content, "# Roman Aqueducts\n\nArches.");
        assert_eq!(scripts[1].content, "# Volcanoes\n\nLava.");
    }

    #[test]
    fn test_list_scripts_with_non_utf8_artifact() {
        let (_dir, store) = temp_store();

        write_artifact(&store, "good", "Good", "fine").unwrap();
        fs::write(store.dir(Store::Output).join("latin.md"), b"caf\xe9").unwrap();

        let scripts = list_scripts(&store).unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[1].name, "latin");
        assert_eq!(scripts[1].content, "caf\u{FFFD}");

        // /status y /scripts leen el mismo texto
        let resolver = StatusResolver::new(store.clone(), ArtifactKeying::Slug);
        assert_eq!(
            resolver.resolve("1-latin").unwrap(),
            StatusResult::Done {
                content: scripts[1].content.clone()
            }
        );
    }

    #[test]
    fn test_script_serialization() {
        let (_dir, store) = temp_store();
        write_artifact(&store, "x", "X", "body").unwrap();

        let json = serde_json::to_value(&list_scripts(&store).unwrap()[0]).unwrap();
        assert_eq!(json["name"], "x");
        assert_eq!(json["content"], "# X\n\nbody");
        assert!(json["modified"].is_string());
    }

    #[test]
    fn test_render_artifact() {
        assert_eq!(render_artifact("T", "b\n\n"), "# T\n\nb");
    }
}

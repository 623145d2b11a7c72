//! Client-local persistence of slot bindings.
//!
//! # Responsibility
//! - Load the binding map once at startup.
//! - Write the whole map through one `save` call after every mutation.
//! - Remember which project file the bindings were made against.
//!
//! # Invariants
//! - On-disk shape is `{ "project": "<path>", "slots": { "<slot key>": <person id> } }`.
//!   A flat `{ "<slot key>": <person id> }` object still loads, with no project.
//! - Unknown keys and non-integer values are dropped on load with a warning.
//! - Bindings survive reopening the same project; any other project clears them.
//! - Writes go to a sibling temp file first, then replace the target.

use super::{BindingError, BindingMap, Slot};
use crate::model::person::PersonId;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Binding map plus the file it is persisted to.
#[derive(Debug, Clone, Default)]
pub struct BindingStore {
    path: Option<PathBuf>,
    project: Option<PathBuf>,
    map: BindingMap,
}

#[derive(Serialize)]
struct BindingFile<'a> {
    project: Option<&'a Path>,
    slots: &'a BindingMap,
}

impl BindingStore {
    /// Store that keeps bindings in memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads bindings from `path`; a missing file yields an empty map.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, BindingError> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path: Some(path),
                    ..Self::default()
                });
            }
            Err(source) => return Err(BindingError::Io { path, source }),
        };

        let object: Map<String, Value> =
            serde_json::from_str(&raw).map_err(|source| BindingError::Json {
                path: path.clone(),
                source,
            })?;
        let (project, map) = decode_file(object);
        debug!(
            "event=bindings_load module=binding status=ok count={} scoped={}",
            map.len(),
            project.is_some()
        );
        Ok(Self {
            path: Some(path),
            project,
            map,
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Project file the bindings belong to, if known.
    pub fn project(&self) -> Option<&Path> {
        self.project.as_deref()
    }

    /// Current bindings.
    pub fn map(&self) -> &BindingMap {
        &self.map
    }

    /// Person bound to `slot`.
    pub fn get(&self, slot: Slot) -> Option<PersonId> {
        self.map.get(&slot).copied()
    }

    /// Binds `slot` and persists the map.
    ///
    /// On a failed write the in-memory binding is reverted so the slot stays
    /// as it was.
    pub fn bind(&mut self, slot: Slot, person_id: PersonId) -> Result<(), BindingError> {
        let previous = self.map.insert(slot, person_id);
        if let Err(err) = self.save() {
            match previous {
                Some(previous) => self.map.insert(slot, previous),
                None => self.map.remove(&slot),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Makes `project` the owner of the bindings.
    ///
    /// Reopening the owning project keeps the map. Any other project starts
    /// from an empty map. Returns whether bindings were dropped.
    pub fn adopt_project(&mut self, project: &Path) -> Result<bool, BindingError> {
        if self.project.as_deref() == Some(project) {
            return Ok(false);
        }
        let previous_project = self.project.replace(project.to_path_buf());
        let previous_map = std::mem::take(&mut self.map);
        let dropped = !previous_map.is_empty();
        if let Err(err) = self.save() {
            self.project = previous_project;
            self.map = previous_map;
            return Err(err);
        }
        Ok(dropped)
    }

    /// Writes the map to the backing file. No-op for in-memory stores.
    pub fn save(&self) -> Result<(), BindingError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let io_err = |source| BindingError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = BindingFile {
            project: self.project.as_deref(),
            slots: &self.map,
        };
        let encoded = serde_json::to_vec_pretty(&file).map_err(|source| {
            BindingError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let temp_path = temp_path_for(path);
        std::fs::write(&temp_path, encoded).map_err(io_err)?;
        std::fs::rename(&temp_path, path).map_err(io_err)?;
        debug!(
            "event=bindings_save module=binding status=ok count={}",
            self.map.len()
        );
        Ok(())
    }
}

fn decode_file(mut object: Map<String, Value>) -> (Option<PathBuf>, BindingMap) {
    let Some(Value::Object(slots)) = object.remove("slots") else {
        // Flat map written before bindings were tied to a project.
        return (None, decode_entries(object));
    };
    let project = match object.remove("project") {
        Some(Value::String(raw)) if !raw.is_empty() => Some(PathBuf::from(raw)),
        _ => None,
    };
    (project, decode_entries(slots))
}

fn decode_entries(object: Map<String, Value>) -> BindingMap {
    let mut map = BindingMap::new();
    for (key, value) in object {
        let Some(slot) = Slot::from_key(&key) else {
            warn!("event=bindings_load module=binding status=skipped reason=unknown_slot key={key}");
            continue;
        };
        match value.as_i64() {
            Some(person_id) => {
                map.insert(slot, person_id);
            }
            None => warn!(
                "event=bindings_load module=binding status=skipped reason=invalid_id slot={slot}"
            ),
        }
    }
    map
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::BindingStore;
    use crate::binding::Slot;
    use std::path::Path;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = BindingStore::load(dir.path().join("bindings.json")).unwrap();
        assert!(store.map().is_empty());
    }

    #[test]
    fn bind_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bindings.json");

        let mut store = BindingStore::load(&path).unwrap();
        store.bind(Slot::Father, 4).unwrap();
        store.bind(Slot::MaternalGrandmother, 9).unwrap();

        let reloaded = BindingStore::load(&path).unwrap();
        assert_eq!(reloaded.get(Slot::Father), Some(4));
        assert_eq!(reloaded.get(Slot::MaternalGrandmother), Some(9));
        assert_eq!(reloaded.get(Slot::You), None);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        std::fs::write(
            &path,
            r#"{"project":"/p/a.ftdb","slots":{"you":3,"cousin":5,"m":"x"}}"#,
        )
        .unwrap();

        let store = BindingStore::load(&path).unwrap();
        assert_eq!(store.map().len(), 1);
        assert_eq!(store.get(Slot::You), Some(3));
        assert_eq!(store.project(), Some(Path::new("/p/a.ftdb")));
    }

    #[test]
    fn flat_file_loads_without_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        std::fs::write(&path, r#"{"you":3,"gfM":8}"#).unwrap();

        let store = BindingStore::load(&path).unwrap();
        assert_eq!(store.get(Slot::MaternalGrandfather), Some(8));
        assert_eq!(store.project(), None);
    }

    #[test]
    fn reopening_same_project_keeps_bindings_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        let project = dir.path().join("Family.ftdb");

        let mut store = BindingStore::load(&path).unwrap();
        assert!(!store.adopt_project(&project).unwrap());
        store.bind(Slot::You, 1).unwrap();
        store.bind(Slot::Father, 2).unwrap();

        let mut reloaded = BindingStore::load(&path).unwrap();
        assert_eq!(reloaded.project(), Some(project.as_path()));
        assert!(!reloaded.adopt_project(&project).unwrap());
        assert_eq!(reloaded.get(Slot::You), Some(1));
        assert_eq!(reloaded.get(Slot::Father), Some(2));
    }

    #[test]
    fn other_project_drops_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");

        let mut store = BindingStore::load(&path).unwrap();
        store.adopt_project(&dir.path().join("a.ftdb")).unwrap();
        store.bind(Slot::Mother, 5).unwrap();

        assert!(store.adopt_project(&dir.path().join("b.ftdb")).unwrap());
        assert!(store.map().is_empty());

        let reloaded = BindingStore::load(&path).unwrap();
        assert!(reloaded.map().is_empty());
        assert_eq!(reloaded.project(), Some(dir.path().join("b.ftdb").as_path()));
    }

    #[test]
    fn flat_bindings_are_dropped_when_a_project_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        std::fs::write(&path, r#"{"you":3}"#).unwrap();

        let mut store = BindingStore::load(&path).unwrap();
        assert!(store.adopt_project(&dir.path().join("a.ftdb")).unwrap());
        assert_eq!(store.get(Slot::You), None);
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        std::fs::write(&path, "[1,2,3]").unwrap();
        assert!(BindingStore::load(&path).is_err());
    }
}

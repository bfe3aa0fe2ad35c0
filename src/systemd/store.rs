use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::TunnelError;
use crate::systemd::unit;

/// Where tunnel descriptors live, keyed by bare tunnel name.
pub trait DescriptorStore {
    /// All tunnel names, sorted.
    fn names(&self) -> Result<Vec<String>, TunnelError>;
    fn exists(&self, name: &str) -> Result<bool, TunnelError>;
    fn read(&self, name: &str) -> Result<Option<String>, TunnelError>;
    fn write(&self, name: &str, contents: &str) -> Result<(), TunnelError>;
    fn remove(&self, name: &str) -> Result<(), TunnelError>;
}

/// The systemd user unit directory, usually `~/.config/systemd/user`.
pub struct UnitDir {
    dir: PathBuf,
}

impl UnitDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn unit_path(&self, name: &str) -> PathBuf {
        self.dir.join(unit::unit_name(name))
    }
}

impl DescriptorStore for UnitDir {
    fn names(&self) -> Result<Vec<String>, TunnelError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str().and_then(unit::tunnel_name) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> Result<bool, TunnelError> {
        Ok(self.unit_path(name).try_exists()?)
    }

    fn read(&self, name: &str) -> Result<Option<String>, TunnelError> {
        match std::fs::read_to_string(self.unit_path(name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), TunnelError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.unit_path(name);
        std::fs::write(&path, contents)?;
        tracing::debug!(path = %path.display(), "wrote unit file");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), TunnelError> {
        let path = self.unit_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed unit file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = UnitDir::new(tmp.path().join("systemd/user"));
        assert!(store.names().unwrap().is_empty());
        assert!(!store.exists("db").unwrap());
        assert_eq!(store.read("db").unwrap(), None);
    }

    #[test]
    fn test_write_creates_dir_and_file() {
        let tmp = TempDir::new().unwrap();
        let store = UnitDir::new(tmp.path().join("systemd/user"));
        store.write("db", "[Unit]\n").unwrap();

        assert!(store.path().join("simple-tunnel-db.service").is_file());
        assert!(store.exists("db").unwrap());
        assert_eq!(store.read("db").unwrap().as_deref(), Some("[Unit]\n"));
    }

    #[test]
    fn test_names_ignore_foreign_units() {
        let tmp = TempDir::new().unwrap();
        let store = UnitDir::new(tmp.path());
        store.write("web", "x").unwrap();
        store.write("db", "x").unwrap();
        std::fs::write(tmp.path().join("syncthing.service"), "x").unwrap();
        std::fs::write(tmp.path().join("simple-tunnel-db.service.bak"), "x").unwrap();

        assert_eq!(store.names().unwrap(), vec!["db", "web"]);
    }

    #[test]
    fn test_names_skip_hand_placed_invalid_names() {
        let tmp = TempDir::new().unwrap();
        let store = UnitDir::new(tmp.path());
        store.write("db", "x").unwrap();
        std::fs::write(tmp.path().join("simple-tunnel-a b.service"), "x").unwrap();

        assert_eq!(store.names().unwrap(), vec!["db"]);
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let store = UnitDir::new(tmp.path());
        store.write("db", "x").unwrap();
        store.remove("db").unwrap();
        assert!(!store.exists("db").unwrap());
        // Removing twice is harmless
        store.remove("db").unwrap();
    }
}

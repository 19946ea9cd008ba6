use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The CLAUSEMAP_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/clausemap/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("CLAUSEMAP_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("clausemap")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one `<NAME>.json` file per corpus. Created on
    /// demand.
    pub fn corpora_dir(&self) -> Result<PathBuf> {
        let path = self.root.join("corpora");
        std::fs::create_dir_all(&path)
            .map_err(|_| Error::DataDir(path.clone()))?;
        Ok(path)
    }

    /// Optional concept table; the built-in one is used when absent.
    pub fn concepts_file(&self) -> PathBuf {
        self.root.join("concepts.json")
    }

    /// Local telemetry log, also the fallback when the primary sink fails.
    pub fn telemetry_log(&self) -> PathBuf {
        self.root.join("query_log.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.concepts_file(), tmp.path().join("concepts.json"));
        assert_eq!(dir.telemetry_log(), tmp.path().join("query_log.csv"));
    }

    #[test]
    fn explicit_path_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();
        assert!(dir.root().is_dir());
    }

    #[test]
    fn corpora_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let corpora = dir.corpora_dir().unwrap();

        assert!(corpora.exists());
        assert_eq!(corpora, tmp.path().join("corpora"));
    }
}

//! Bucket layout mirrored on the local filesystem

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docpilot_core::{ClinicalError, PatientFolder};

use super::{FOLDER_PREFIX, ObjectStore, patient_folder};

/// Directory laid out like the storage bucket. "Signed URLs" are absolute paths.
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn rfc3339(time: std::io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn signed_url(&self, path: &str) -> Result<String, ClinicalError> {
        let full = self.root.join(path);
        let resolved = tokio::fs::canonicalize(&full)
            .await
            .map_err(|e| ClinicalError::Storage(format!("Object not found: {path} ({e})")))?;
        Ok(resolved.display().to_string())
    }

    async fn list_patient_folders(&self) -> Result<Vec<PatientFolder>, ClinicalError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            ClinicalError::Storage(format!(
                "Error listing {}: {e}",
                self.root.display()
            ))
        })?;

        let mut folders = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ClinicalError::Storage(format!("Error listing patient files: {e}")))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(FOLDER_PREFIX) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            if let Some(folder) = patient_folder(&name, rfc3339(meta.created()), rfc3339(meta.modified())) {
                folders.push(folder);
            }
        }

        folders.sort_by(|a, b| a.folder.cmp(&b.folder));
        Ok(folders)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::storage_path;

    #[tokio::test]
    async fn lists_only_patient_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("patient_bbb_2")).unwrap();
        std::fs::create_dir(dir.path().join("patient_aaa_1")).unwrap();
        std::fs::create_dir(dir.path().join("exports")).unwrap();
        std::fs::write(dir.path().join("patient_notes.txt"), "x").unwrap();

        let folders = LocalStore::new(dir.path()).list_patient_folders().await.unwrap();
        let ids: Vec<_> = folders.iter().map(|f| f.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa-1", "bbb-2"]);
        assert!(folders[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn signed_url_is_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = storage_path("abc-1");
        std::fs::create_dir_all(dir.path().join("patient_abc_1")).unwrap();
        std::fs::write(dir.path().join(&path), "PATIENTID\nabc-1\n").unwrap();

        let store = LocalStore::new(dir.path());
        let url = store.signed_url(&path).await.unwrap();
        assert!(std::path::Path::new(&url).is_absolute());
        assert!(url.ends_with("merged_patient_data.csv"));

        let err = store.signed_url("patient_missing/merged_patient_data.csv").await.unwrap_err();
        assert!(matches!(err, ClinicalError::Storage(_)));
    }
}

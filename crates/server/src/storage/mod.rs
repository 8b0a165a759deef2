//! Object storage holding one merged CSV per patient
//!
//! Layout: `patient_<id with dashes as underscores>/merged_patient_data.csv`.

mod local;
mod supabase;

pub use local::LocalStore;
pub use supabase::{DEFAULT_TIMEOUT as DEFAULT_STORAGE_TIMEOUT, SupabaseStore};

use async_trait::async_trait;
use docpilot_core::{ClinicalError, PatientFolder};

pub const FOLDER_PREFIX: &str = "patient_";
pub const MERGED_FILE: &str = "merged_patient_data.csv";

/// Where patient files live.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// A location the analytical engine can read `path` from.
    async fn signed_url(&self, path: &str) -> Result<String, ClinicalError>;

    /// Top-level patient folders, in store order.
    async fn list_patient_folders(&self) -> Result<Vec<PatientFolder>, ClinicalError>;

    /// Short label for health reporting
    fn backend(&self) -> &'static str;
}

/// Object path of a patient's merged CSV.
pub fn storage_path(patient_id: &str) -> String {
    format!(
        "{FOLDER_PREFIX}{}/{MERGED_FILE}",
        patient_id.replace('-', "_")
    )
}

/// Recover the patient id from a folder name.
pub fn patient_id_from_folder(folder: &str) -> Option<String> {
    folder
        .strip_prefix(FOLDER_PREFIX)
        .filter(|id| !id.is_empty())
        .map(|id| id.replace('_', "-"))
}

/// Build a [`PatientFolder`] if `name` is a patient folder.
pub(crate) fn patient_folder(
    name: &str,
    created_at: Option<String>,
    updated_at: Option<String>,
) -> Option<PatientFolder> {
    patient_id_from_folder(name).map(|patient_id| PatientFolder {
        folder: name.to_string(),
        patient_id,
        created_at,
        updated_at,
    })
}

/// Signed URL of a patient's merged CSV.
pub async fn patient_csv_url(
    store: &dyn ObjectStore,
    patient_id: &str,
) -> Result<String, ClinicalError> {
    store.signed_url(&storage_path(patient_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_uses_underscores() {
        assert_eq!(
            storage_path("006c29d1-d868-3a9e-ceab-31f23e398f45"),
            "patient_006c29d1_d868_3a9e_ceab_31f23e398f45/merged_patient_data.csv"
        );
    }

    #[test]
    fn folder_round_trips_to_id() {
        assert_eq!(
            patient_id_from_folder("patient_0098f2a9_2f4d_4209_778d_cb3426d85987").as_deref(),
            Some("0098f2a9-2f4d-4209-778d-cb3426d85987")
        );
        assert_eq!(patient_id_from_folder("README.md"), None);
        assert_eq!(patient_id_from_folder("patient_"), None);
    }
}

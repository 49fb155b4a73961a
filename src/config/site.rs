use super::deserialize_string_lax;
use serde::{Deserialize, Serialize};

/// Branding shown on every page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Env: `SOFTWARE_NAME`.
    #[serde(default = "default_software_name", deserialize_with = "deserialize_string_lax")]
    pub software_name: String,

    /// Env: `CONTACT_EMAIL`.
    #[serde(default = "default_contact_email", deserialize_with = "deserialize_string_lax")]
    pub contact_email: String,

    /// Env: `TITLE_UPLOAD_FILE`.
    #[serde(default = "default_title_upload_file", deserialize_with = "deserialize_string_lax")]
    pub title_upload_file: String,

    /// Env: `TITLE_DOWNLOAD_FILE`.
    #[serde(default = "default_title_download_file", deserialize_with = "deserialize_string_lax")]
    pub title_download_file: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            software_name: default_software_name(),
            contact_email: default_contact_email(),
            title_upload_file: default_title_upload_file(),
            title_download_file: default_title_download_file(),
        }
    }
}

fn default_software_name() -> String {
    "FileShareApp".to_string()
}

fn default_contact_email() -> String {
    "newcontact@example.com".to_string()
}

fn default_title_upload_file() -> String {
    "Téléverser un Fichier".to_string()
}

fn default_title_download_file() -> String {
    "Télécharger un Fichier".to_string()
}

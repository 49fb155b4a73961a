mod basic;
mod limits;
mod site;
mod storage;

pub use basic::BasicConfig;
pub use limits::LimitsConfig;
pub use site::SiteConfig;
pub use storage::StorageConfig;

use crate::error::SatchelError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upload storage settings (see `storage` table in config.toml).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-client quotas (see `limits` table in config.toml).
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Page branding (see `site` table in config.toml).
    #[serde(default)]
    pub site: SiteConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const CONFIG_FILE_ENV: &str = "SATCHEL_CONFIG";

/// Bare environment names honoured for compatibility with older deployments.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("secret_key", "basic"),
    ("software_name", "site"),
    ("contact_email", "site"),
    ("title_upload_file", "site"),
    ("title_download_file", "site"),
];

impl Config {
    /// Builds a Figment that merges defaults, an optional TOML file and the environment.
    ///
    /// Precedence (lowest first): defaults, `config.toml` (or `$SATCHEL_CONFIG`),
    /// `SATCHEL_<TABLE>__<KEY>`, then legacy bare variables such as `SECRET_KEY`.
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("SATCHEL_").ignore(&["config"]).split("__"));

        for (key, table) in LEGACY_ENV {
            figment = figment.merge(
                Env::raw()
                    .only(&[key])
                    .map(move |k| format!("{table}.{k}").into()),
            );
        }
        figment
    }

    /// Loads and validates configuration.
    pub fn load() -> Result<Self, SatchelError> {
        let cfg: Self = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), SatchelError> {
        if self.basic.workers == 0 {
            return Err(SatchelError::InvalidConfig(
                "basic.workers must be at least 1".to_string(),
            ));
        }
        if self.limits.enabled && (self.limits.per_day == 0 || self.limits.per_hour == 0) {
            return Err(SatchelError::InvalidConfig(
                "limits.per_day and limits.per_hour must be at least 1".to_string(),
            ));
        }
        if self.storage.allowed_extensions.is_empty() {
            return Err(SatchelError::InvalidConfig(
                "storage.allowed_extensions must not be empty".to_string(),
            ));
        }
        if self.storage.sweep_interval_secs == 0 {
            return Err(SatchelError::InvalidConfig(
                "storage.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts numbers and booleans where a string is expected; env values are
/// type-sniffed by figment, so `SOFTWARE_NAME=2048` arrives as an integer.
fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(serde::de::Error::custom("expected a string or a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.basic.listen_port, 5000);
        assert_eq!(cfg.basic.listen_addr.to_string(), "0.0.0.0");
        assert_eq!(cfg.limits.per_day, 200);
        assert_eq!(cfg.limits.per_hour, 50);
        assert_eq!(cfg.site.software_name, "FileShareApp");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_tables_override_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                listen_port = 8080
                secret_key = 12345

                [storage]
                allowed_extensions = ["txt"]
                "#,
            ))
            .extract()
            .expect("config should extract");

        assert_eq!(cfg.basic.listen_port, 8080);
        assert_eq!(cfg.basic.secret_key, "12345");
        assert_eq!(cfg.storage.allowed_extensions, vec!["txt".to_string()]);
        assert_eq!(cfg.storage.sweep_interval_secs, 300);
    }

    #[test]
    fn legacy_names_override_prefixed_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SATCHEL_SITE__SOFTWARE_NAME", "Prefixed");
            jail.set_env("SATCHEL_SITE__CONTACT_EMAIL", "ops@example.org");
            jail.set_env("SOFTWARE_NAME", "Legacy");

            let cfg = Config::load().expect("config should load");
            assert_eq!(cfg.site.software_name, "Legacy");
            assert_eq!(cfg.site.contact_email, "ops@example.org");
            Ok(())
        });
    }

    #[test]
    fn numeric_legacy_values_are_kept_as_text() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SOFTWARE_NAME", "2048");
            jail.set_env("TITLE_UPLOAD_FILE", "42");
            jail.set_env("SECRET_KEY", "987654321");
            jail.set_env("CONTACT_EMAIL", "true");

            let cfg = Config::load().expect("numeric strings must not abort startup");
            assert_eq!(cfg.site.software_name, "2048");
            assert_eq!(cfg.site.title_upload_file, "42");
            assert_eq!(cfg.site.contact_email, "true");
            assert_eq!(cfg.basic.secret_key, "987654321");
            Ok(())
        });
    }

    #[test]
    fn load_reports_invalid_values_as_satchel_errors() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SATCHEL_BASIC__WORKERS", "0");
            assert!(matches!(Config::load(), Err(SatchelError::InvalidConfig(_))));

            jail.set_env("SATCHEL_BASIC__WORKERS", "many");
            assert!(matches!(Config::load(), Err(SatchelError::Config(_))));
            Ok(())
        });
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut cfg = Config::default();
        cfg.basic.workers = 0;
        assert!(matches!(
            cfg.validate(),
            Err(SatchelError::InvalidConfig(_))
        ));
    }
}

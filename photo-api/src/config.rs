use std::{str::FromStr, time::Duration};

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

use crate::domain::{
    models::{MissingAssetPolicy, UploadTransform},
    services::PhotoPolicy,
};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    /// Without a database section photo metadata is kept in memory.
    pub database: Option<DatabaseSettings>,
    pub storage: StorageSettings,
    pub photos: PhotoSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub app_url: String,
    /// Header carrying the user id verified by the upstream identity provider.
    pub identity_header: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Memory,
    Cloudinary,
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    pub provider: StorageProvider,
    pub cloudinary: Option<CloudinarySettings>,
}

#[derive(Deserialize, Clone)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_cloudinary_api")]
    pub api_base_url: String,
    pub folder: Option<String>,
}

fn default_cloudinary_api() -> String {
    "https://api.cloudinary.com/".to_string()
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct PhotoSettings {
    #[serde(default)]
    pub transform: UploadTransform,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_upload_bytes: usize,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub remote_timeout_secs: u64,
    #[serde(default)]
    pub missing_asset_policy: MissingAssetPolicy,
}

impl PhotoSettings {
    pub fn policy(&self) -> PhotoPolicy {
        PhotoPolicy {
            max_upload_bytes: self.max_upload_bytes,
            remote_timeout: Duration::from_secs(self.remote_timeout_secs),
            missing_asset_policy: self.missing_asset_policy,
        }
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|err| config::ConfigError::Message(format!("no working directory: {err}")))?;
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .map_err(|err| config::ConfigError::Message(format!("invalid APP_ENVIRONMENT: {err}")))?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("PHOTO")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert!(matches!(
            Environment::from_str("Production"),
            Ok(Environment::Production)
        ));
        assert_eq!(Environment::Local.to_string(), "local");
        assert!(Environment::from_str("staging").is_err());
    }

    #[test]
    fn photo_settings_deserialize_with_defaults() {
        let settings = config::Config::builder()
            .set_override("max_upload_bytes", "1024")
            .unwrap()
            .set_override("remote_timeout_secs", "5")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<PhotoSettings>()
            .unwrap();

        assert_eq!(settings.transform, UploadTransform::default());
        assert_eq!(settings.missing_asset_policy, MissingAssetPolicy::Fail);

        let policy = settings.policy();
        assert_eq!(policy.max_upload_bytes, 1024);
        assert_eq!(policy.remote_timeout, Duration::from_secs(5));
    }
}

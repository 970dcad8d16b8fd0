use crate::error::SettingsError;

/// Secrets shipped as placeholders by earlier deployments. Never accepted.
const PLACEHOLDER_SECRETS: [&str; 2] = [
    "ACCESS_TOKEN_SECRET_CHANGE_ME",
    "REFRESH_TOKEN_SECRET_CHANGE_ME",
];
const MIN_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub redis: RedisSettings,
    #[serde(default)]
    pub blacklist: BlacklistSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
}

/// Which backend holds revoked token ids
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct BlacklistSettings {
    #[serde(default)]
    pub backend: BlacklistBackend,
    /// Sweep period for the in-memory backend, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for BlacklistSettings {
    fn default() -> Self {
        Self {
            backend: BlacklistBackend::default(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// JWT signing settings.
///
/// Access and refresh tokens are signed with independent secrets.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry: i64,   // seconds (900 = 15 minutes)
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry: i64,  // seconds (604800 = 7 days)
    pub issuer: String,
}

fn default_access_expiry() -> i64 {
    15 * 60
}

fn default_refresh_expiry() -> i64 {
    7 * 24 * 60 * 60
}

impl JwtSettings {
    /// Reject settings that would make tokens forgeable or meaningless.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, secret) in [
            ("jwt.access_secret", &self.access_secret),
            ("jwt.refresh_secret", &self.refresh_secret),
        ] {
            if secret.trim().is_empty() {
                return Err(SettingsError::MissingRequired(name.to_string()));
            }
            if PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
                return Err(SettingsError::InvalidValue(format!(
                    "{} is a placeholder value",
                    name
                )));
            }
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(SettingsError::InvalidValue(format!(
                    "{} must be at least {} bytes",
                    name, MIN_SECRET_LENGTH
                )));
            }
        }

        if self.access_secret == self.refresh_secret {
            return Err(SettingsError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }

        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(SettingsError::InvalidValue(
                "token expiry must be positive".to_string(),
            ));
        }

        if self.issuer.trim().is_empty() {
            return Err(SettingsError::MissingRequired("jwt.issuer".to_string()));
        }

        Ok(())
    }
}

/// Load settings from `configuration.{yaml,toml,json}` overlaid with
/// `APP_`-prefixed environment variables (`APP_JWT__ACCESS_SECRET`, ...).
pub fn get_configuration() -> Result<Settings, SettingsError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.jwt.validate()?;
    Ok(settings)
}

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, DEFAULT_REGISTER_PATH,
    DEFAULT_STORAGE_DIR, DEFAULT_STORAGE_KEY, DEFAULT_TIMEOUT_SECS,
};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::error;

/// How the refresh credential is presented to the refresh endpoint.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// `{"refresh": "<token>"}` in the JSON body.
    Body,
    /// `Authorization: Bearer <token>` with an empty JSON body.
    Bearer,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" => Ok(RefreshMode::Body),
            "bearer" => Ok(RefreshMode::Bearer),
            other => Err(format!("unknown refresh mode: {other}")),
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshMode::Body => write!(f, "body"),
            RefreshMode::Bearer => write!(f, "bearer"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rest_api: RestApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RestApiConfig {
    pub base_url: String,
    pub timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub login_path: String,
    pub refresh_path: String,
    pub register_path: String,
    pub refresh_mode: RefreshMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub dir: String,
    pub key: String,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"rest_api\":{},\"auth\":{},\"storage\":{}}}",
            self.rest_api, self.auth, self.storage
        )
    }
}

impl fmt::Display for RestApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"base_url\":\"{}\",\"timeout\":{}}}",
            self.base_url, self.timeout
        )
    }
}

impl fmt::Display for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"login_path\":\"{}\",\"refresh_path\":\"{}\",\"register_path\":\"{}\",\"refresh_mode\":\"{}\"}}",
            self.login_path, self.refresh_path, self.register_path, self.refresh_mode
        )
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"dir\":\"{}\",\"key\":\"{}\"}}", self.dir, self.key)
    }
}

pub fn get_env_or_default<T: FromStr>(env_var: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) => val.parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", env_var, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            rest_api: RestApiConfig {
                base_url: get_env_or_default("CMS_API_BASE_URL", String::from(DEFAULT_BASE_URL)),
                timeout: get_env_or_default("CMS_API_TIMEOUT", DEFAULT_TIMEOUT_SECS),
            },
            auth: AuthConfig {
                login_path: get_env_or_default(
                    "CMS_AUTH_LOGIN_PATH",
                    String::from(DEFAULT_LOGIN_PATH),
                ),
                refresh_path: get_env_or_default(
                    "CMS_AUTH_REFRESH_PATH",
                    String::from(DEFAULT_REFRESH_PATH),
                ),
                register_path: get_env_or_default(
                    "CMS_AUTH_REGISTER_PATH",
                    String::from(DEFAULT_REGISTER_PATH),
                ),
                refresh_mode: get_env_or_default("CMS_AUTH_REFRESH_MODE", RefreshMode::Body),
            },
            storage: StorageConfig {
                dir: get_env_or_default("CMS_STORAGE_DIR", String::from(DEFAULT_STORAGE_DIR)),
                key: get_env_or_default("CMS_STORAGE_KEY", String::from(DEFAULT_STORAGE_KEY)),
            },
        }
    }

    /// Same as [`Config::new`] but pointed at another API root.
    pub fn with_base_url(base_url: &str) -> Self {
        let mut config = Self::new();
        config.rest_api.base_url = base_url.to_string();
        config
    }
}

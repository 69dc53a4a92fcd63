use crate::error::{PresaleError, Result};

/// Connection parameters for the hosted Firestore database.
#[derive(Clone, Debug, PartialEq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: Option<String>,
    pub storage_bucket: Option<String>,
    pub sender_id: Option<String>,
    pub app_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub firebase: FirebaseConfig,
}

/// Values baked in by `build.rs`. `option_env!` only accepts literals.
fn build_env(key: &str) -> Option<&'static str> {
    match key {
        "PRESALE_API_URL" => option_env!("PRESALE_API_URL"),
        "FIREBASE_API_KEY" => option_env!("FIREBASE_API_KEY"),
        "FIREBASE_AUTH_DOMAIN" => option_env!("FIREBASE_AUTH_DOMAIN"),
        "FIREBASE_PROJECT_ID" => option_env!("FIREBASE_PROJECT_ID"),
        "FIREBASE_STORAGE_BUCKET" => option_env!("FIREBASE_STORAGE_BUCKET"),
        "FIREBASE_SENDER_ID" => option_env!("FIREBASE_SENDER_ID"),
        "FIREBASE_APP_ID" => option_env!("FIREBASE_APP_ID"),
        _ => None,
    }
}

impl Config {
    pub fn from_build_env() -> Result<Self> {
        Self::from_lookup(|key| build_env(key).map(str::to_string))
    }

    /// Builds the config from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            let val = get(key);
            if val.is_none() {
                missing.push(key);
            }
            val.unwrap_or_default()
        };

        let api_url = required("PRESALE_API_URL");
        let api_key = required("FIREBASE_API_KEY");
        let project_id = required("FIREBASE_PROJECT_ID");

        if !missing.is_empty() {
            return Err(PresaleError::Config(missing));
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            firebase: FirebaseConfig {
                api_key,
                project_id,
                auth_domain: get("FIREBASE_AUTH_DOMAIN"),
                storage_bucket: get("FIREBASE_STORAGE_BUCKET"),
                sender_id: get("FIREBASE_SENDER_ID"),
                app_id: get("FIREBASE_APP_ID"),
            },
        })
    }
}

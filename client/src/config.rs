//! Client configuration loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_HOME_PATH: &str = "/";
const DEFAULT_LOG_JSON: bool = true;

/// Settings for route gating and log output.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HORIZON")]
pub struct ClientSettings {
    /// Path unauthenticated visitors are redirected to.
    pub login_path: Option<String>,
    /// Path signed-in visitors are sent to from guest-only routes.
    pub home_path: Option<String>,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: Option<bool>,
}

impl ClientSettings {
    /// Return the configured login path, falling back to the default.
    #[must_use]
    pub fn login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or(DEFAULT_LOGIN_PATH)
    }

    /// Return the configured home path, falling back to the default.
    #[must_use]
    pub fn home_path(&self) -> &str {
        self.home_path.as_deref().unwrap_or(DEFAULT_HOME_PATH)
    }

    /// Return whether logs are emitted as JSON, defaulting to on.
    #[must_use]
    pub const fn log_json(&self) -> bool {
        match self.log_json {
            Some(enabled) => enabled,
            None => DEFAULT_LOG_JSON,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> ClientSettings {
        ClientSettings::load_from_iter([OsString::from("horizon-client")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("HORIZON_LOGIN_PATH", None::<String>),
            ("HORIZON_HOME_PATH", None::<String>),
            ("HORIZON_LOG_JSON", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.login_path(), DEFAULT_LOGIN_PATH);
        assert_eq!(settings.home_path(), DEFAULT_HOME_PATH);
        assert!(settings.log_json());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("HORIZON_LOGIN_PATH", Some("/auth/sign-in".to_owned())),
            ("HORIZON_HOME_PATH", Some("/dashboard".to_owned())),
            ("HORIZON_LOG_JSON", Some("false".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.login_path(), "/auth/sign-in");
        assert_eq!(settings.home_path(), "/dashboard");
        assert!(!settings.log_json());
    }
}

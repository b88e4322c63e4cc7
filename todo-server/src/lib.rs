pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Deployment environment. API docs are only served outside `production`.
        #[serde(default = "default_app_env")]
        pub app_env: String,
        #[serde(default = "default_cors_allowed_origins")]
        pub cors_allowed_origins: String,
        #[serde(default = "default_cors_allowed_methods")]
        pub cors_allowed_methods: String,
        #[serde(default = "default_cors_allowed_headers")]
        pub cors_allowed_headers: String,
        #[serde(default)]
        pub cors_allow_credentials: bool,
        #[serde(default = "default_request_timeout_secs")]
        pub request_timeout_secs: u64,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        /// Loads configuration from the given environment source.
        pub fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(environment).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        pub fn is_production(&self) -> bool {
            self.app_env.eq_ignore_ascii_case("production")
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_app_env() -> String {
        "development".to_string()
    }

    fn default_cors_allowed_origins() -> String {
        "*".to_string()
    }

    fn default_cors_allowed_methods() -> String {
        "GET, POST, PUT, DELETE, OPTIONS, PATCH".to_string()
    }

    fn default_cors_allowed_headers() -> String {
        "Accept, Authorization, Content-Type, X-CSRF-Token".to_string()
    }

    fn default_request_timeout_secs() -> u64 {
        30
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn environment(vars: &[(&str, &str)]) -> config::Environment {
            let source = vars
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            config::Environment::default().source(Some(source))
        }

        #[test]
        fn can_load_config_with_defaults() {
            let config = Config::from_environment(environment(&[(
                "DB_URL",
                "postgres://localhost/todos",
            )]))
            .unwrap();

            assert_eq!(config.db_url, "postgres://localhost/todos");
            assert_eq!(config.port, 8080);
            assert_eq!(config.app_env, "development");
            assert_eq!(config.cors_allowed_origins, "*");
            assert_eq!(
                config.cors_allowed_methods,
                "GET, POST, PUT, DELETE, OPTIONS, PATCH"
            );
            assert!(!config.cors_allow_credentials);
            assert_eq!(config.request_timeout_secs, 30);
            assert!(!config.is_production());
        }

        #[test]
        fn can_override_defaults_from_environment() {
            let config = Config::from_environment(environment(&[
                ("DB_URL", "postgres://localhost/todos"),
                ("PORT", "9090"),
                ("APP_ENV", "Production"),
                ("CORS_ALLOWED_ORIGINS", "https://example.com"),
                ("CORS_ALLOW_CREDENTIALS", "true"),
            ]))
            .unwrap();

            assert_eq!(config.port, 9090);
            assert_eq!(config.cors_allowed_origins, "https://example.com");
            assert!(config.cors_allow_credentials);
            assert!(config.is_production());
        }

        #[test]
        fn can_reject_missing_db_url() {
            let result = Config::from_environment(environment(&[("PORT", "9090")]));

            assert!(result.is_err());
        }
    }
}
pub mod entities;
pub mod todo;
pub mod web;

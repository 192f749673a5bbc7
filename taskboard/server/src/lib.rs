pub mod config {
    use serde::Deserialize;

    /// Development fallback for the flash-cookie signing secret.
    pub const DEFAULT_SESSION_SECRET: &str = "change-me";

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub database_url: String,
        /// Tenant identifier for the task store; every query is scoped to it.
        #[serde(default)]
        pub project_id: String,
        /// Project id injected by the hosting platform, used when `PROJECT_ID` is unset.
        #[serde(default)]
        google_cloud_project: Option<String>,
        #[serde(default = "default_session_secret")]
        pub session_secret: String,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables.
        ///
        /// Fails when `PROJECT_ID` (or `GOOGLE_CLOUD_PROJECT`) or `DATABASE_URL` is missing,
        /// or when the project id is blank.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            Self::from_settings(settings)
        }

        /// Deserializes and validates an already assembled set of settings.
        pub fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
            let mut config: Config = settings.try_deserialize()?;
            if config.project_id.trim().is_empty() {
                config.project_id = config.google_cloud_project.take().unwrap_or_default();
            }
            if config.project_id.trim().is_empty() {
                anyhow::bail!("Missing PROJECT_ID environment variable");
            }
            if config.session_secret == DEFAULT_SESSION_SECRET {
                tracing::warn!("SESSION_SECRET is not set, falling back to an insecure default");
            }
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_session_secret() -> String {
        DEFAULT_SESSION_SECRET.to_string()
    }

}
pub mod entities;
pub mod flash;
pub mod task;
pub mod web;

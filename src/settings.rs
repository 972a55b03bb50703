use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::models::projects::TransitionPolicy;

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Http {
    pub listen: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Mail {
    pub enabled: bool,
    pub relay_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Projects {
    pub transition_policy: TransitionPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub loyalty_cycle: i64,
    pub referral_window_months: u32,
    pub referral_completions_required: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Admin {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub mail: Mail,
    #[serde(default)]
    pub projects: Projects,
    #[serde(default)]
    pub rewards: Rewards,
    #[serde(default)]
    pub admin: Admin,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for Http {
    fn default() -> Self {
        Http {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for Mail {
    fn default() -> Self {
        Mail {
            enabled: false,
            relay_url: String::new(),
            api_key: String::new(),
            from: "Studio Portal <no-reply@localhost>".to_string(),
        }
    }
}

impl Default for Rewards {
    fn default() -> Self {
        Rewards {
            loyalty_cycle: 9,
            referral_window_months: 3,
            referral_completions_required: 3,
        }
    }
}

impl Settings {
    /// Reads `path` (if it exists) and then `PORTAL__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::with_name(path).required(false)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .add_source(Environment::with_prefix("PORTAL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

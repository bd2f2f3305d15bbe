use std::{
    env,
    fmt::Debug,
    fs,
    net::IpAddr,
    path::Path,
    str::FromStr,
    sync::{Arc, OnceLock},
};

use anyhow::Context;

/// Boolean-ish toggle for verbose mode. Overrides [`Conf::debug`].
pub const DEBUG_ENV_VAR: &str = "USAGE_DEBUG";

static GLOBAL: OnceLock<Arc<Conf>> = OnceLock::new();

/// Loads the global config from the current directory, once. Later calls
/// return the already-loaded value.
pub fn init() -> anyhow::Result<Arc<Conf>> {
    if let Some(conf) = GLOBAL.get() {
        return Ok(conf.clone());
    }
    let conf = Arc::new(read_or_create_default()?);
    Ok(GLOBAL.get_or_init(|| conf).clone())
}

/// Panics if the config was never [`init`]ed and cannot be loaded now.
#[must_use]
pub fn global() -> Arc<Conf> {
    GLOBAL
        .get_or_init(|| {
            let conf = read_or_create_default().unwrap_or_else(|error| {
                panic!("Failed to initialize global config: {error:?}")
            });
            Arc::new(conf)
        })
        .clone()
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Conf {
    #[serde(
        serialize_with = "serialize_log_level",
        deserialize_with = "deserialize_log_level"
    )]
    pub log_level: tracing::Level,
    pub addr: IpAddr,
    pub port: u16,
    #[serde(default)]
    pub debug: bool,

    /// Fixes the mock data generator's seed, making every response identical.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            addr: "0.0.0.0".parse().unwrap_or_else(|_| {
                unreachable!("Fat-fingered default IP address!")
            }),
            port: 5000,
            debug: false,
            seed: None,
        }
    }
}

impl Conf {
    /// Debug mode raises verbosity to at least DEBUG.
    #[must_use]
    pub fn effective_log_level(&self) -> tracing::Level {
        if self.debug {
            self.log_level.max(tracing::Level::DEBUG)
        } else {
            self.log_level
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var(DEBUG_ENV_VAR) {
            self.debug = parse_flag(&val);
        }
        self
    }
}

/// Anything other than a recognized "yes" is false.
#[must_use]
pub fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn serialize_log_level<S>(
    level: &tracing::Level,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let s = level.to_string();
    serializer.serialize_str(&s)
}

fn deserialize_log_level<'de, D>(
    deserializer: D,
) -> Result<tracing::Level, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let s = String::deserialize(deserializer)?;
    tracing::Level::from_str(&s).map_err(serde::de::Error::custom)
}

pub fn read_or_create_default() -> anyhow::Result<Conf> {
    let path = "conf/conf.toml";
    let conf = read_or_create_default_(path).context(path)?;
    Ok(conf.with_env_overrides())
}

pub fn read_or_create_default_<P: AsRef<Path>>(
    path: P,
) -> anyhow::Result<Conf> {
    let path = path.as_ref();
    let conf = if fs::exists(path)? {
        let s = fs::read_to_string(path)?;
        toml::from_str(&s)?
    } else {
        if let Some(parent) = path.parent() {
            let ctx = format!(
                "Failed to create parent directory \
                for conf file: {path:?}"
            );
            fs::create_dir_all(parent).context(ctx)?;
        }
        let conf = Conf::default();
        let s = toml::to_string_pretty(&conf)?;
        fs::write(path, s)?;
        conf
    };
    Ok(conf)
}

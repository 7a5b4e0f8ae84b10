use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

use crate::Error;
use crate::Result;

const DEFAULT_REQUEST_BUFFER_CAPACITY: usize = 64;
const DEFAULT_BATCHING_ENABLED: bool = true;

const ENV_REQUEST_BUFFER_CAPACITY: &str = "QUERYFAN_REQUEST_BUFFER_CAPACITY";
const ENV_BATCHING_ENABLED: &str = "QUERYFAN_BATCHING_ENABLED";

pub fn config() -> &'static Settings {
    static CONF: OnceLock<Settings> = OnceLock::new();
    CONF.get_or_init(|| match Settings::load() {
        Ok(v) => v,
        Err(e) => {
            panic!("Failed to load configuration: {e:?}");
        }
    })
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Initial capacity of the client's request buffer. Sizing only, never a limit.
    pub request_buffer_capacity: usize,
    /// When false, buffered requests are dispatched one by one instead of merged. Useful
    /// against backends that reject merged documents.
    pub batching_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_buffer_capacity: DEFAULT_REQUEST_BUFFER_CAPACITY,
            batching_enabled: DEFAULT_BATCHING_ENABLED,
        }
    }
}

impl Settings {
    fn load() -> Result<Self> {
        Self::load_from(env::vars().collect())
    }

    fn load_from(vars: HashMap<String, String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(capacity) = vars.get(ENV_REQUEST_BUFFER_CAPACITY) {
            settings.request_buffer_capacity = capacity.parse().map_err(|e| {
                Error::Config(format!("invalid {ENV_REQUEST_BUFFER_CAPACITY}: {e:?}"))
            })?;
        }

        if let Some(enabled) = vars.get(ENV_BATCHING_ENABLED) {
            settings.batching_enabled = enabled
                .parse()
                .map_err(|e| Error::Config(format!("invalid {ENV_BATCHING_ENABLED}: {e:?}")))?;
        }

        Ok(settings)
    }
}

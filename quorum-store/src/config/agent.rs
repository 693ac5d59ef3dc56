use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use prople_quorum_core::group::WaitPolicy;

use crate::common::types::{CommonError, ToValidate};

const DEFAULT_TICK_MS: u64 = 250;

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

/// Identity of the running agent and its polling policy
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Agent {
    pub(super) name: String,

    #[serde(default)]
    pub(super) base: String,

    #[serde(default = "default_tick_ms")]
    pub(super) tick_ms: u64,

    #[serde(default)]
    pub(super) timeout_secs: Option<u64>,

    #[serde(default)]
    pub(super) schema_dir: Option<String>,
}

impl Agent {
    pub fn new(name: &str, base: &str) -> Self {
        Self {
            name: name.to_string(),
            base: base.to_string(),
            ..Default::default()
        }
    }

    pub fn get_name(&self) -> String {
        self.name.to_owned()
    }

    pub fn get_base(&self) -> String {
        self.base.to_owned()
    }

    pub fn get_schema_dir(&self) -> Option<String> {
        self.schema_dir.to_owned()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            tick: Duration::from_millis(self.tick_ms),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            name: String::new(),
            base: String::new(),
            tick_ms: DEFAULT_TICK_MS,
            timeout_secs: None,
            schema_dir: None,
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        if self.name.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "agent: missing name".to_string(),
            ));
        }

        if self.tick_ms == 0 {
            return Err(CommonError::ValidationError(
                "agent: tick_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, Database};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Config {
    #[serde(default)]
    pub(super) database: Database,
    pub(super) agent: Agent,
}

impl Config {
    pub fn new(database: Database, agent: Agent) -> Self {
        Self { database, agent }
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_db(mut self, database: Database) -> Self {
        self.database = database;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn db(&self) -> &Database {
        &self.database
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::default(),
            agent: Agent::default(),
        }
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.agent.validate()?;
        self.database.validate()?;

        Ok(())
    }
}

use clap::Args;

use rst_common::with_logging::log::debug;

use prople_quorum_store::common::helpers::validate;
use prople_quorum_store::config::{Database, Parser};
use prople_quorum_store::db::Builder;
use prople_quorum_store::{Config, Storage};

use crate::types::{CliError, QUORUM_DB_EXT, QUORUM_DEFAULT_BASE, QUORUM_DEFAULT_DIR};
use crate::utils::homedir::setup_homedir;

/// Options shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Keystore name of the agent
    #[arg(long, short, global = true)]
    pub name: Option<String>,

    /// Optional base path segment of the keystore
    #[arg(long, short, global = true)]
    pub base: Option<String>,

    /// Passcode unlocking the signing keys
    #[arg(long, short, global = true)]
    pub passcode: Option<String>,

    /// Agent configuration file, `[database]` and `[agent]` tables
    #[arg(long, short, global = true, value_name = "FILE")]
    pub config: Option<String>,
}

pub struct ContextHandler {
    config: Config,
    storage: Storage,
    unlocked: bool,
}

impl ContextHandler {
    pub fn new(config: Config, storage: Storage, unlocked: bool) -> Self {
        Self {
            config,
            storage,
            unlocked,
        }
    }

    /// Resolve the configuration and open the agent database
    ///
    /// Without a configuration file the database lives at
    /// `~/.quorum/<base>/<name>.redb`.
    pub fn build(args: &GlobalArgs) -> Result<Self, CliError> {
        let config = resolve_config(args)?;

        let config = match args.config {
            Some(_) => config,
            None => {
                let agent = config.agent();
                let base = match agent.get_base().is_empty() {
                    true => QUORUM_DEFAULT_BASE.to_string(),
                    false => agent.get_base(),
                };

                let dir = setup_homedir(&format!("{QUORUM_DEFAULT_DIR}/{base}"))?;
                let path = format!("{dir}/{}.{QUORUM_DB_EXT}", agent.get_name());
                config.with_db(Database::new(&path))
            }
        };

        validate(config.clone()).map_err(|err| CliError::ConfigError(err.to_string()))?;
        debug!(
            "[context:build] name: {} | db: {}",
            config.agent().get_name(),
            config.db().get_path()
        );

        let runner = Builder::new(config.clone())
            .build()
            .map_err(|err| CliError::DBError(err.to_string()))?;

        let passcode = args.passcode.clone().unwrap_or_default();
        let storage = Storage::new(runner, &passcode);
        Ok(Self::new(config, storage, args.passcode.is_some()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Commands that sign need the passcode given explicitly
    pub fn require_passcode(&self) -> Result<(), CliError> {
        match self.unlocked {
            true => Ok(()),
            false => Err(CliError::Usage(
                "--passcode is required to sign".to_string(),
            )),
        }
    }
}

/// Configuration file when given, then the `--name` and `--base` overrides
pub fn resolve_config(args: &GlobalArgs) -> Result<Config, CliError> {
    let config = match &args.config {
        Some(file) => Parser::new(file.clone())
            .parse()
            .map_err(|err| CliError::ConfigError(err.to_string()))?,
        None => Config::default(),
    };

    let mut agent = config.agent().clone();
    if let Some(name) = &args.name {
        agent = agent.with_name(name);
    }

    if let Some(base) = &args.base {
        agent = agent.with_base(base);
    }

    validate(agent.clone()).map_err(|err| CliError::ConfigError(err.to_string()))?;
    Ok(config.with_agent(agent))
}

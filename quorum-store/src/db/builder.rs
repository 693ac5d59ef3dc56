use std::fs;
use std::path::Path;
use std::sync::Arc;

use redb::Database;

use crate::common::types::CommonError;
use crate::config::Config;

use super::runner::TABLE;
use super::Runner;

pub struct Builder {
    cfg: Config,
}

impl Builder {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn build(&self) -> Result<Runner, CommonError> {
        Self::open(Path::new(&self.cfg.db().get_path()))
    }

    /// Open or create the database file at `path` with its parent directories
    pub fn open(path: &Path) -> Result<Runner, CommonError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| CommonError::DBError(err.to_string()))?;
        }

        let db = Database::create(path).map_err(|err| CommonError::DBError(err.to_string()))?;

        let write_txn = db
            .begin_write()
            .map_err(|err| CommonError::DBError(err.to_string()))?;
        {
            let _ = write_txn
                .open_table(TABLE)
                .map_err(|err| CommonError::DBError(err.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|err| CommonError::DBError(err.to_string()))?;

        Ok(Runner::new(Arc::new(db)))
    }
}

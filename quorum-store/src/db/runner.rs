use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use rst_common::with_tokio::tokio::task::spawn_blocking;

use super::types::{AppError, Instruction, OutputOpts};

pub(super) const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("quorum");

fn db_error(err: impl ToString) -> AppError {
    AppError::DbError(err.to_string())
}

#[derive(Clone)]
pub struct Runner {
    db: Arc<Database>,
}

impl Runner {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn exec(&self, instruction: Instruction) -> Result<OutputOpts, AppError> {
        let db = self.db.clone();

        spawn_blocking(move || -> Result<OutputOpts, AppError> {
            match instruction {
                Instruction::Save { key, value } => {
                    let write_txn = db.begin_write().map_err(db_error)?;
                    {
                        let mut table = write_txn.open_table(TABLE).map_err(db_error)?;
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(db_error)?;
                    }
                    write_txn.commit().map_err(db_error)?;

                    Ok(OutputOpts::None)
                }
                Instruction::SaveNew { key, value } => {
                    let write_txn = db.begin_write().map_err(db_error)?;
                    let created = {
                        let mut table = write_txn.open_table(TABLE).map_err(db_error)?;
                        let exists = table.get(key.as_str()).map_err(db_error)?.is_some();
                        if !exists {
                            table
                                .insert(key.as_str(), value.as_slice())
                                .map_err(db_error)?;
                        }

                        !exists
                    };
                    write_txn.commit().map_err(db_error)?;

                    Ok(OutputOpts::Saved { created })
                }
                Instruction::Get { key } => {
                    let read_txn = db.begin_read().map_err(db_error)?;
                    let table = read_txn.open_table(TABLE).map_err(db_error)?;
                    let value = table
                        .get(key.as_str())
                        .map_err(db_error)?
                        .map(|val| val.value().to_vec());

                    Ok(OutputOpts::SingleByte { value })
                }
                Instruction::Remove { key } => {
                    let write_txn = db.begin_write().map_err(db_error)?;
                    let existed = {
                        let mut table = write_txn.open_table(TABLE).map_err(db_error)?;
                        let removed = table.remove(key.as_str()).map_err(db_error)?;
                        removed.is_some()
                    };
                    write_txn.commit().map_err(db_error)?;

                    Ok(OutputOpts::Removed { existed })
                }
                Instruction::List { prefix } => {
                    let read_txn = db.begin_read().map_err(db_error)?;
                    let table = read_txn.open_table(TABLE).map_err(db_error)?;

                    let mut values = Vec::new();
                    for item in table.range(prefix.as_str()..).map_err(db_error)? {
                        let (key, value) = item.map_err(db_error)?;
                        if !key.value().starts_with(prefix.as_str()) {
                            break;
                        }

                        values.push((key.value().to_string(), value.value().to_vec()));
                    }

                    Ok(OutputOpts::MultiBytes { values })
                }
            }
        })
        .await
        .map_err(db_error)?
    }

    pub async fn save(&self, key: String, value: Vec<u8>) -> Result<(), AppError> {
        self.exec(Instruction::Save { key, value }).await.map(|_| ())
    }

    pub async fn save_new(&self, key: String, value: Vec<u8>) -> Result<bool, AppError> {
        match self.exec(Instruction::SaveNew { key, value }).await? {
            OutputOpts::Saved { created } => Ok(created),
            _ => Err(AppError::DbError("unexpected output".to_string())),
        }
    }

    pub async fn get(&self, key: String) -> Result<Option<Vec<u8>>, AppError> {
        match self.exec(Instruction::Get { key }).await? {
            OutputOpts::SingleByte { value } => Ok(value),
            _ => Err(AppError::DbError("unexpected output".to_string())),
        }
    }

    pub async fn remove(&self, key: String) -> Result<bool, AppError> {
        match self.exec(Instruction::Remove { key }).await? {
            OutputOpts::Removed { existed } => Ok(existed),
            _ => Err(AppError::DbError("unexpected output".to_string())),
        }
    }

    pub async fn list(&self, prefix: String) -> Result<Vec<(String, Vec<u8>)>, AppError> {
        match self.exec(Instruction::List { prefix }).await? {
            OutputOpts::MultiBytes { values } => Ok(values),
            _ => Err(AppError::DbError("unexpected output".to_string())),
        }
    }
}

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Database {
    pub(super) path: String,
}

impl Database {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    pub fn get_path(&self) -> String {
        self.path.to_owned()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: "./quorum.redb".to_string(),
        }
    }
}

impl ToValidate for Database {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "database: missing path".to_string(),
            ));
        }

        Ok(())
    }
}

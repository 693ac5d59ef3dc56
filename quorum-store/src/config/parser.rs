use std::fs;

use crate::common::types::CommonError;

use super::Config;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    pub fn parse(&self) -> Result<Config, CommonError> {
        let content = fs::read_to_string(&self.conf_file)
            .map_err(|err| CommonError::ConfigError(format!("{}: {err}", self.conf_file)))?;

        toml::from_str(&content).map_err(|err| CommonError::ConfigError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::common::helpers::{self, testdb};
    use crate::common::types::ToValidate;

    #[test]
    fn test_parse_config() {
        let config = testdb::global_config_parser().parse();
        assert!(!config.is_err());

        let config = config.unwrap();
        assert_eq!(config.agent().get_name(), "alice");
        assert_eq!(config.agent().get_base(), "dev");
        assert_eq!(config.agent().get_schema_dir(), Some("./schemas".to_string()));
        assert_eq!(
            config.agent().wait_policy().timeout,
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.db().get_path(), "./quorum-storage/alice.redb");
        assert!(config.validate().is_ok())
    }

    #[test]
    fn test_parse_invalid_config() {
        let config = Parser::new(testdb::fixture("config_invalid.toml"))
            .parse()
            .unwrap();

        assert!(matches!(
            helpers::validate(config).unwrap_err(),
            CommonError::ValidationError(_)
        ))
    }

    #[test]
    fn test_parse_missing_file() {
        let result = Parser::new(testdb::fixture("missing.toml")).parse();
        assert!(matches!(result.unwrap_err(), CommonError::ConfigError(_)))
    }
}

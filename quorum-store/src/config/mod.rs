mod agent;
pub use agent::Agent;

mod database;
pub use database::Database;

mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;

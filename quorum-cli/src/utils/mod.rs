pub mod bundle;
pub mod homedir;
pub mod terminal;

pub use bundle::Bundle;
pub use terminal::Terminal;

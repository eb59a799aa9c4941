pub mod config;
pub mod file;
pub mod oracle;
pub mod search;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use file::{extract, FileWalker};
pub use oracle::{OllamaClient, OracleError, RelevanceOracle};
pub use search::{SearchEvent, SearchMatch, SearchPipeline, SearchRequest, SearchStats};

pub mod atom;
pub mod cli;
pub mod client;
pub mod load_config;
pub mod prompt;

pub use cli::{execute, run, Cli};

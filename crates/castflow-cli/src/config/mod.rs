mod cli_config;
pub mod paths;

pub use cli_config::CliConfig;

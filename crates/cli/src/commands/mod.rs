pub mod config;
pub mod inspect;
pub mod utils;

pub use config::{handle_config_command, load_config, ConfigCommands};
pub use inspect::{describe_ttl, describe_urn, parse_request, parse_response};

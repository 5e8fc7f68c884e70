pub mod display;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod validate;

pub use display::display_config;
pub use parser::{parse, ConfigError, ParseResult};
pub use types::{AppConfig, ListenAddress, LocationConfig, ServerConfig};
pub use validate::validate;

/// Parses, validates and returns a ready-to-serve configuration.
pub fn load(source: &str) -> ParseResult<AppConfig> {
    let config = parse(source)?;
    validate(&config)?;
    Ok(config)
}

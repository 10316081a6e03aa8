//! Layered settings (TOML file, then `GATEKEEPER__*` environment variables)
//! and the command line.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;

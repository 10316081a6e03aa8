mod auth_api;
mod navigator;
mod session_store;

pub use auth_api::*;
pub use navigator::*;
pub use session_store::*;

pub mod http;

mod auth_api_fake;
mod auth_api_http;
mod navigator_impl;
mod session_store_file;
mod session_store_memory;

pub use auth_api_fake::*;
pub use auth_api_http::*;
pub use navigator_impl::*;
pub use session_store_file::*;
pub use session_store_memory::*;

mod refresh_coordinator;
mod request_gateway;
mod session_manager;

pub use refresh_coordinator::*;
pub use request_gateway::*;
pub use session_manager::*;

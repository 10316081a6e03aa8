mod session;
mod token;
mod user;

pub use session::*;
pub use token::*;
pub use user::*;

#[cfg(test)]
pub(crate) use token::test_tokens;

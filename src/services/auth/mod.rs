pub mod authenticator;
pub mod claims;

pub use authenticator::{AuthError, Authenticator};

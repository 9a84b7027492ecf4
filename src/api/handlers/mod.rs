pub mod auth;
pub use self::auth::{auth, AuthRequest, Rejection};

pub mod health;
pub use self::health::{health, Health};

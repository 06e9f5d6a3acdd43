pub mod auth;
pub mod csrf;
pub mod request_id;

pub use auth::*;
pub use csrf::*;
pub use request_id::*;

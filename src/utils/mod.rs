pub mod cookies;
pub mod email;
pub mod jwt;
pub mod password;
pub mod security;

pub use cookies::*;
pub use email::*;
pub use jwt::*;
pub use password::*;
pub use security::*;

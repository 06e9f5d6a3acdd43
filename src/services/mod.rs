pub mod csrf;
pub mod rate_limit;
pub mod session;
pub mod verification;

pub use csrf::*;
pub use rate_limit::*;
pub use session::*;
pub use verification::*;

pub mod connection;
pub mod memory;
pub mod redis;
pub mod store;

pub use connection::*;
pub use memory::*;
pub use redis::*;
pub use store::*;

pub mod session;
pub mod ttl;

pub use session::*;
pub use ttl::*;

pub mod event;
pub mod meta;
pub mod response;
pub mod rollout;

pub use event::*;
pub use meta::*;
pub use response::*;
pub use rollout::*;

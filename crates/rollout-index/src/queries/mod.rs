pub mod item;
pub mod listing;
pub mod session;

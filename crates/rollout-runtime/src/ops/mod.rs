pub mod export;

pub use export::{export_session, import_session};

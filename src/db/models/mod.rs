//! Database models, one file per table.

pub mod saved_event;
pub mod user;

pub use self::saved_event::*;
pub use self::user::*;

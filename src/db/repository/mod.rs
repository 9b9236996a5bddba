pub mod saved_event;
pub mod user;

pub use saved_event::SavedEventRepository;
pub use user::UserRepository;

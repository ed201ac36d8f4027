pub mod cache;
pub mod error;
pub mod format;
pub mod mail;
pub mod moderation;
pub mod subscriptions;
pub mod users;

pub use error::{ForumError, Result};

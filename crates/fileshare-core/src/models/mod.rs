//! Data models for fileshare entities.
//!
//! - `User`, `NotificationPreferences`, `UserStats`: the account
//! - `AuthPayload`: credential plus identity returned by login/register/refresh
//! - `FileRecord`: an uploaded file and its share links

pub mod file;
pub mod user;

pub use file::FileRecord;
pub use user::{AuthPayload, AuthUser, NotificationPreferences, User, UserStats};

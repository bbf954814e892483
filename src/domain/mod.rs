pub mod bookmark;
pub mod user;

pub use bookmark::{sort_newest_first, Bookmark, NewBookmark};
pub use user::{Session, User};

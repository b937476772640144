pub mod auth;
pub mod category;
pub mod comment;
pub mod moderation;
pub mod post;
pub mod profile;

pub use auth::*;

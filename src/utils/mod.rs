pub mod html;
pub mod jwt;
pub mod password;
pub mod search;
pub mod slug;

pub use html::{escape_text, render_markdown};
pub use jwt::encode_access_token;
pub use password::{hash_password, verify_password};
pub use slug::slugify;

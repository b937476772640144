pub mod category;
pub mod comment;
pub mod post;
pub mod post_category;
pub mod profile;
pub mod user;

pub use category::{CategoryColor, Entity as Category, Model as CategoryModel};
pub use comment::{Entity as Comment, Model as CommentModel, Visibility};
pub use post::{Entity as Post, Model as PostModel, PostStatus};
pub use post_category::Entity as PostCategory;
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use user::{Entity as User, Model as UserModel, Role};

pub mod blog;
pub mod parsed;
pub mod post;

pub use blog::Blog;
pub use parsed::{ParsedFeed, ParsedPost};
pub use post::Post;

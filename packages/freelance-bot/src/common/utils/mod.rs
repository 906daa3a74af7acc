pub mod content_hash;
pub mod text;
pub mod time;

pub use content_hash::*;
pub use text::*;
pub use time::*;

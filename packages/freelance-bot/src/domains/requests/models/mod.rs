pub mod freelance_request;
pub mod parse_log;

pub use freelance_request::*;
pub use parse_log::*;

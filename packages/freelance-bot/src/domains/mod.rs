// Business domains
pub mod categories;
pub mod parsing;
pub mod requests;

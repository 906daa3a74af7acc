pub mod models;

pub use models::{
    CategoryCount, FreelanceRequest, NewFreelanceRequest, ParseLog, ParseStatus, ParseSummary,
    RequestFilter, Urgency, DEFAULT_BUDGET,
};

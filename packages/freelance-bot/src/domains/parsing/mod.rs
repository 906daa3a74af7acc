pub mod analyzer;
pub mod chat_parser;
pub mod job;
pub mod message;

pub use analyzer::{
    attach_metadata, build_prompt, parse_llm_response, split_into_batches, Analyzer,
    AnalyzerError, ExtractedRequest,
};
pub use chat_parser::ChatParser;
pub use job::{run_parse_job, ParseJobOutcome, ParseReport};
pub use message::{filter_messages, ChatMessage, MIN_MESSAGE_CHARS};

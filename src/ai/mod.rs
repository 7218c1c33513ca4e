mod client;
mod parse;
mod prompt;

pub use client::{ChatApi, SummaryClient};
pub use parse::{extract_summary, extract_tags, parse_json_string};
pub use prompt::{
    article_payload, classify_prompt, digest_prompt, ARTICLE_SUMMARY_PROMPT, DEFAULT_LETTER_PROMPT,
};

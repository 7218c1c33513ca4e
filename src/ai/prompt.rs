use serde_json::json;

use crate::error::Result;
use crate::models::Article;

/// Extra instruction clauses composed onto the digest prompt for specific
/// tags. Extend the table instead of branching in the builder.
const TAG_PROMPT_EXTRAS: &[(&str, &[&str])] = &[
    (
        "AI",
        &["Give priority to model releases, benchmark results, and AI regulation; keep company and model names exactly as the source writes them."],
    ),
    (
        "신용카드 업계",
        &["Frame every item around the card-payments industry: issuers, networks, fee schedules, and the regulation that moves them."],
    ),
];

pub const ARTICLE_SUMMARY_PROMPT: &str = r#"You are an AI news summarization service.
News articles are provided as JSON; read them and condense the key points.
Answer with JSON only, exactly parseable as-is, in the following shape:
{"summary": "<the summary>"}"#;

pub const DEFAULT_LETTER_PROMPT: &str = "You are an AI designed to summarize important news \
from multiple sources. News articles are provided as a JSON array; read them, pick out the \
major stories, and write a concise news briefing.";

/// System prompt for the per-tag daily digest. Selection and formatting rules
/// mirror the digest house style: 3-5 themes, ➖-prefixed items, mandatory
/// figures, per-item source link, 200-character limit.
pub fn digest_prompt(tag: &str) -> String {
    let mut prompt = format!(
        r#"Input data format:
{{
  "title": "article title",
  "content": "article body",
  "url": "article URL"
}}
Selection rules:
1. Group the provided articles into 3-5 key themes
2. Assign each article to the single most relevant theme

Summary rules:
1. Open the digest with 《{tag}》
2. Start each item with the ➖ emoji, followed by a space
3. Separate the headline from the detail with '...'
4. Separate main points with commas (,)
5. Always include the key figures, emphasised in bold or quotes
6. Put an emoji matching the story's nature in front of each headline
7. Add 1-2 fitting emoji inside the detail text
8. Keep the whole digest within 200 characters
9. Append the source link after each item

Emoji guide:
- economy/finance: 📈 📉 💹 💰 💲
- industry/manufacturing: 🏭 🔧 ⚙️ 🚗
- energy/environment: ⚡ 🔋 ☢️ 🌱
- trade/shipping: 🚢 ✈️ 📦 🌐
- rise/fall: ⬆️ ⬇️ ↗️ ↘️
- risk/warning: ⚠️ 🚨 ❗
- upside: 📈 💪 ⭐
- downside: 📉 💥 ⚡

Summarize the provided news following the format and rules above, paying
particular attention to:
1. Figures such as '%' and amounts must always appear
2. Put a direction emoji after figures that describe change (e.g. 5%⬆️ 3%⬇️)
3. Emphasise years and dates in single quotes
4. Emphasise amounts and quantities in double quotes"#
    );

    for (extra_tag, clauses) in TAG_PROMPT_EXTRAS {
        if *extra_tag == tag {
            for clause in *clauses {
                prompt.push_str("\n\n");
                prompt.push_str(clause);
            }
        }
    }

    prompt
}

/// System prompt for classifying untagged articles against the known tag
/// vocabulary.
pub fn classify_prompt(vocabulary: &[String]) -> String {
    format!(
        r#"You are an AI designed to classify news by tag.
News articles are provided as JSON; read them and pick the fitting tags.
Choose tags only from the following list: [{}]
Do not add any explanation and do not answer in markdown. Answer with JSON
only, exactly parseable as-is:
{{"tags": ["<tag>", "<tag>"]}}"#,
        vocabulary.join(", ")
    )
}

/// Serialize the article batch into the user message payload.
pub fn article_payload(articles: &[Article]) -> Result<String> {
    let items: Vec<_> = articles
        .iter()
        .map(|article| {
            json!({
                "title": article.title,
                "content": article.content,
                "url": article.url,
            })
        })
        .collect();
    Ok(serde_json::to_string(&items)?)
}

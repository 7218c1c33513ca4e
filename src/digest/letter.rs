use crate::ai::{article_payload, ChatApi, DEFAULT_LETTER_PROMPT};
use crate::error::Result;
use crate::models::{Article, Subscriber};

/// Personalized briefing over a batch of articles, steered by the
/// subscriber's own prompt when they have set one.
pub async fn compose_letter(
    api: &dyn ChatApi,
    subscriber: &Subscriber,
    articles: &[Article],
) -> Result<String> {
    let prompt = subscriber
        .ai_prompt
        .as_deref()
        .unwrap_or(DEFAULT_LETTER_PROMPT);
    let payload = article_payload(articles)?;
    api.chat(prompt, &payload).await
}

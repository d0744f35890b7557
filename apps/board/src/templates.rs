use shared::{countdown, domain::Attributes, session};
use views::Template;

/// One countdown per line: a checkbox, the content, and the author when set.
pub struct CountdownTemplate;

impl Template for CountdownTemplate {
    fn render(&self, attributes: &Attributes) -> String {
        let done = attributes
            .get(countdown::DONE)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let content = attributes
            .get(countdown::CONTENT)
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let author = attributes
            .get(countdown::AUTHOR)
            .and_then(|value| value.as_str())
            .unwrap_or("");

        let check = if done { "x" } else { " " };
        if author.is_empty() {
            format!("[{check}] {content}")
        } else {
            format!("[{check}] {content} ({author})")
        }
    }
}

/// One session per line; sessions in this room are marked with an arrow.
pub struct SessionTemplate;

impl Template for SessionTemplate {
    fn render(&self, attributes: &Attributes) -> String {
        let here = attributes
            .get(session::IS_THIS_ROOM)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let starts_at = attributes
            .get(session::STARTS_AT)
            .and_then(|value| value.as_str())
            .unwrap_or("??:??");
        let room = attributes
            .get(session::IN_ROOM)
            .map(|value| match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            })
            .unwrap_or_default();
        let speaker = attributes
            .get(session::SPEAKER)
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let topic = attributes
            .get(session::TOPIC)
            .and_then(|value| value.as_str())
            .unwrap_or("");

        let marker = if here { ">" } else { " " };
        format!("{marker} {starts_at}  room {room}  {speaker}: {topic}")
    }
}

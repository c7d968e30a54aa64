use conversa_core::error::{ConversaError, Result};
use conversa_core::types::{ContentType, MessageId};
use conversa_store::Store;
use tracing::instrument;

use crate::envelope::InputEnvelope;
use crate::semantic::SemanticBlock;

/// Normalizes a heterogeneous inbound envelope into a canonical
/// `SemanticBlock`, dispatching per `content_type`.
pub struct InputParser<'a> {
    store: &'a Store,
}

impl<'a> InputParser<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, envelope), fields(content_type = %envelope.content_type))]
    pub fn parse(&self, envelope: &InputEnvelope) -> Result<SemanticBlock> {
        let Ok(content_type) = envelope.content_type.parse::<ContentType>() else {
            return self.fallback_to_caption(envelope);
        };

        match content_type {
            ContentType::Text | ContentType::Markdown | ContentType::Command => {
                Ok(self.parse_text(envelope, content_type))
            }
            ContentType::Image => self.parse_image(envelope),
            ContentType::Audio => self.parse_audio(envelope),
            ContentType::ToolOutput => Ok(self.parse_tool_output(envelope)),
            ContentType::QuoteReply => self.parse_quote_reply(envelope),
            ContentType::Prompt => Ok(self.parse_prompt(envelope)),
            ContentType::ToolInput | ContentType::SystemContext => {
                Ok(self.parse_text(envelope, content_type))
            }
            ContentType::Unknown => self.fallback_to_caption(envelope),
        }
    }

    fn parse_text(&self, envelope: &InputEnvelope, content_type: ContentType) -> SemanticBlock {
        let text = envelope.content.as_str().unwrap_or_default().to_string();
        let mut block = SemanticBlock::plain(text.clone(), &content_type.to_string());
        block.tags = detect_tags(&text);
        block.emotion = detect_emotion(&text);
        block
    }

    fn parse_image(&self, envelope: &InputEnvelope) -> Result<SemanticBlock> {
        let caption = envelope
            .metadata
            .get("caption")
            .and_then(|v| v.as_str())
            .unwrap_or("[image]");
        Ok(SemanticBlock::plain(caption, "image"))
    }

    fn parse_audio(&self, envelope: &InputEnvelope) -> Result<SemanticBlock> {
        let transcription = envelope
            .metadata
            .get("transcription")
            .and_then(|v| v.as_str())
            .unwrap_or("[audio]");
        Ok(SemanticBlock::plain(transcription, "audio"))
    }

    fn parse_tool_output(&self, envelope: &InputEnvelope) -> SemanticBlock {
        let tool = envelope
            .metadata
            .get("tool_used")
            .and_then(|v| v.as_str())
            .unwrap_or("tool");
        let summary = envelope.content.as_str().unwrap_or_default();
        SemanticBlock::plain(format!("{tool} returned: {summary}"), "tool_output")
    }

    fn parse_quote_reply(&self, envelope: &InputEnvelope) -> Result<SemanticBlock> {
        let Some(reply_to) = envelope.metadata.get("reply_to").and_then(|v| v.as_str()) else {
            return Err(ConversaError::InvalidReference(
                "quote_reply requires metadata.reply_to".to_string(),
            ));
        };
        let quoted = self
            .store
            .get_message(&MessageId::from(reply_to))
            .map_err(|_| {
                ConversaError::InvalidReference(format!("reply_to references unknown message {reply_to}"))
            })?;
        let text = envelope.content.as_str().unwrap_or_default();
        Ok(SemanticBlock::plain(
            format!("> {}\n{}", quoted.content, text),
            "quote_reply",
        ))
    }

    fn parse_prompt(&self, envelope: &InputEnvelope) -> SemanticBlock {
        let text = envelope.content.as_str().unwrap_or_default();
        let mut block = SemanticBlock::plain(text, "prompt");
        block.non_user_visible = true;
        block
    }

    fn fallback_to_caption(&self, envelope: &InputEnvelope) -> Result<SemanticBlock> {
        if let Some(caption) = envelope.metadata.get("caption").and_then(|v| v.as_str()) {
            return Ok(SemanticBlock::plain(caption, &envelope.content_type));
        }
        Err(ConversaError::UnsupportedModality(envelope.content_type.clone()))
    }
}

fn detect_tags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if text.trim_end().ends_with('?') {
        tags.push("question".to_string());
    }
    if text.split_whitespace().count() <= 3 {
        tags.push("short".to_string());
    }
    tags
}

fn detect_emotion(text: &str) -> Option<String> {
    let exclamations = text.matches('!').count();
    if exclamations >= 2 {
        Some("excited".to_string())
    } else if text.contains(':(') || text.to_lowercase().contains("sorry") {
        Some("apologetic".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::{DialogueId, ParticipantRole};
    use serde_json::json;

    fn envelope(content_type: &str, content: serde_json::Value, metadata: serde_json::Value) -> InputEnvelope {
        InputEnvelope {
            dialogue_id: DialogueId::new().to_string(),
            session_id: None,
            turn_id: None,
            sender_role: ParticipantRole::Human,
            sender_id: "h1".to_string(),
            content_type: content_type.to_string(),
            content,
            metadata,
        }
    }

    #[test]
    fn text_parser_detects_question_tag() {
        let store = Store::open_in_memory().unwrap();
        let parser = InputParser::new(&store);
        let block = parser
            .parse(&envelope("text", json!("Do I need an umbrella?"), json!({})))
            .unwrap();
        assert!(block.tags.contains(&"question".to_string()));
    }

    #[test]
    fn image_parser_projects_caption() {
        let store = Store::open_in_memory().unwrap();
        let parser = InputParser::new(&store);
        let block = parser
            .parse(&envelope("image", json!(null), json!({"caption": "a cat"})))
            .unwrap();
        assert_eq!(block.text, "a cat");
    }

    #[test]
    fn unknown_content_type_without_caption_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let parser = InputParser::new(&store);
        let err = parser
            .parse(&envelope("carrier_pigeon", json!(null), json!({})))
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_MODALITY");
    }

    #[test]
    fn quote_reply_without_reply_to_is_invalid_reference() {
        let store = Store::open_in_memory().unwrap();
        let parser = InputParser::new(&store);
        let err = parser
            .parse(&envelope("quote_reply", json!("thanks!"), json!({})))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REFERENCE");
    }
}

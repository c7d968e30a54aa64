use serde::Serialize;

/// Canonical text-projected form of a Message, used downstream by context
/// assembly. Every modality's parser reduces to this shape.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticBlock {
    pub text: String,
    pub tags: Vec<String>,
    pub emotion: Option<String>,
    pub origin_content_type: String,
    pub non_user_visible: bool,
}

impl SemanticBlock {
    pub fn plain(text: impl Into<String>, origin_content_type: &str) -> Self {
        Self {
            text: text.into(),
            tags: Vec::new(),
            emotion: None,
            origin_content_type: origin_content_type.to_string(),
            non_user_visible: false,
        }
    }
}

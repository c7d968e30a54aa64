/// Composes the final assistant Message content from raw model output plus
/// whatever the tool loop collected along the way.
///
/// Kept deliberately simple: citation injection and length enforcement are
/// the only responsibilities today. Style/emotion decoration and a
/// translation pass are no-op extension points, modeled here as plugin
/// hooks so a real implementation slots in without reshaping the pipeline.
pub struct ResponseMixer {
    max_length: usize,
}

/// A single tool result the mixer may cite in the final response.
pub struct ToolCitation {
    pub tool_id: String,
    pub summary: String,
}

impl ResponseMixer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn compose(&self, model_text: &str, citations: &[ToolCitation], emotion: Option<&str>) -> String {
        let mut out = model_text.trim().to_string();

        for citation in citations {
            if !out.contains(&citation.summary) {
                out.push_str(&format!("\n\n[source: {}] {}", citation.tool_id, citation.summary));
            }
        }

        if let Some(emotion) = emotion {
            out = self.decorate(out, emotion);
        }

        self.truncate(out)
    }

    /// No-op by default — a real deployment would hang a style/translation
    /// plugin off this seam.
    fn decorate(&self, text: String, _emotion: &str) -> String {
        text
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() <= self.max_length {
            return text;
        }
        let truncated: String = text.chars().take(self.max_length.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

impl Default for ResponseMixer {
    fn default() -> Self {
        Self::new(4000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_a_tool_citation_not_already_present_in_the_text() {
        let mixer = ResponseMixer::new(1000);
        let citations = vec![ToolCitation {
            tool_id: "weather".to_string(),
            summary: "rain expected in Singapore".to_string(),
        }];
        let composed = mixer.compose("Here's the forecast.", &citations, None);
        assert!(composed.contains("[source: weather]"));
        assert!(composed.contains("rain expected in Singapore"));
    }

    #[test]
    fn skips_a_citation_already_quoted_in_the_model_text() {
        let mixer = ResponseMixer::new(1000);
        let citations = vec![ToolCitation {
            tool_id: "weather".to_string(),
            summary: "rain expected".to_string(),
        }];
        let composed = mixer.compose("Based on the forecast: rain expected", &citations, None);
        assert_eq!(composed.matches("rain expected").count(), 1);
    }

    #[test]
    fn enforces_the_maximum_length() {
        let mixer = ResponseMixer::new(10);
        let composed = mixer.compose(&"x".repeat(50), &[], None);
        assert_eq!(composed.chars().count(), 10);
        assert!(composed.ends_with('…'));
    }
}

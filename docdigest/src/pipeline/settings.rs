//! Message templates used by the pipeline.

use crate::config::AppConfig;

/// Templates for the prompt and the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Instruction template; `{text}` is replaced by the document text.
    pub prompt_template: String,
    /// Notification subject.
    pub subject: String,
    /// Notification sender display name.
    pub sender_name: String,
    /// Notification body template; `{summary}` is replaced by the summary.
    pub body_template: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineSettings {
    /// Copies the templates out of the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            prompt_template: config.pipeline.prompt_template.clone(),
            subject: config.notify.subject.clone(),
            sender_name: config.notify.sender_name.clone(),
            body_template: config.notify.body_template.clone(),
        }
    }

    /// Renders the summarization prompt.
    #[must_use]
    pub fn render_prompt(&self, text: &str) -> String {
        self.prompt_template.replace("{text}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_embeds_text() {
        let prompt = PipelineSettings::default().render_prompt("Hello world");
        assert_eq!(
            prompt,
            "以下のテキストを日本語で簡潔に要約してください:\n\nHello world"
        );
    }

    #[test]
    fn test_defaults_match_config() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.subject, "Document summary completed");
        assert_eq!(settings.sender_name, "Document Summary System");
        assert!(settings.body_template.contains("{summary}"));
    }
}

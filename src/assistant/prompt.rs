//! Prompt assembly
//!
//! Each modality only sees its own prior turns: text prompts are built from
//! typed messages, voice prompts from spoken ones.

use std::fmt::Write;

use super::Modality;
use crate::chat::{Message, Role};

/// Builds plain-text prompts for the generative model
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    name: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Kyra")
    }
}

impl PromptBuilder {
    /// Create a builder for an assistant with the given display name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Assistant display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the prompt for a turn of the given modality
    ///
    /// `history` may contain both modalities; only matching messages are used.
    #[must_use]
    pub fn build(&self, modality: Modality, history: &[Message], input: &str) -> String {
        match modality {
            Modality::Text => self.text(history, input),
            Modality::Voice => self.voice(history, input),
        }
    }

    /// Prompt for a typed turn
    #[must_use]
    pub fn text(&self, history: &[Message], input: &str) -> String {
        let context = context_lines(history, Modality::Text);
        format!(
            "You are {name}, a helpful AI assistant. Previous text conversation context: {context}\n\nUser: {input}\n\n{name}:",
            name = self.name
        )
    }

    /// Prompt for a spoken turn
    #[must_use]
    pub fn voice(&self, history: &[Message], input: &str) -> String {
        let mut prompt = format!(
            "You are {}, a futuristic AI assistant inspired by Jarvis. ",
            self.name
        );
        let context = context_lines(history, Modality::Voice);
        if !context.is_empty() {
            let _ = write!(prompt, "Previous voice conversation context:\n{context}\n\n");
        }
        let _ = write!(prompt, "Respond concisely and helpfully to: \"{input}\"");
        prompt
    }
}

fn context_lines(history: &[Message], modality: Modality) -> String {
    history
        .iter()
        .filter(|m| Modality::of(m.is_voice) == modality)
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            format!("{role}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Message> {
        vec![
            Message::assistant("Hello!", false),
            Message::user("typed question", false),
            Message::assistant("typed answer", false),
            Message::user("spoken question", true),
            Message::assistant("spoken answer", true),
        ]
    }

    #[test]
    fn text_prompt_excludes_voice_turns() {
        let prompt = PromptBuilder::default().text(&history(), "What's 2+2");
        assert!(prompt.starts_with("You are Kyra, a helpful AI assistant."));
        assert!(prompt.contains("model: Hello!\nuser: typed question\nmodel: typed answer"));
        assert!(!prompt.contains("spoken"));
        assert!(prompt.ends_with("User: What's 2+2\n\nKyra:"));
    }

    #[test]
    fn voice_prompt_excludes_text_turns() {
        let prompt = PromptBuilder::default().voice(&history(), "hello");
        assert!(prompt.contains("user: spoken question\nmodel: spoken answer"));
        assert!(!prompt.contains("typed"));
        assert!(prompt.ends_with("Respond concisely and helpfully to: \"hello\""));
    }

    #[test]
    fn voice_prompt_without_history_has_no_context() {
        let prompt = PromptBuilder::new("Nova").build(Modality::Voice, &[], "hi");
        assert_eq!(
            prompt,
            "You are Nova, a futuristic AI assistant inspired by Jarvis. Respond concisely and helpfully to: \"hi\""
        );
    }
}

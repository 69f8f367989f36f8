pub mod azure;
pub mod gemini;
pub mod local;

use crate::errors::PromptError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a chat-completion service.
///
/// Implementations are opaque text-in/text-out collaborators: they receive a system
/// and a user prompt and return the model's reply. Timeouts, retries and the failure
/// sentinel are layered on top by [`crate::completion::CompletionClient`].
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);

// --- OpenAI chat-completions wire format, shared by the Azure and local providers ---

pub(crate) mod chat {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Debug)]
    pub(crate) struct ChatRequest<'a> {
        pub(crate) messages: Vec<ChatMessage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub(crate) model: Option<&'a str>,
        pub(crate) temperature: f32,
        pub(crate) max_tokens: u32,
        pub(crate) stream: bool,
    }

    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub(crate) struct ChatMessage {
        pub(crate) role: String,
        #[serde(default)]
        pub(crate) content: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct ChatResponse {
        #[serde(default)]
        pub(crate) choices: Vec<ChatChoice>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct ChatChoice {
        pub(crate) message: ChatMessage,
    }

    pub(crate) fn messages(system_prompt: &str, user_prompt: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: Some(system_prompt.to_string()),
            },
            ChatMessage {
                role: "user".to_string(),
                content: Some(user_prompt.to_string()),
            },
        ]
    }

    /// The first choice's content; an absent or blank reply is empty.
    pub(crate) fn first_content(response: ChatResponse) -> String {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

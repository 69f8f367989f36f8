use super::chat::{first_content, messages, ChatRequest, ChatResponse};
use crate::{errors::PromptError, providers::ai::AiProvider, types::GenerationSettings};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::fmt::{self, Debug};

/// The `api-version` used when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// A provider for an Azure OpenAI chat deployment.
#[derive(Clone)]
pub struct AzureOpenAiProvider {
    client: ReqwestClient,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    settings: GenerationSettings,
}

impl Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AzureOpenAiProvider {
    /// Creates a new `AzureOpenAiProvider`.
    ///
    /// `endpoint` is the resource URL, e.g. `https://my-resource.openai.azure.com`.
    pub fn new(
        endpoint: String,
        api_key: String,
        deployment: String,
        api_version: Option<String>,
        settings: GenerationSettings,
    ) -> Result<Self, PromptError> {
        if api_key.is_empty() {
            return Err(PromptError::MissingApiKey);
        }
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            api_version: api_version.unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            settings,
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

#[async_trait]
impl AiProvider for AzureOpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let request_body = ChatRequest {
            messages: messages(system_prompt, user_prompt),
            model: None,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(self.chat_url())
            .query(&[("api-version", &self.api_version)])
            .header("api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        Ok(first_content(chat_response))
    }
}

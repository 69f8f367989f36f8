//! # AI Provider Factory
//!
//! Centralizes the creation of AI provider instances from a [`ProviderConfig`], so
//! every consumer (the CLI, tests) builds providers the same way.

use crate::{
    errors::PromptError,
    providers::ai::{
        azure::AzureOpenAiProvider, gemini::GeminiProvider, local::LocalAiProvider, AiProvider,
    },
    types::{GenerationSettings, ProviderConfig},
};
use tracing::info;

/// Creates an AI provider from its configuration and the task's sampling settings.
///
/// Empty strings (typically produced by an unset `${VAR}` substitution) are treated
/// as missing values.
pub fn create_provider(
    config: &ProviderConfig,
    settings: GenerationSettings,
) -> Result<Box<dyn AiProvider>, PromptError> {
    let api_url = non_empty(&config.api_url);
    let api_key = non_empty(&config.api_key);
    let model_name = non_empty(&config.model_name);

    let provider: Box<dyn AiProvider> = match config.provider.as_str() {
        "azure" => {
            let endpoint = api_url.ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "api_url (GPT_TEXT_ENDPOINT) is required for the azure provider".to_string(),
                )
            })?;
            let deployment = model_name.ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "model_name (deployment) is required for the azure provider".to_string(),
                )
            })?;
            let api_key = api_key.ok_or(PromptError::MissingApiKey)?;
            info!(
                "Configuring Azure OpenAI provider for deployment '{}' at {}",
                deployment, endpoint
            );
            Box::new(AzureOpenAiProvider::new(
                endpoint,
                api_key,
                deployment,
                non_empty(&config.api_version),
                settings,
            )?)
        }
        "gemini" => {
            let model = model_name.unwrap_or_else(|| "gemini-1.5-flash".to_string());
            let api_url = api_url.unwrap_or_else(|| {
                format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
                )
            });
            let api_key = api_key.ok_or(PromptError::MissingApiKey)?;
            info!("Configuring Gemini provider with URL: {}", api_url);
            Box::new(GeminiProvider::new(api_url, api_key, settings)?)
        }
        "local" => {
            let api_url = api_url.ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "api_url is required for the local provider".to_string(),
                )
            })?;
            info!("Configuring Local AI provider with URL: {}", api_url);
            Box::new(LocalAiProvider::new(api_url, api_key, model_name, settings)?)
        }
        other => {
            return Err(PromptError::MissingAiProvider(format!(
                "unsupported provider type '{other}'"
            )))
        }
    };

    Ok(provider)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, url: Option<&str>, key: Option<&str>, model: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            provider: provider.to_string(),
            api_url: url.map(String::from),
            api_key: key.map(String::from),
            model_name: model.map(String::from),
            api_version: None,
        }
    }

    #[test]
    fn test_azure_requires_endpoint_and_key() {
        let settings = GenerationSettings::default();
        let missing_url = config("azure", Some(""), Some("key"), Some("gpt4"));
        assert!(matches!(
            create_provider(&missing_url, settings),
            Err(PromptError::MissingAiProvider(_))
        ));

        let missing_key = config("azure", Some("https://x.openai.azure.com"), None, Some("gpt4"));
        assert!(matches!(
            create_provider(&missing_key, settings),
            Err(PromptError::MissingApiKey)
        ));

        let complete = config("azure", Some("https://x.openai.azure.com"), Some("key"), Some("gpt4"));
        assert!(create_provider(&complete, settings).is_ok());
    }

    #[test]
    fn test_local_key_is_optional() {
        let local = config("local", Some("http://localhost:1234/v1/chat/completions"), None, None);
        assert!(create_provider(&local, GenerationSettings::default()).is_ok());
    }

    #[test]
    fn test_unknown_provider_type() {
        let unknown = config("carrier-pigeon", None, None, None);
        assert!(matches!(
            create_provider(&unknown, GenerationSettings::default()),
            Err(PromptError::MissingAiProvider(_))
        ));
    }
}

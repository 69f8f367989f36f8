//! # Application Configuration
//!
//! Configuration for the `autoscribe` CLI, loaded in layers:
//! 1. Programmatic defaults: the library's prompts for every task and an
//!    `azure_default` provider built from the `GPT_TEXT_*` / `AZURE_OPENAI_*` variables.
//! 2. An optional YAML file (`--config`, else `config.yml` in the working directory),
//!    with `${VAR}` placeholders substituted from the environment.
//! 3. `AUTOSCRIBE_...` environment overrides (e.g. `AUTOSCRIBE_CACHE_DIR`,
//!    `AUTOSCRIBE_TASKS__ANSWER_PREDICTION__TEMPERATURE`).

use autoscribe::pipeline::PipelinePrompts;
use autoscribe::prompts::{forms::*, TaskPrompts};
use autoscribe::types::{GenerationSettings, ProviderConfig};
use autoscribe::CompletionOptions;
use config::{
    Config as ConfigBuilder, Environment, File, FileFormat, Value as ConfigValue,
    ValueKind as ConfigValueKind,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_PROVIDER: &str = "azure_default";
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

pub const TASK_QUESTION_EXTRACTION: &str = "question_extraction";
pub const TASK_ANSWER_PREDICTION: &str = "answer_prediction";
pub const TASK_UNANSWERED_QUESTIONS: &str = "unanswered_questions";
pub const TASK_CONVERSATION_ANSWERING: &str = "conversation_answering";

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("env placeholder regex is valid")
});

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
    /// A task or the provider it names is not configured.
    Missing(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Missing(key) => write!(f, "Missing configuration: {key}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// A map of named, reusable AI provider configurations.
    pub providers: HashMap<String, ProviderConfig>,
    /// A map of pipeline tasks, each specifying a provider, prompts and sampling.
    pub tasks: HashMap<String, TaskConfig>,
    #[serde(default)]
    pub completion: CompletionSettings,
    /// Directory for cached completion responses. Caching is off when unset.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

/// Defines the prompts, provider and sampling for one pipeline task.
#[derive(Debug, Deserialize, Clone)]
pub struct TaskConfig {
    /// The key of the provider to use from the `providers` map.
    pub provider: String,
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    GenerationSettings::default().max_tokens
}

impl TaskConfig {
    pub fn prompts(&self) -> TaskPrompts {
        TaskPrompts::new(&self.system_prompt, &self.user_prompt)
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Timeout and retry policy shared by every completion client.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CompletionSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    CompletionOptions::default().timeout.as_secs()
}

fn default_max_retries() -> u32 {
    CompletionOptions::default().max_retries
}

fn default_retry_delay_ms() -> u64 {
    CompletionOptions::default().retry_delay.as_millis() as u64
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CompletionSettings {
    pub fn options(&self) -> CompletionOptions {
        CompletionOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl AppConfig {
    /// Looks up a task together with the provider it names.
    pub fn task(&self, name: &str) -> Result<(&TaskConfig, &ProviderConfig), ConfigError> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| ConfigError::Missing(format!("tasks.{name}")))?;
        let provider = self
            .providers
            .get(&task.provider)
            .ok_or_else(|| ConfigError::Missing(format!("providers.{}", task.provider)))?;
        Ok((task, provider))
    }

    /// The prompts of every pipeline task.
    pub fn pipeline_prompts(&self) -> Result<PipelinePrompts, ConfigError> {
        Ok(PipelinePrompts {
            question_extraction: self.task(TASK_QUESTION_EXTRACTION)?.0.prompts(),
            answer_prediction: self.task(TASK_ANSWER_PREDICTION)?.0.prompts(),
            unanswered_questions: self.task(TASK_UNANSWERED_QUESTIONS)?.0.prompts(),
            conversation_answering: self.task(TASK_CONVERSATION_ANSWERING)?.0.prompts(),
        })
    }
}

/// Constructs a `config::Value` map of the default tasks from the library prompts.
/// This serves as the base layer of configuration.
fn build_default_tasks() -> HashMap<String, ConfigValue> {
    let tasks = vec![
        (
            TASK_QUESTION_EXTRACTION,
            (
                QUESTION_EXTRACTION_SYSTEM_PROMPT,
                QUESTION_EXTRACTION_USER_PROMPT,
                0.3,
            ),
        ),
        (
            TASK_ANSWER_PREDICTION,
            (
                ANSWER_PREDICTION_SYSTEM_PROMPT,
                ANSWER_PREDICTION_USER_PROMPT,
                0.4,
            ),
        ),
        (
            TASK_UNANSWERED_QUESTIONS,
            (
                UNANSWERED_QUESTIONS_SYSTEM_PROMPT,
                UNANSWERED_QUESTIONS_USER_PROMPT,
                0.0,
            ),
        ),
        (
            TASK_CONVERSATION_ANSWERING,
            (
                CONVERSATION_ANSWERING_SYSTEM_PROMPT,
                CONVERSATION_ANSWERING_USER_PROMPT,
                0.5,
            ),
        ),
    ];

    tasks
        .into_iter()
        .map(|(name, (sys, user, temperature))| {
            let mut table = HashMap::new();
            table.insert("provider".to_string(), ConfigValue::from(DEFAULT_PROVIDER));
            table.insert("system_prompt".to_string(), ConfigValue::from(sys));
            table.insert("user_prompt".to_string(), ConfigValue::from(user));
            table.insert("temperature".to_string(), ConfigValue::from(temperature));
            (
                name.to_string(),
                ConfigValue::new(None, ConfigValueKind::Table(table)),
            )
        })
        .collect()
}

/// The `azure_default` provider, filled from whichever Azure variables are set.
fn build_default_providers() -> HashMap<String, ConfigValue> {
    let mut azure = HashMap::new();
    azure.insert("provider".to_string(), ConfigValue::from("azure"));
    for (key, var) in [
        ("api_url", "GPT_TEXT_ENDPOINT"),
        ("api_key", "GPT_TEXT_API_KEY"),
        ("model_name", "AZURE_OPENAI_GPT4_DEPLOYMENT"),
        ("api_version", "AZURE_OPENAI_API_VERSION"),
    ] {
        if let Ok(value) = env::var(var) {
            azure.insert(key.to_string(), ConfigValue::from(value));
        }
    }

    HashMap::from([(
        DEFAULT_PROVIDER.to_string(),
        ConfigValue::new(None, ConfigValueKind::Table(azure)),
    )])
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded_content = ENV_PLACEHOLDER.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from defaults, a YAML file and the environment.
///
/// An explicit `config_path_override` must exist; the implicit `config.yml` is optional.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults from the library and the environment.
        .set_default("tasks", build_default_tasks())?
        .set_default("providers", build_default_providers())?;

    // Layer 2: Optional YAML file.
    match config_path_override {
        Some(path) => {
            let content = read_and_substitute(path)?.ok_or_else(|| {
                ConfigError::NotFound(format!("Config file not found at '{path}'."))
            })?;
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None => {
            if let Some(content) = read_and_substitute(DEFAULT_CONFIG_FILE)? {
                info!("Loading configuration from '{DEFAULT_CONFIG_FILE}'.");
                builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
            }
        }
    }

    let settings = builder
        // Layer 3: Prefixed environment variables for overrides.
        .add_source(
            Environment::with_prefix("AUTOSCRIBE")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

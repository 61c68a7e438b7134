use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::ai::{
    ollama::DEFAULT_OLLAMA_URL, ClaudeClient, EndpointClient, LlmBackend, OllamaClient,
    OpenAIClient, ProviderTurnTaker,
};
use crate::config::Config;
use crate::turn::TurnTaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Endpoint,
    Ollama,
    Claude,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Endpoint => "endpoint",
            Provider::Ollama => "ollama",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "endpoint" => Some(Provider::Endpoint),
            "ollama" => Some(Provider::Ollama),
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Endpoint, Provider::Ollama, Provider::Claude, Provider::OpenAI]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Endpoint => "Evaluation endpoint",
            Provider::Ollama => "Ollama (Local)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Endpoint => "",
            Provider::Ollama => "llama3.2:latest",
            Provider::Claude => "claude-3-5-haiku-20241022",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }

    /// The provider named in `config`, defaulting to Ollama
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.provider.as_deref() {
            None => Ok(Provider::Ollama),
            Some(name) => Provider::from_str(name)
                .ok_or_else(|| anyhow!("Unknown provider '{}'", name)),
        }
    }
}

/// API key for `provider`: environment first, then config
pub fn api_key(provider: Provider, config: &Config) -> Option<String> {
    let (var, stored) = match provider {
        Provider::Claude => ("ANTHROPIC_API_KEY", &config.claude_api_key),
        Provider::OpenAI => ("OPENAI_API_KEY", &config.openai_api_key),
        _ => return None,
    };
    std::env::var(var).ok().or_else(|| stored.clone())
}

/// Model to use with `provider`. The configured `default_model` belongs to
/// the configured provider and is ignored for any other.
pub fn resolve_model(provider: Provider, model: Option<&str>, config: &Config) -> String {
    if let Some(model) = model {
        return model.to_string();
    }
    let configured = Provider::from_config(config).ok() == Some(provider);
    match &config.default_model {
        Some(default) if configured => default.clone(),
        _ => provider.default_model().to_string(),
    }
}

/// Build the chat collaborator for `provider` from `config`.
pub fn build_turn_taker(
    provider: Provider,
    model: Option<&str>,
    config: &Config,
) -> Result<Arc<dyn TurnTaker>> {
    let model = resolve_model(provider, model, config);

    let taker: Arc<dyn TurnTaker> = match provider {
        Provider::Endpoint => {
            let url = config.chat_endpoint.as_deref().ok_or_else(|| {
                anyhow!("No chat endpoint configured. Set chat_endpoint in the config file.")
            })?;
            Arc::new(EndpointClient::new(url))
        }
        Provider::Ollama => {
            let url = config.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Arc::new(ProviderTurnTaker::new(
                LlmBackend::Ollama(OllamaClient::new(url)),
                &model,
            ))
        }
        Provider::Claude => {
            let key = api_key(provider, config)
                .ok_or_else(|| anyhow!("Claude API key not configured (ANTHROPIC_API_KEY)"))?;
            Arc::new(ProviderTurnTaker::new(
                LlmBackend::Claude(ClaudeClient::new(&key)),
                &model,
            ))
        }
        Provider::OpenAI => {
            let key = api_key(provider, config)
                .ok_or_else(|| anyhow!("OpenAI API key not configured (OPENAI_API_KEY)"))?;
            Arc::new(ProviderTurnTaker::new(
                LlmBackend::OpenAI(OpenAIClient::new(&key)),
                &model,
            ))
        }
    };
    Ok(taker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("OpenAI"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("gemini"), None);
    }

    #[test]
    fn endpoint_requires_url() {
        let config = Config::new();
        assert!(build_turn_taker(Provider::Endpoint, None, &config).is_err());

        let mut config = Config::new();
        config.chat_endpoint = Some("http://localhost:9000".to_string());
        assert!(build_turn_taker(Provider::Endpoint, None, &config).is_ok());
    }

    #[test]
    fn configured_model_stays_with_its_provider() {
        let mut config = Config::new();
        config.provider = Some("claude".to_string());
        config.default_model = Some("claude-3-opus-20240229".to_string());

        assert_eq!(
            resolve_model(Provider::Claude, None, &config),
            "claude-3-opus-20240229"
        );
        assert_eq!(resolve_model(Provider::Ollama, None, &config), "llama3.2:latest");
        assert_eq!(resolve_model(Provider::Ollama, Some("qwen2.5"), &config), "qwen2.5");
    }

    #[test]
    fn unknown_provider_in_config_is_an_error() {
        let mut config = Config::new();
        config.provider = Some("bard".to_string());
        assert!(Provider::from_config(&config).is_err());
        config.provider = None;
        assert_eq!(Provider::from_config(&config).unwrap(), Provider::Ollama);
    }
}

pub mod prompt;

use std::error::Error;
use std::time::Duration;

use crate::cli::Args;
use crate::llm::{ LlmConfig, LlmType };
use self::prompt::{ resolve_system_prompt, DEFAULT_SYSTEM_PROMPT };

/// Everything the relay needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub llm: LlmConfig,
    pub system_prompt: String,
    pub first_chunk_timeout: Duration,
    /// `None` forwards conversations of any length.
    pub max_messages: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            first_chunk_timeout: Duration::from_secs(30),
            max_messages: None,
        }
    }
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_type: LlmType = args.chat_llm_type.parse()?;

        let api_key = args.chat_api_key.trim();
        if api_key.is_empty() {
            return Err("CHAT_API_KEY (or --chat-api-key) must be set".into());
        }
        if args.first_chunk_timeout_secs == 0 {
            return Err("--first-chunk-timeout-secs must be greater than zero".into());
        }

        let llm = LlmConfig {
            llm_type,
            api_key: Some(api_key.to_string()),
            completion_model: args.chat_model.clone().filter(|m| !m.trim().is_empty()),
            base_url: args.chat_base_url.clone().filter(|u| !u.trim().is_empty()),
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        };

        Ok(Self {
            llm,
            system_prompt: resolve_system_prompt(args.system_prompt_path.as_deref())?,
            first_chunk_timeout: Duration::from_secs(args.first_chunk_timeout_secs),
            max_messages: Some(args.max_messages).filter(|n| *n > 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["healthconnect-relay"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn builds_config_from_args() {
        let config = RelayConfig::from_args(
            &args(&["--chat-api-key", "sk-test", "--chat-model", "gpt-4o", "--max-messages", "12"])
        ).unwrap();

        assert_eq!(config.llm.llm_type, LlmType::OpenAI);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.completion_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.max_messages, Some(12));
    }

    #[test]
    fn zero_max_messages_means_unlimited() {
        let config = RelayConfig::from_args(&args(&["--chat-api-key", "sk-test"])).unwrap();
        assert_eq!(config.max_messages, None);
    }

    #[test]
    fn missing_api_key_fails_at_startup() {
        let err = RelayConfig::from_args(&args(&["--chat-api-key", "  "])).unwrap_err();
        assert!(err.to_string().contains("CHAT_API_KEY"));
    }

    #[test]
    fn unknown_provider_fails_at_startup() {
        let err = RelayConfig::from_args(
            &args(&["--chat-api-key", "sk-test", "--chat-llm-type", "bard"])
        ).unwrap_err();
        assert!(err.to_string().contains("bard"));
    }
}

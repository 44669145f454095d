use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, groq, xai, deepseek)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the provider's OpenAI-compatible API (e.g., https://api.openai.com/v1)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, the provider type picks one
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Required.
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, llama-3.1-8b-instant)
    #[arg(long, env = "CHAT_MODEL")] // No default, the provider type picks one
    pub chat_model: Option<String>,

    // --- Relay Args ---
    /// Optional JSON file ({"system_prompt": "..."}) replacing the built-in assistant persona.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    /// Seconds to wait for the provider's first chunk before giving up.
    #[arg(long, env = "FIRST_CHUNK_TIMEOUT_SECS", default_value = "30")]
    pub first_chunk_timeout_secs: u64,

    /// Seconds allowed for establishing the provider connection.
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Maximum number of caller messages forwarded per request. 0 means no limit.
    #[arg(long, env = "MAX_MESSAGES", default_value = "0")]
    pub max_messages: usize,

    // --- General App Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

//! Configuration types for the conversational agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Conversation identity, idle timing and dialogue windows.
    pub conversation: ConversationConfig,
    /// Chat-completion endpoint settings.
    pub llm: LlmConfig,
    /// Memory retrieval settings.
    pub memory: MemoryConfig,
    /// Reply filtering applied before speech synthesis.
    pub speech: SpeechConfig,
    /// Status/UI sink settings.
    pub status: StatusConfig,
}

/// Conversation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Speaker id attached to user transcripts.
    pub user_id: String,
    /// Speaker id attached to assistant replies.
    pub assistant_name: String,
    /// System message seeded as the first history entry.
    pub system_prompt: String,
    /// Seconds of silence (no input, nothing queued to play) before the
    /// agent prompts itself.
    ///
    /// Set to 0 to disable self-prompting.
    pub idle_timeout_secs: u64,
    /// Bare attention-getting phrases, matched case- and punctuation-insensitively.
    pub attention_phrases: Vec<String>,
    /// Number of recent messages summarized when enriching a reply with memory.
    pub context_window: usize,
    /// Number of recent messages captured as a candidate memory.
    pub candidate_window: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            user_id: "Lumi".to_owned(),
            assistant_name: "Bunny".to_owned(),
            system_prompt: "Your name is Bunny. Your nicknames are Bun and Bun Bun. \
                            You are a snarky, friendly AI VTuber and Lumi is your creator \
                            and best friend. Keep your messages short and concise. \
                            Don't sign off at the end of your messages."
                .to_owned(),
            idle_timeout_secs: 12,
            attention_phrases: vec![
                "bunny".to_owned(),
                "hey bunny".to_owned(),
                "bun".to_owned(),
                "bun bun".to_owned(),
                "hey bun".to_owned(),
            ],
            context_window: 6,
            candidate_window: 3,
        }
    }
}

/// OpenAI-compatible chat-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the server (with or without a trailing `/v1`).
    pub api_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token (empty = no `Authorization` header).
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
    /// Number of most recent history messages sent per completion.
    pub history_window: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:1234/v1".to_owned(),
            model: "local-model".to_owned(),
            api_key: "lm-studio".to_owned(),
            temperature: 0.35,
            max_tokens: None,
            history_window: 20,
            request_timeout_secs: 60,
        }
    }
}

/// A memory inserted at startup when the store is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMemory {
    pub text: String,
    pub category: String,
}

/// Memory retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Minimum similarity score for a memory to be considered relevant.
    pub similarity_threshold: f32,
    /// Maximum hits requested from each backend query.
    pub search_limit: usize,
    /// Minimum classifier confidence for a category; below it the text
    /// counts as "general chat".
    pub category_confidence: f32,
    /// Memories seeded into an empty store.
    pub seed: Vec<SeedMemory>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            search_limit: 10,
            category_confidence: 0.7,
            seed: vec![
                SeedMemory {
                    text: "Lumi has been learning how to use Python since the summer, \
                           she's really passionate about it."
                        .to_owned(),
                    category: "goals".to_owned(),
                },
                SeedMemory {
                    text: "Lumi's favourite colour is blue.".to_owned(),
                    category: "likes".to_owned(),
                },
                SeedMemory {
                    text: "Lumi really dislikes green peas.".to_owned(),
                    category: "dislikes".to_owned(),
                },
            ],
        }
    }
}

/// Reply filtering applied before text reaches the synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Ordered `(from, to)` replacements fixing pronunciation or removing
    /// model artifacts.
    pub replacements: Vec<(String, String)>,
    /// Remove emoji (and other astral-plane symbols) from replies.
    pub strip_emoji: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let pairs = [
            ("Live2D", "live 2D"),
            ("<3", "heart!"),
            ("<|im_end|>", ""),
            ("|im_end|>", ""),
            ("###", ""),
            ("bunni", "bunny"),
            ("Bunni", "Bunny"),
        ];
        Self {
            replacements: pairs
                .iter()
                .map(|(from, to)| ((*from).to_owned(), (*to).to_owned()))
                .collect(),
            strip_emoji: true,
        }
    }
}

/// Status/UI sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Base URL of the UI server. `None` logs status posts instead.
    pub url: Option<String>,
    /// Capacity of the outbound status queue.
    pub buffer: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            url: None,
            buffer: 64,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AgentError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/bunnybot/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/bunnybot-config"))
            .join("bunnybot")
            .join("config.toml")
    }
}

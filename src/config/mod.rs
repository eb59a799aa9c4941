use serde::{Deserialize, Serialize};

/// Global configuration for filesage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Inference service configuration
    pub ollama: OllamaConfig,

    /// Search pipeline configuration
    pub search: SearchConfig,

    /// HTTP server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Generate endpoint URL (e.g., "http://localhost:11434/api/generate")
    pub url: String,

    /// Model name (e.g., "llama2", "mistral")
    pub model: String,

    /// Consume the model response as a chunked stream instead of one
    /// blocking call. Matching behavior is identical either way.
    pub stream: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default accepted file extensions (lowercase, no leading dot)
    pub extensions: Vec<String>,

    /// Maximum number of content characters included in a prompt
    pub excerpt_chars: usize,

    /// Substring whose presence in a judgement marks the file as a match.
    /// Compared case-insensitively.
    pub affirmative_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (e.g., "0.0.0.0")
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from defaults plus environment overrides
    /// (FILESAGE_OLLAMA_URL, FILESAGE_MODEL, FILESAGE_HOST, FILESAGE_PORT).
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FILESAGE_OLLAMA_URL") {
            config.ollama.url = url;
        }
        if let Ok(model) = std::env::var("FILESAGE_MODEL") {
            config.ollama.model = model;
        }
        if let Ok(host) = std::env::var("FILESAGE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("FILESAGE_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig {
                url: "http://localhost:11434/api/generate".to_string(),
                model: "llama2".to_string(),
                stream: false,
                timeout_secs: 120,
            },
            search: SearchConfig {
                extensions: vec!["txt".to_string(), "pdf".to_string()],
                excerpt_chars: 2000,
                affirmative_token: "yes".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_ollama() {
        let config = Config::default();
        assert_eq!(config.ollama.url, "http://localhost:11434/api/generate");
        assert_eq!(config.search.excerpt_chars, 2000);
        assert_eq!(config.search.extensions, vec!["txt", "pdf"]);
    }

    #[test]
    fn default_token_is_lowercase() {
        // Classification lowercases both sides, so the configured token
        // must already be lowercase to ever match.
        let config = Config::default();
        assert_eq!(
            config.search.affirmative_token,
            config.search.affirmative_token.to_lowercase()
        );
    }
}

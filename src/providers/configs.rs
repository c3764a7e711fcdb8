use anyhow::{anyhow, Result};

fn get_env(key: &str, default: Option<&str>) -> Option<String> {
    std::env::var(key)
        .ok()
        .or_else(|| default.map(str::to_string))
}

pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn from_env() -> Result<Self> {
        let host = get_env("OPENAI_HOST", Some("https://api.openai.com"))
            .ok_or_else(|| anyhow!("OpenAI host must be set"))?;
        let api_key =
            get_env("OPENAI_API_KEY", None).ok_or_else(|| anyhow!("OPENAI_API_KEY must be set"))?;
        let model = get_env("OPENAI_MODEL", Some("gpt-4o"))
            .ok_or_else(|| anyhow!("OpenAI model must be set"))?;

        Ok(Self {
            host,
            api_key,
            model,
            temperature: None,
            max_tokens: None,
        })
    }
}

pub struct GoogleProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl GoogleProviderConfig {
    pub fn from_env() -> Result<Self> {
        let host = get_env(
            "GOOGLE_HOST",
            Some("https://generativelanguage.googleapis.com"),
        )
        .ok_or_else(|| anyhow!("Google host must be set"))?;
        let api_key =
            get_env("GOOGLE_API_KEY", None).ok_or_else(|| anyhow!("GOOGLE_API_KEY must be set"))?;
        let model = get_env("GOOGLE_MODEL", Some("gemini-2.0-flash"))
            .ok_or_else(|| anyhow!("Google model must be set"))?;

        Ok(Self {
            host,
            api_key,
            model,
        })
    }
}

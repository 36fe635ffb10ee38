//! Model-backed rewrite generation
//!
//! Asks an OpenAI-compatible chat-completions endpoint for rewrites of a
//! baseline function. The instruction block is fixed; the interesting part
//! is cleaning the reply (strip code fences, split on `---` separators,
//! drop empties) so downstream deployment sees bare function sources.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CandidateSource;
use crate::config::LlmConfig;
use crate::error::{EvalError, EvalResult};

const SYSTEM_PROMPT: &str = "You are a Python optimization expert. Generate complete, working \
function variations that maintain the exact same interface and behavior as the original. Return \
only the function definition and its docstring, nothing else - no explanations, no examples, no \
extra code.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: String,
}

/// Generates candidate rewrites of a baseline through a hosted model.
#[derive(Debug)]
pub struct RewriteGenerator {
    client: Client,
    config: LlmConfig,
}

impl RewriteGenerator {
    /// Create a generator; fails when no API key is configured.
    pub fn new(config: LlmConfig) -> EvalResult<Self> {
        if config.api_key.is_none() {
            return Err(EvalError::config(
                "rewrite generation requires an API key (REFORGE_LLM_API_KEY or OPENAI_API_KEY)",
            ));
        }
        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    /// Request `count` rewrites of the baseline.
    pub async fn generate(&self, baseline: &str, count: usize) -> EvalResult<Vec<CandidateSource>> {
        let prompt = format!(
            "Generate {count} optimized variations of this Python function.\n\n\
             - ONLY include the function code, NO main block, NO print statements outside the function\n\
             - NO explanations or text outside the function code\n\
             - Have clear return values\n\
             - Be properly indented and use standard Python coding style\n\n\
             Return ONLY the function code with its docstring for each variation.\n\
             Separate each variation with a line of 3 hyphens: ---\n\n\
             Original function:\n{baseline}"
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        tracing::info!(model = %self.config.model, count, "requesting rewrites");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| EvalError::Http(e.to_string()))?;

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| EvalError::provider("model reply contained no choices"))?;

        let variants = split_variants(content);
        if variants.is_empty() {
            return Err(EvalError::provider("model reply contained no usable rewrites"));
        }
        tracing::info!(generated = variants.len(), "rewrites received");
        Ok(variants)
    }
}

/// Split a model reply on `---` separators and clean each piece.
fn split_variants(content: &str) -> Vec<CandidateSource> {
    content
        .split("---")
        .filter_map(clean_candidate)
        .enumerate()
        .map(|(i, code)| CandidateSource {
            name: format!("variant-{}", i + 1),
            code,
        })
        .collect()
}

/// Strip markdown fences and surrounding noise from one candidate blob.
fn clean_candidate(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```python") {
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    let cleaned = text.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_candidate_strips_fences() {
        let raw = "```python\ndef f(x):\n    return x\n```";
        assert_eq!(clean_candidate(raw).unwrap(), "def f(x):\n    return x");
    }

    #[test]
    fn test_clean_candidate_drops_empty() {
        assert_eq!(clean_candidate("   \n```\n```  "), None);
    }

    #[test]
    fn test_split_variants_on_separator() {
        let content = "def a(x):\n    return x\n---\ndef b(x):\n    return x + 0\n";
        let variants = split_variants(content);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].name, "variant-1");
        assert!(variants[1].code.starts_with("def b"));
    }

    #[test]
    fn test_generator_requires_api_key() {
        let err = RewriteGenerator::new(LlmConfig::default()).unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));
    }
}

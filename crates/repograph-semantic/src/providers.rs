//! Optional HTTP-backed Describer and Embedder (Ollama-compatible API).
//!
//! Both are capability plug-ins: nothing in the system requires them, and
//! every call site falls back to the deterministic offline path on failure.

use repograph_core::{
    DescribeRequest, DescribeResponse, Describer, Embedder, ParentCandidate, RpgError,
    SemanticConfig,
};
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ── Embedder ────────────────────────────────────────────────────────────────

/// Embeddings via Ollama's `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            client: reqwest::blocking::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RpgError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({ "model": self.model, "prompt": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| RpgError::Model(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RpgError::Model(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| RpgError::Model(format!("embedding response parse error: {e}")))?;

        let vector: Vec<f32> = json
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RpgError::Model("missing 'embedding' field in response".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Describer ───────────────────────────────────────────────────────────────

/// Entity description and routing arbitration via Ollama's `/api/generate`.
pub struct OllamaDescriber {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaDescriber {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn generate(&self, prompt: &str) -> Result<String, RpgError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| RpgError::Model(format!("generate request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RpgError::Model(format!(
                "generate endpoint returned {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| RpgError::Model(format!("generate response parse error: {e}")))?;

        json.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| RpgError::Model("missing 'response' field".into()))
    }
}

impl Describer for OllamaDescriber {
    fn describe(&self, request: &DescribeRequest<'_>) -> Result<DescribeResponse, RpgError> {
        let mut prompt = format!(
            "Summarize this code entity in one sentence and list 3-8 keywords.\n\
             Respond with JSON: {{\"description\": \"...\", \"keywords\": [\"...\"]}}.\n\n\
             Kind: {}\nName: {}\nFile: {}\n",
            request.kind, request.name, request.file_path
        );
        if let Some(parent) = request.parent {
            prompt.push_str(&format!("Parent: {parent}\n"));
        }
        if let Some(snippet) = request.source_snippet {
            prompt.push_str(&format!("\nSource:\n{snippet}\n"));
        }

        let raw = self.generate(&prompt)?;
        parse_describe_response(&raw)
    }

    fn arbitrate(
        &self,
        candidates: &[ParentCandidate],
        description: &str,
    ) -> Result<Option<String>, RpgError> {
        let mut prompt = format!(
            "Pick the best parent module for this entity.\n\
             Entity: {description}\n\nCandidates:\n"
        );
        for candidate in candidates {
            prompt.push_str(&format!("- {}: {}\n", candidate.id, candidate.description));
        }
        prompt.push_str("\nRespond with JSON: {\"id\": \"<candidate id>\"}.\n");

        let raw = self.generate(&prompt)?;
        let json: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| RpgError::Model(format!("arbiter response parse error: {e}")))?;
        Ok(json
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }
}

/// Parse a Describer reply: strict JSON first, then a plain-text fallback
/// where the first line is the description and the rest are keywords.
fn parse_describe_response(raw: &str) -> Result<DescribeResponse, RpgError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = serde_json::from_str::<DescribeResponse>(trimmed) {
        if !parsed.description.trim().is_empty() {
            return Ok(parsed);
        }
    }

    let mut lines = trimmed.lines();
    let description = lines
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| RpgError::Model("empty describer response".into()))?;
    let keywords = lines
        .flat_map(|l| l.split(','))
        .map(|k| k.trim().trim_start_matches('-').trim().to_lowercase())
        .filter(|k| k.len() >= 2)
        .collect();
    Ok(DescribeResponse {
        description,
        keywords,
    })
}

// ── Factory ─────────────────────────────────────────────────────────────────

/// Build providers from the `semantic` config section. An empty provider
/// string keeps the system offline.
#[allow(clippy::type_complexity)]
pub fn from_config(
    config: &SemanticConfig,
) -> Result<(Option<Arc<dyn Describer>>, Option<Arc<dyn Embedder>>), RpgError> {
    match config.provider.as_str() {
        "" | "offline" => Ok((None, None)),
        "ollama" => {
            let describer: Arc<dyn Describer> =
                Arc::new(OllamaDescriber::new(&config.url, &config.model));
            let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
                &config.url,
                &config.model,
                config.dimensions,
            ));
            Ok((Some(describer), Some(embedder)))
        }
        other => Err(RpgError::Config(format!(
            "unknown semantic provider: {other:?} (use \"ollama\" or leave empty)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_describe_response() {
        let raw = r#"{"description": "Parses request bodies", "keywords": ["parse", "http"]}"#;
        let parsed = parse_describe_response(raw).unwrap();
        assert_eq!(parsed.description, "Parses request bodies");
        assert_eq!(parsed.keywords, ["parse", "http"]);
    }

    #[test]
    fn parse_plain_text_describe_response() {
        let raw = "Handles socket lifecycle\nsocket, lifecycle, network";
        let parsed = parse_describe_response(raw).unwrap();
        assert_eq!(parsed.description, "Handles socket lifecycle");
        assert_eq!(parsed.keywords, ["socket", "lifecycle", "network"]);
    }

    #[test]
    fn parse_empty_response_is_model_error() {
        assert!(matches!(
            parse_describe_response("   "),
            Err(RpgError::Model(_))
        ));
    }

    #[test]
    fn factory_offline_by_default() {
        let (describer, embedder) = from_config(&SemanticConfig::default()).unwrap();
        assert!(describer.is_none());
        assert!(embedder.is_none());
    }

    #[test]
    fn factory_rejects_unknown_provider() {
        let mut config = SemanticConfig::default();
        config.provider = "quantum".into();
        assert!(matches!(from_config(&config), Err(RpgError::Config(_))));
    }

    #[test]
    fn factory_builds_ollama_pair() {
        let mut config = SemanticConfig::default();
        config.provider = "ollama".into();
        let (describer, embedder) = from_config(&config).unwrap();
        assert!(describer.is_some());
        assert_eq!(embedder.unwrap().dimensions(), 768);
    }
}

use anyhow::{anyhow, Result};
use log::{debug, info, trace};
use musli::json;
use musli::{Decode, Encode};
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;

use super::LlmClient;
use crate::config::GenerationConfig;

#[derive(Debug, Encode)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Encode)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Decode)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Decode)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Encode)]
struct PullRequest {
    name: String,
    stream: bool,
}

#[derive(Debug, Decode)]
struct PullResponse {
    status: String,
}

/// An installed model as reported by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Decode)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
}

impl ModelInfo {
    /// Size in decimal gigabytes (10^9 bytes).
    pub fn size_gb(&self) -> f64 {
        self.size as f64 / 1e9
    }
}

/// Synchronous Ollama client using /api/generate, /api/tags and /api/pull.
pub struct OllamaClient {
    http: Client,
}

impl OllamaClient {
    pub fn new() -> Result<Self> {
        // Timeouts are applied per request from the generation config.
        let http = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self { http })
    }

    /// List the models installed on the server at `endpoint`.
    pub fn list_models(&self, endpoint: &str) -> Result<Vec<ModelInfo>> {
        let url = api_url(endpoint, "tags");
        debug!("Listing Ollama models at {url}");

        let text = send(self.http.get(&url), &url, None)?;
        let parsed: TagsResponse =
            json::from_str(&text).map_err(|e| anyhow!("Failed to decode Ollama model list: {e}"))?;
        Ok(parsed.models)
    }

    /// Ask the server to download `name`; blocks until the pull finishes.
    pub fn pull_model(&self, endpoint: &str, name: &str) -> Result<String> {
        let url = api_url(endpoint, "pull");
        let body = json::to_string(&PullRequest {
            name: name.to_string(),
            stream: false,
        })
        .map_err(|e| anyhow!("Failed to encode Ollama pull request: {e}"))?;

        info!("Pulling model {name:?} through {url}");

        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let text = send(request, &url, None)?;
        let parsed: PullResponse =
            json::from_str(&text).map_err(|e| anyhow!("Failed to decode Ollama pull response: {e}"))?;

        if parsed.status != "success" {
            return Err(anyhow!("Ollama could not pull {name}: {}", parsed.status));
        }
        Ok(parsed.status)
    }
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str, cfg: &GenerationConfig) -> Result<String> {
        let body = encode_generate_request(prompt, cfg)?;
        trace!("Ollama request body: {body}");

        let url = api_url(&cfg.endpoint, "generate");
        info!("Calling Ollama model {:?} at {url}", cfg.model);

        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let text = send(request, &url, cfg.timeout)?;
        decode_generate_response(&text)
    }
}

fn api_url(endpoint: &str, path: &str) -> String {
    format!("{}/api/{path}", endpoint.trim_end_matches('/'))
}

fn send(request: RequestBuilder, url: &str, timeout: Option<Duration>) -> Result<String> {
    let request = match timeout {
        Some(limit) => request.timeout(limit),
        None => request,
    };

    let resp = request.send().map_err(|e| {
        if e.is_timeout() {
            anyhow!("Ollama at {url} did not answer in time (raise `timeout_secs` to wait longer): {e}")
        } else {
            anyhow!("Error calling Ollama at {url}: {e}")
        }
    })?;

    let status = resp.status();
    let text = resp
        .text()
        .map_err(|e| anyhow!("Failed to read Ollama response body: {e}"))?;

    if !status.is_success() {
        return Err(anyhow!(
            "Ollama HTTP error from {url}: HTTP {} - {}",
            status.as_u16(),
            text.trim()
        ));
    }

    trace!("Ollama raw JSON response: {text}");
    Ok(text)
}

fn encode_generate_request(prompt: &str, cfg: &GenerationConfig) -> Result<String> {
    let req = GenerateRequest {
        model: cfg.model.clone(),
        prompt: prompt.to_string(),
        stream: false,
        options: GenerateOptions {
            temperature: cfg.temperature,
            num_predict: cfg.max_tokens,
        },
    };
    json::to_string(&req).map_err(|e| anyhow!("Failed to encode Ollama JSON request: {e}"))
}

fn decode_generate_response(body: &str) -> Result<String> {
    let parsed: GenerateResponse =
        json::from_str(body).map_err(|e| anyhow!("Failed to decode Ollama JSON: {e}"))?;
    Ok(parsed.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generation_config(endpoint: String) -> GenerationConfig {
        GenerationConfig {
            endpoint,
            model: "qwen2.5:3b".to_string(),
            max_tokens: 300,
            temperature: 0.2,
            timeout: Some(Duration::from_secs(5)),
        }
    }

    #[test]
    fn request_body_matches_wire_contract() {
        let cfg = generation_config("http://localhost:11434".to_string());
        let body = encode_generate_request("say hi", &cfg).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["model"], "qwen2.5:3b");
        assert_eq!(value["prompt"], "say hi");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 300);
        let temperature = value["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn response_decoding_ignores_extra_fields() {
        let body = r#"{"model":"m","created_at":"2024-01-01T00:00:00Z","response":"[COMMIT]feat: x[/COMMIT]","done":true}"#;
        assert_eq!(decode_generate_response(body).unwrap(), "[COMMIT]feat: x[/COMMIT]");
    }

    #[test]
    fn response_without_text_is_an_error() {
        assert!(decode_generate_response(r#"{"error":"model not found"}"#).is_err());
    }

    #[test]
    fn api_url_tolerates_trailing_slash() {
        assert_eq!(api_url("http://host:11434/", "tags"), "http://host:11434/api/tags");
        assert_eq!(api_url("http://host:11434", "generate"), "http://host:11434/api/generate");
    }

    #[test]
    fn model_size_is_reported_in_gigabytes() {
        let model = ModelInfo {
            name: "llama3:8b".to_string(),
            size: 4_661_224_676,
        };
        assert!((model.size_gb() - 4.661224676).abs() < 1e-9);
        assert_eq!(format!("{:.1}", model.size_gb()), "4.7");
    }

    #[tokio::test]
    async fn generate_posts_prompt_and_returns_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:3b",
                "prompt": "describe ${diff}",
                "stream": false,
                "options": { "num_predict": 300 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5:3b",
                "response": "  [COMMIT]feat: add cache[/COMMIT]\n",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = generation_config(format!("{}/", server.uri()));
        let raw = tokio::task::spawn_blocking(move || {
            OllamaClient::new()?.generate("describe ${diff}", &cfg)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(raw, "  [COMMIT]feat: add cache[/COMMIT]\n");
    }

    #[tokio::test]
    async fn generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model 'nope' not found"))
            .mount(&server)
            .await;

        let cfg = generation_config(server.uri());
        let err = tokio::task::spawn_blocking(move || {
            OllamaClient::new()?.generate("prompt", &cfg)
        })
        .await
        .unwrap()
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.contains("model 'nope' not found"), "{msg}");
    }

    #[tokio::test]
    async fn slow_generation_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "too late" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let cfg = GenerationConfig {
            timeout: Some(Duration::from_millis(300)),
            ..generation_config(server.uri())
        };
        let started = std::time::Instant::now();
        let err = tokio::task::spawn_blocking(move || {
            OllamaClient::new()?.generate("prompt", &cfg)
        })
        .await
        .unwrap()
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("timeout_secs"), "{msg}");
        assert!(started.elapsed() < Duration::from_secs(4), "waited {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn lists_installed_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    { "name": "qwen2.5:3b", "size": 1929912432u64, "digest": "abc" },
                    { "name": "llama3:8b", "size": 4661224676u64, "digest": "def" }
                ]
            })))
            .mount(&server)
            .await;

        let endpoint = server.uri();
        let models = tokio::task::spawn_blocking(move || OllamaClient::new()?.list_models(&endpoint))
            .await
            .unwrap()
            .unwrap();

        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["qwen2.5:3b", "llama3:8b"]);
        assert_eq!(models[1].size, 4661224676);
    }

    #[tokio::test]
    async fn pull_sends_model_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_partial_json(json!({ "name": "llama3:8b", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = server.uri();
        let status =
            tokio::task::spawn_blocking(move || OllamaClient::new()?.pull_model(&endpoint, "llama3:8b"))
                .await
                .unwrap()
                .unwrap();

        assert_eq!(status, "success");
    }
}

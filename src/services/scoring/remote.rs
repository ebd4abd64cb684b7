// Remote Model Backend
// Blocking JSON client for an inference server hosting the causal language
// model and the plagiarism classifier.
//
// Endpoints (relative to the base URL):
//   GET  /info      -> {"maxPositions": n}
//   POST /tokenize  {"text"}               -> {"ids": [..]}
//   POST /nll       {"ids", "targetLen"}   -> {"meanNll": x}
//   POST /entropy   {"ids"}                -> {"entropies": [..]}
//   POST /classify  {"text"}               -> {"logits": [..]}

use super::perplexity::check_context;
use super::{LanguageModel, ScoringError, SequenceClassifier};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    max_positions: usize,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    ids: Vec<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NllRequest<'a> {
    ids: &'a [u32],
    target_len: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NllResponse {
    mean_nll: f64,
}

#[derive(Debug, Serialize)]
struct EntropyRequest<'a> {
    ids: &'a [u32],
}

#[derive(Debug, Deserialize)]
struct EntropyResponse {
    entropies: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    logits: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct RemoteModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_positions: usize,
}

impl RemoteModel {
    /// Build the client and fetch the model's context size.
    pub fn connect(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let mut model = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            max_positions: 0,
        };

        let info: InfoResponse = model.send("info", model.client.get(model.url("info")))?;
        check_context(info.max_positions)?;
        model.max_positions = info.max_positions;
        Ok(model)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ScoringError> {
        self.send(path, self.client.post(self.url(path)).json(body))
    }

    fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, ScoringError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let start = Instant::now();
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ScoringError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response.json()?;
        debug!(
            endpoint = path,
            latency_ms = start.elapsed().as_millis() as u64,
            "[MODELS] inference call"
        );
        Ok(parsed)
    }
}

impl LanguageModel for RemoteModel {
    fn max_positions(&self) -> usize {
        self.max_positions
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ScoringError> {
        let resp: TokenizeResponse = self.post("tokenize", &TextRequest { text })?;
        Ok(resp.ids)
    }

    fn mean_nll(&self, window: &[u32], target_len: usize) -> Result<f64, ScoringError> {
        let resp: NllResponse = self.post(
            "nll",
            &NllRequest {
                ids: window,
                target_len,
            },
        )?;
        Ok(resp.mean_nll)
    }

    fn token_entropies(&self, ids: &[u32]) -> Result<Vec<f64>, ScoringError> {
        let resp: EntropyResponse = self.post("entropy", &EntropyRequest { ids })?;
        Ok(resp.entropies)
    }
}

impl SequenceClassifier for RemoteModel {
    fn logits(&self, text: &str) -> Result<Vec<f64>, ScoringError> {
        let resp: ClassifyResponse = self.post("classify", &TextRequest { text })?;
        Ok(resp.logits)
    }
}

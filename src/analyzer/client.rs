//! HTTP client for the analysis model.
//!
//! One chat-completions request per paper against an OpenAI-compatible
//! endpoint, with bounded retries on transport failures. The reply is
//! requested as a JSON object and converted into a `PaperRecord`; a
//! reply that does not form a well-formed record is an error, so the
//! caller can drop the paper instead of letting a malformed record
//! reach the aggregation layer.

use crate::analysis::validate_record;
use crate::analyzer::prompt;
use crate::config::ProtocolConfig;
use crate::models::{PaperRecord, Recommendation};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the analyzer client.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub retries: usize,
    pub max_prompt_chars: usize,
}

/// Chat-completions API request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat-completions API response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// The JSON payload the model replies with for one paper.
#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    meets_inclusion_criteria: bool,
    #[serde(default)]
    inclusion_justification: String,
    #[serde(default)]
    rq_scores: HashMap<String, f64>,
    #[serde(default)]
    implementation_quality: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    techniques: Vec<String>,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    implementation_details: String,
    #[serde(default)]
    key_findings: String,
    #[serde(default)]
    challenges: Vec<String>,
    #[serde(default)]
    success_factors: Vec<String>,
    overall_score: f64,
    #[serde(default)]
    recommendation: String,
}

impl AnalysisPayload {
    fn into_record(self, id: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            included: self.meets_inclusion_criteria,
            inclusion_justification: self.inclusion_justification,
            rq_scores: self.rq_scores,
            implementation_quality: self.implementation_quality,
            overall_score: self.overall_score,
            domain: self.domain,
            techniques: self.techniques,
            challenges: self.challenges,
            success_factors: self.success_factors,
            summary: self.summary,
            key_findings: self.key_findings,
            implementation_details: self.implementation_details,
            recommendation: Recommendation::from(self.recommendation.as_str()),
        }
    }
}

/// The per-paper analysis client.
pub struct PaperAnalyzer {
    config: AnalyzerConfig,
    http_client: reqwest::Client,
    system_prompt: String,
    rq_ids: Vec<String>,
}

impl PaperAnalyzer {
    /// Create a new analyzer for the given protocol.
    pub fn new(config: AnalyzerConfig, protocol: &ProtocolConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            system_prompt: prompt::system_prompt(protocol),
            rq_ids: protocol.rq_ids(),
            config,
            http_client,
        })
    }

    /// Analyze one paper and return its validated record.
    ///
    /// `id` becomes the record id; `text` is the extracted paper text.
    pub async fn analyze(&self, id: &str, text: &str) -> Result<PaperRecord> {
        let content = self.request_analysis(text).await?;

        let payload: AnalysisPayload = serde_json::from_str(&content)
            .with_context(|| format!("Model returned malformed analysis JSON for {}", id))?;

        let record = payload.into_record(id);
        validate_record(&record, &self.rq_ids)
            .with_context(|| format!("Model returned an ill-formed record for {}", id))?;

        Ok(record)
    }

    /// Send the chat request, retrying on transport errors.
    async fn request_analysis(&self, text: &str) -> Result<String> {
        let mut last_err = None;

        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                debug!("Retrying analysis request (attempt {})", attempt + 1);
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }

            match self.send_chat_request(text).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!("Analysis request failed: {}", e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Analysis request failed")))
    }

    async fn send_chat_request(&self, text: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt::user_prompt(text, self.config.max_prompt_chars),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to API at {}", self.config.api_url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API error {}: {}", status, body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat-completions response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            anyhow::bail!("Model returned an empty reply");
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAYLOAD: &str = r#"{
        "meets_inclusion_criteria": true,
        "inclusion_justification": "Empirical deployment study",
        "rq_scores": {"RQ1": 85, "RQ2": 70, "RQ3": 90},
        "implementation_quality": 80,
        "summary": "Deploys a sepsis early-warning model in three ICUs.",
        "techniques": ["Gradient boosting"],
        "domain": "Critical care",
        "implementation_details": "EHR-integrated streaming pipeline",
        "key_findings": "Reduced time-to-antibiotics by 41 minutes",
        "challenges": ["Alert fatigue", "Data drift"],
        "success_factors": ["Clinical champion"],
        "overall_score": 88,
        "recommendation": "Include"
    }"#;

    #[test]
    fn test_payload_converts_to_record() {
        let payload: AnalysisPayload = serde_json::from_str(SAMPLE_PAYLOAD).unwrap();
        let record = payload.into_record("icu/sepsis2024.pdf");

        assert_eq!(record.id, "icu/sepsis2024.pdf");
        assert!(record.included);
        assert_eq!(record.overall_score, 88.0);
        assert_eq!(record.rq_scores.get("RQ2"), Some(&70.0));
        assert_eq!(record.recommendation, Recommendation::Include);
        assert_eq!(record.challenges.len(), 2);
    }

    #[test]
    fn test_payload_tolerates_missing_optional_fields() {
        let minimal = r#"{
            "meets_inclusion_criteria": false,
            "rq_scores": {"RQ1": 10, "RQ2": 5, "RQ3": 0},
            "overall_score": 12
        }"#;

        let payload: AnalysisPayload = serde_json::from_str(minimal).unwrap();
        let record = payload.into_record("misc/editorial.pdf");

        assert!(!record.included);
        assert_eq!(record.recommendation, Recommendation::Exclude);
        assert!(record.techniques.is_empty());
    }

    #[test]
    fn test_payload_missing_required_fields_is_an_error() {
        // No overall_score: the reply cannot form a record at all
        let broken = r#"{"meets_inclusion_criteria": true}"#;
        assert!(serde_json::from_str::<AnalysisPayload>(broken).is_err());
    }

    #[test]
    fn test_converted_record_passes_validation() {
        let payload: AnalysisPayload = serde_json::from_str(SAMPLE_PAYLOAD).unwrap();
        let record = payload.into_record("icu/sepsis2024.pdf");

        let rq_ids = vec!["RQ1".to_string(), "RQ2".to_string(), "RQ3".to_string()];
        assert!(validate_record(&record, &rq_ids).is_ok());
    }

    #[test]
    fn test_out_of_range_payload_fails_validation() {
        let payload: AnalysisPayload = serde_json::from_str(SAMPLE_PAYLOAD).unwrap();
        let mut record = payload.into_record("icu/sepsis2024.pdf");
        record.rq_scores.insert("RQ1".to_string(), 250.0);

        let rq_ids = vec!["RQ1".to_string(), "RQ2".to_string(), "RQ3".to_string()];
        assert!(validate_record(&record, &rq_ids).is_err());
    }
}

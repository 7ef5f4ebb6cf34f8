//! Gemini 제공자 분류기
//!
//! `{endpoint}/v1beta/models/{model}:generateContent` REST API를 호출합니다.
//! 응답 스키마를 [`ThreatVerdict`]와 동일하게 지정하여 구조화된 JSON을 받습니다.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::{Value, json};

use sentinel_core::config::ClassifierConfig;
use sentinel_core::metrics as m;
use sentinel_core::types::ThreatVerdict;

use super::ThreatClassifier;
use crate::error::ClassifierError;

const SYSTEM_INSTRUCTION: &str = "You are an expert SOC Analyst and Security Engineer. \
Your job is to analyze logs with high precision.";

/// 에러 응답 본문 최대 길이 (로그용)
const MAX_ERROR_BODY_CHARS: usize = 320;

/// Gemini REST API 분류기
pub struct GeminiClassifier {
    client: Client,
    url: Url,
    temperature: f64,
}

impl GeminiClassifier {
    /// 설정에서 분류기를 생성합니다.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClassifierError::ClientBuild(e.to_string()))?;

        let url = resolve_endpoint(&config.endpoint, &config.model, &config.api_key)?;

        Ok(Self {
            client,
            url,
            temperature: config.temperature,
        })
    }

    /// 요청 본문을 생성합니다.
    fn request_body(&self, raw: &str) -> Value {
        json!({
            "contents": [
                {
                    "parts": [
                        { "text": build_prompt(raw) }
                    ]
                }
            ],
            "systemInstruction": {
                "parts": [
                    { "text": SYSTEM_INSTRUCTION }
                ]
            },
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
                "responseSchema": verdict_schema(),
            }
        })
    }

    async fn request(&self, raw: &str) -> Result<ThreatVerdict, ClassifierError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&self.request_body(raw))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body: Value = response.json().await?;
        parse_generate_content(&body)
    }
}

impl ThreatClassifier for GeminiClassifier {
    async fn classify(&self, raw: &str) -> ThreatVerdict {
        match self.request(raw).await {
            Ok(verdict) => {
                tracing::debug!(
                    is_threat = verdict.is_threat,
                    severity = %verdict.severity,
                    confidence = verdict.confidence_score,
                    "provider verdict received"
                );
                verdict
            }
            Err(e) => {
                tracing::warn!(error = %e, "threat classification failed, returning failure verdict");
                metrics::counter!(m::CLASSIFIER_FAILURES_TOTAL).increment(1);
                ThreatVerdict::failure()
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn is_offline(&self) -> bool {
        false
    }
}

/// `generateContent` 응답에서 판정을 추출합니다.
///
/// 첫 번째 후보의 텍스트 파트를 이어 붙여 JSON으로 해석하고 값 범위를 검증합니다.
pub fn parse_generate_content(body: &Value) -> Result<ThreatVerdict, ClassifierError> {
    let text = body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ClassifierError::EmptyResponse);
    }

    let verdict: ThreatVerdict = serde_json::from_str(text.trim())?;
    verdict.validate().map_err(ClassifierError::InvalidVerdict)?;
    Ok(verdict)
}

fn build_prompt(raw: &str) -> String {
    format!(
        "Analyze this web server log entry for security threats.\n\
         Log: {raw}\n\n\
         Context: This is a single line from an Apache/Nginx access log. \
         Look for OWASP Top 10 vulnerabilities like SQLi, XSS, Command Injection, etc."
    )
}

/// [`ThreatVerdict`]와 동일한 응답 스키마
fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isThreat": {
                "type": "BOOLEAN",
                "description": "Whether the log indicates a security threat."
            },
            "severity": {
                "type": "STRING",
                "enum": ["INFO", "WARNING", "CRITICAL"],
                "description": "The severity level of the log."
            },
            "threatType": {
                "type": "STRING",
                "nullable": true,
                "description": "The specific type of threat (e.g., SQL Injection, XSS, Brute Force), or null if safe."
            },
            "confidenceScore": {
                "type": "NUMBER",
                "minimum": 0,
                "maximum": 100,
                "description": "Confidence score between 0 and 100."
            },
            "summary": {
                "type": "STRING",
                "description": "A brief, one-sentence summary of what happened."
            },
            "mitigationSteps": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of recommended actions to mitigate this threat."
            }
        },
        "required": ["isThreat", "severity", "confidenceScore", "summary", "mitigationSteps"]
    })
}

fn resolve_endpoint(endpoint: &str, model: &str, api_key: &str) -> Result<Url, ClassifierError> {
    let generated = if endpoint.contains(":generateContent") {
        endpoint.to_owned()
    } else {
        format!(
            "{}/v1beta/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        )
    };

    let mut url = Url::parse(&generated).map_err(|e| ClassifierError::Endpoint {
        endpoint: endpoint.to_owned(),
        reason: e.to_string(),
    })?;

    if !url.query_pairs().any(|(k, _)| k == "key") {
        url.query_pairs_mut().append_pair("key", api_key);
    }

    Ok(url)
}

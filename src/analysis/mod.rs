//! Analysis request pipeline.
//!
//! Takes a file payload, builds a model-specific request (model variant by
//! content category, optional inline binary, optional structured-output
//! schema, optional reasoning budget), issues it with bounded retry and
//! backoff, and normalizes whatever comes back (output, malformed output,
//! or failure) into a result the caller can always display. The public
//! entry points never return an error.

pub mod prompt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::llm::gemini::{
    Content, GeminiClient, GenerateRequest, GenerationConfig, Part, ThinkingConfig,
};
use crate::llm::retry::{self, RetryPolicy};
use crate::llm::LlmError;

/// Deep-reasoning variant for documents and plain text.
pub const TEXT_MODEL: &str = "gemini-3-pro-preview";
/// Media-capable variant for audio and video payloads.
pub const MEDIA_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
/// Lighter variant for contextual queries.
pub const QUERY_MODEL: &str = "gemini-3-flash-preview";

const DEFAULT_THINKING_BUDGET: u32 = 2048;

const EMPTY_OUTPUT_MESSAGE: &str = "Analysis failed to generate output.";
const NO_ANSWER_MESSAGE: &str =
    "I was unable to retrieve a specific answer from the intelligence pool.";
const QUERY_FAILED_MESSAGE: &str = "Connection to intelligence core failed. Please retry.";

const QUEUED_MESSAGE: &str = "# Connection Limit Reached\n\n\
The file is too large for the live intelligence link.\n\n\
**Action Required:**\n\
* The file has been queued for backend analysis (Deep Search).\n\
* Try a smaller snippet or wait for the backend indexer to finish.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Document,
    Audio,
    Video,
}

impl ContentCategory {
    pub fn is_media(self) -> bool {
        matches!(self, ContentCategory::Audio | ContentCategory::Video)
    }
}

/// One file to analyze. Constructed by the host at the moment of the drop,
/// discarded once the pipeline returns.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file_name: String,
    /// Preview or full extracted text; inlined into the instruction block
    /// only when no binary payload is attached.
    pub text_content: String,
    pub category: ContentCategory,
    pub binary: Option<Vec<u8>>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Conflict,
    Success,
    Warning,
    Neutral,
}

/// Structured critique report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: ReportStatus,
    pub title: String,
    pub summary: String,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

/// What the pipeline hands back. A given configuration produces exactly one
/// of the two variants; callers render without knowing which backend
/// configuration was in play.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Structured(Report),
    Freeform { markdown: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Freeform,
    Structured,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: OutputMode,
    pub retry: RetryPolicy,
    /// Whether contextual queries run under the same retry policy as
    /// analysis requests.
    pub retry_queries: bool,
    pub thinking_budget: u32,
    pub text_model: String,
    pub media_model: String,
    pub query_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            retry: RetryPolicy::default(),
            retry_queries: true,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            text_model: TEXT_MODEL.to_string(),
            media_model: MEDIA_MODEL.to_string(),
            query_model: QUERY_MODEL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Model variant for a request. Pure lookup: media goes to the
    /// media-capable variant, everything else to the text reasoner.
    pub fn model_for(&self, category: ContentCategory) -> &str {
        if category.is_media() {
            &self.media_model
        } else {
            &self.text_model
        }
    }
}

pub struct Analyzer {
    client: GeminiClient,
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(client: GeminiClient, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one analysis to completion. Infallible at this boundary: every
    /// failure path terminates in a displayable result.
    pub async fn analyze(&self, request: AnalysisRequest) -> AnalysisResult {
        let request_id = Uuid::new_v4();
        let model = self.config.model_for(request.category).to_string();
        let wire = self.build_request(&request);

        info!(
            request_id = %request_id,
            file = %request.file_name,
            model = %model,
            "starting analysis"
        );

        let outcome =
            retry::with_backoff(&self.config.retry, || self.client.generate(&model, &wire)).await;

        match outcome {
            Ok(raw) => self.normalize(&request.file_name, &raw),
            Err(err) => {
                error!(
                    request_id = %request_id,
                    file = %request.file_name,
                    error = %err,
                    "analysis request failed"
                );
                self.failure_result(&request.file_name, &err)
            }
        }
    }

    /// Contextual query over already-extracted document text. Returns plain
    /// text; failures collapse to a canned retry message.
    pub async fn query(&self, question: &str, context: &str) -> String {
        let wire = query_request(question, context);
        let model = &self.config.query_model;

        let outcome = if self.config.retry_queries {
            retry::with_backoff(&self.config.retry, || self.client.generate(model, &wire)).await
        } else {
            self.client.generate(model, &wire).await
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => NO_ANSWER_MESSAGE.to_string(),
            Err(err) => {
                error!(error = %err, "contextual query failed");
                QUERY_FAILED_MESSAGE.to_string()
            }
        }
    }

    /// Streaming contextual query. Deltas go to `on_chunk` as they arrive.
    /// Never retried: a replayed stream would repeat already-delivered text.
    pub async fn query_stream(
        &self,
        question: &str,
        context: &str,
        on_chunk: impl FnMut(&str) + Send,
    ) -> String {
        let wire = query_request(question, context);

        match self
            .client
            .generate_stream(&self.config.query_model, &wire, on_chunk)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => NO_ANSWER_MESSAGE.to_string(),
            Err(err) => {
                error!(error = %err, "contextual query stream failed");
                QUERY_FAILED_MESSAGE.to_string()
            }
        }
    }

    fn build_request(&self, request: &AnalysisRequest) -> GenerateRequest {
        let mut parts = Vec::new();

        let has_payload = request.binary.is_some() && request.mime_type.is_some();
        if let (Some(binary), Some(mime)) = (&request.binary, &request.mime_type) {
            parts.push(Part::inline_data(mime.clone(), binary));
        }

        let template = match self.config.mode {
            OutputMode::Freeform => prompt::FREEFORM_PROMPT,
            OutputMode::Structured => prompt::STRUCTURED_PROMPT,
        };
        let snippet = if has_payload {
            None
        } else {
            Some(request.text_content.as_str())
        };
        parts.push(Part::text(prompt::analysis_prompt(
            template,
            &request.file_name,
            snippet,
        )));

        let mut generation_config = GenerationConfig::default();
        if self.config.mode == OutputMode::Structured {
            generation_config.response_mime_type = Some("application/json".to_string());
            generation_config.response_schema = Some(prompt::response_schema());
        }
        if !request.category.is_media() {
            generation_config.thinking_config = Some(ThinkingConfig {
                thinking_budget: self.config.thinking_budget,
            });
        }

        GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: Some(generation_config),
        }
    }

    fn normalize(&self, file_name: &str, raw: &str) -> AnalysisResult {
        match self.config.mode {
            OutputMode::Freeform => {
                if raw.trim().is_empty() {
                    AnalysisResult::Freeform {
                        markdown: EMPTY_OUTPUT_MESSAGE.to_string(),
                    }
                } else {
                    AnalysisResult::Freeform {
                        markdown: raw.to_string(),
                    }
                }
            }
            OutputMode::Structured => match parse_report(raw) {
                Some(report) => AnalysisResult::Structured(report),
                None => {
                    warn!(file = %file_name, "model output did not match the report shape");
                    AnalysisResult::Structured(fallback_report())
                }
            },
        }
    }

    fn failure_result(&self, file_name: &str, err: &LlmError) -> AnalysisResult {
        // A transport-class error here either exhausted its retries or never
        // had them; either way the live link could not carry the request.
        if err.is_retryable() {
            return self.queued_for_backend();
        }
        if matches!(err, LlmError::Parse(_)) && self.config.mode == OutputMode::Structured {
            return AnalysisResult::Structured(fallback_report());
        }
        self.generic_error(file_name, err)
    }

    fn queued_for_backend(&self) -> AnalysisResult {
        match self.config.mode {
            OutputMode::Freeform => AnalysisResult::Freeform {
                markdown: QUEUED_MESSAGE.to_string(),
            },
            OutputMode::Structured => AnalysisResult::Structured(Report {
                status: ReportStatus::Neutral,
                title: "Connection Limit Reached".to_string(),
                summary: "The file is too large for the live intelligence link and has been \
                          queued for backend analysis."
                    .to_string(),
                risks: vec!["Live transport rejected the payload".to_string()],
                recommendations: vec![
                    "Wait for the backend indexer or retry with a smaller snippet".to_string(),
                ],
            }),
        }
    }

    fn generic_error(&self, file_name: &str, err: &LlmError) -> AnalysisResult {
        match self.config.mode {
            OutputMode::Freeform => AnalysisResult::Freeform {
                markdown: format!(
                    "# Analysis Error\nThe intelligence engine encountered an unexpected \
                     error while processing {}.\n\nError details: {}",
                    file_name, err
                ),
            },
            OutputMode::Structured => AnalysisResult::Structured(Report {
                status: ReportStatus::Neutral,
                title: "Analysis Error".to_string(),
                summary: format!(
                    "The intelligence engine encountered an unexpected error while \
                     processing {}: {}",
                    file_name, err
                ),
                risks: vec!["Unknown processing error".to_string()],
                recommendations: vec!["Retry the analysis".to_string()],
            }),
        }
    }
}

fn query_request(question: &str, context: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part::text(prompt::query_prompt(question, context))],
        }],
        generation_config: None,
    }
}

/// Canned substitute when structured output is empty or unparseable. The UI
/// always has a renderable object.
fn fallback_report() -> Report {
    Report {
        status: ReportStatus::Neutral,
        title: "Analysis Unavailable".to_string(),
        summary: "The intelligence engine returned an unreadable result for this file."
            .to_string(),
        risks: vec!["Unknown processing error".to_string()],
        recommendations: vec!["Retry the analysis".to_string()],
    }
}

fn parse_report(raw: &str) -> Option<Report> {
    // Schema enforcement should give us bare JSON; strip fences anyway for
    // models that wrap output regardless.
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    serde_json::from_str(cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gemini::GeminiConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analyzer(base_url: &str, mode: OutputMode) -> Analyzer {
        let config = PipelineConfig {
            mode,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
            },
            ..Default::default()
        };
        let client = GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
        });
        Analyzer::new(client, config)
    }

    fn candidate_body(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    fn document_request() -> AnalysisRequest {
        AnalysisRequest {
            file_name: "contract.pdf".to_string(),
            text_content: "Clause 7 has no cap on liability.".to_string(),
            category: ContentCategory::Document,
            binary: None,
            mime_type: None,
        }
    }

    const TEXT_MODEL_PATH: &str = "/v1beta/models/gemini-3-pro-preview:generateContent";

    #[test]
    fn test_media_categories_select_media_model() {
        let config = PipelineConfig::default();
        assert_eq!(config.model_for(ContentCategory::Audio), MEDIA_MODEL);
        assert_eq!(config.model_for(ContentCategory::Video), MEDIA_MODEL);
        assert_eq!(config.model_for(ContentCategory::Document), TEXT_MODEL);
    }

    #[test]
    fn test_document_request_carries_snippet_and_thinking_budget() {
        let analyzer = analyzer("http://unused", OutputMode::Freeform);
        let wire = analyzer.build_request(&document_request());

        let body = serde_json::to_string(&wire).unwrap();
        assert!(body.contains("Clause 7 has no cap on liability."));
        assert!(body.contains("\"thinkingBudget\":2048"));
        assert!(!body.contains("inlineData"));
    }

    #[test]
    fn test_media_request_attaches_payload_and_skips_snippet() {
        let analyzer = analyzer("http://unused", OutputMode::Freeform);
        let wire = analyzer.build_request(&AnalysisRequest {
            file_name: "pitch.mp4".to_string(),
            text_content: "should not appear".to_string(),
            category: ContentCategory::Video,
            binary: Some(vec![0u8, 1, 2, 3]),
            mime_type: Some("video/mp4".to_string()),
        });

        let body = serde_json::to_string(&wire).unwrap();
        assert!(body.contains("\"mimeType\":\"video/mp4\""));
        assert!(!body.contains("should not appear"));
        assert!(!body.contains("thinkingBudget"), "no reasoning hint for media");
    }

    #[test]
    fn test_structured_request_declares_schema() {
        let analyzer = analyzer("http://unused", OutputMode::Structured);
        let wire = analyzer.build_request(&document_request());

        let body = serde_json::to_string(&wire).unwrap();
        assert!(body.contains("\"responseMimeType\":\"application/json\""));
        assert!(body.contains("responseSchema"));
    }

    #[tokio::test]
    async fn test_structured_roundtrip() {
        let server = MockServer::start().await;
        let report_json = json!({
            "status": "warning",
            "title": "Liability Exposure",
            "summary": "Clause 7 leaves liability uncapped.",
            "risks": ["No liability cap"],
            "recommendations": ["Add cap clause"]
        });
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .and(body_string_contains("Clause 7 has no cap on liability."))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body(&report_json.to_string())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Structured);
        let result = analyzer.analyze(document_request()).await;

        assert_eq!(
            result,
            AnalysisResult::Structured(Report {
                status: ReportStatus::Warning,
                title: "Liability Exposure".to_string(),
                summary: "Clause 7 leaves liability uncapped.".to_string(),
                risks: vec!["No liability cap".to_string()],
                recommendations: vec!["Add cap clause".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_transient_failures_within_budget_recover() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("All good.")))
            .expect(1)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let result = analyzer.analyze(document_request()).await;

        assert_eq!(
            result,
            AnalysisResult::Freeform {
                markdown: "All good.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_exhausted_transport_yields_queued_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let result = analyzer.analyze(document_request()).await;

        match result {
            AnalysisResult::Freeform { markdown } => {
                assert!(markdown.contains("Connection Limit Reached"));
                assert!(markdown.contains("queued for backend analysis"));
            }
            other => panic!("expected freeform queued fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exhausted_transport_structured_mode_stays_structured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Structured);
        let result = analyzer.analyze(document_request()).await;

        match result {
            AnalysisResult::Structured(report) => {
                assert_eq!(report.status, ReportStatus::Neutral);
                assert_eq!(report.title, "Connection Limit Reached");
            }
            other => panic!("expected structured queued fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let result = analyzer.analyze(document_request()).await;

        match result {
            AnalysisResult::Freeform { markdown } => {
                assert!(markdown.contains("Analysis Error"));
                assert!(markdown.contains("contract.pdf"));
            }
            other => panic!("expected generic error result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_structured_garbage_output_falls_back_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("sorry, I cannot produce JSON")),
            )
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Structured);
        let result = analyzer.analyze(document_request()).await;

        match result {
            AnalysisResult::Structured(report) => {
                assert_eq!(report.status, ReportStatus::Neutral);
                assert_eq!(report.risks, vec!["Unknown processing error".to_string()]);
                assert_eq!(report.recommendations.len(), 1);
            }
            other => panic!("expected neutral fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_structured_empty_candidates_falls_back_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Structured);
        let result = analyzer.analyze(document_request()).await;

        match result {
            AnalysisResult::Structured(report) => {
                assert_eq!(report.status, ReportStatus::Neutral);
                assert_eq!(report.risks.len(), 1);
                assert_eq!(report.recommendations.len(), 1);
            }
            other => panic!("expected neutral fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_freeform_empty_output_substitutes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("")))
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let result = analyzer.analyze(document_request()).await;

        assert_eq!(
            result,
            AnalysisResult::Freeform {
                markdown: EMPTY_OUTPUT_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_query_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-3-flash-preview:generateContent"))
            .and(body_string_contains("What is the liability cap?"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(candidate_body("There is none.")),
            )
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let answer = analyzer
            .query("What is the liability cap?", "Clause 7 ...")
            .await;
        assert_eq!(answer, "There is none.");
    }

    #[tokio::test]
    async fn test_query_failure_returns_canned_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let analyzer = analyzer(&server.uri(), OutputMode::Freeform);
        let answer = analyzer.query("anything", "context").await;
        assert_eq!(answer, QUERY_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_query_retry_respects_config_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let config = PipelineConfig {
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
            },
            retry_queries: false,
            ..Default::default()
        };
        let client = GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
        });
        let analyzer = Analyzer::new(client, config);

        let answer = analyzer.query("anything", "context").await;
        assert_eq!(answer, QUERY_FAILED_MESSAGE);
    }

    #[test]
    fn test_parse_report_strips_fences() {
        let raw = "```json\n{\"status\":\"success\",\"title\":\"t\",\"summary\":\"s\",\
                   \"risks\":[],\"recommendations\":[]}\n```";
        let report = parse_report(raw).unwrap();
        assert_eq!(report.status, ReportStatus::Success);
    }
}

use std::path::Path;

use crate::analysis::{AnalysisResult, Analyzer, OutputMode};
use crate::config;
use crate::db::Database;
use crate::doc_processor::{self, DEFAULT_SNIPPET_CHARS};
use crate::llm::gemini::GeminiClient;

pub async fn run(
    db: &Database,
    path: &Path,
    structured: bool,
    text_only: bool,
) -> anyhow::Result<()> {
    let gemini = config::resolve_gemini(db)?;
    let mut pipeline = config::pipeline_config(db);
    if structured {
        pipeline.mode = OutputMode::Structured;
    }

    let request = doc_processor::prepare_file(path, text_only, DEFAULT_SNIPPET_CHARS)
        .map_err(anyhow::Error::msg)?;

    let analyzer = Analyzer::new(GeminiClient::new(gemini), pipeline);
    match analyzer.analyze(request).await {
        AnalysisResult::Freeform { markdown } => println!("{}", markdown),
        AnalysisResult::Structured(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?)
        }
    }
    Ok(())
}

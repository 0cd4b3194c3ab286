use std::io::Write;
use std::path::Path;

use crate::analysis::Analyzer;
use crate::config;
use crate::db::Database;
use crate::doc_processor::{self, DEFAULT_SNIPPET_CHARS};
use crate::llm::gemini::GeminiClient;

pub async fn run(
    db: &Database,
    path: &Path,
    question: &str,
    no_stream: bool,
) -> anyhow::Result<()> {
    let gemini = config::resolve_gemini(db)?;
    let pipeline = config::pipeline_config(db);

    // Queries ride on extracted text; media files have nothing to quote from.
    let request = doc_processor::prepare_file(path, true, DEFAULT_SNIPPET_CHARS)
        .map_err(anyhow::Error::msg)?;

    let analyzer = Analyzer::new(GeminiClient::new(gemini), pipeline);

    if no_stream {
        println!("{}", analyzer.query(question, &request.text_content).await);
        return Ok(());
    }

    let mut streamed = 0usize;
    let answer = analyzer
        .query_stream(question, &request.text_content, |delta| {
            streamed += delta.len();
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        })
        .await;

    if streamed == 0 {
        // Nothing arrived over the stream; the canned fallback or the
        // no-answer substitute is in the return value.
        println!("{}", answer);
    } else {
        println!();
    }
    Ok(())
}

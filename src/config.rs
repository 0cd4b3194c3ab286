//! Startup configuration: credential resolution and pipeline overrides.
//!
//! The credential is resolved once, before the pipeline is constructed; a
//! missing key refuses to start rather than surfacing mid-request.

use crate::analysis::{OutputMode, PipelineConfig};
use crate::db::Database;
use crate::llm::gemini::GeminiConfig;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Resolve the backend credential and endpoint: process environment first,
/// persisted settings second.
pub fn resolve_gemini(db: &Database) -> anyhow::Result<GeminiConfig> {
    resolve_gemini_with(
        std::env::var(API_KEY_ENV).ok(),
        std::env::var(BASE_URL_ENV).ok(),
        db,
    )
}

fn resolve_gemini_with(
    env_key: Option<String>,
    env_base_url: Option<String>,
    db: &Database,
) -> anyhow::Result<GeminiConfig> {
    let api_key = env_key
        .filter(|v| !v.is_empty())
        .or_else(|| db.get_setting("gemini_api_key").ok().flatten())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Gemini API key not configured. Set {} or run \
                 `worklens config set gemini_api_key <key>`.",
                API_KEY_ENV
            )
        })?;

    let mut config = GeminiConfig::new(api_key);
    if let Some(base_url) = env_base_url
        .filter(|v| !v.is_empty())
        .or_else(|| db.get_setting("gemini_base_url").ok().flatten())
    {
        config.base_url = base_url;
    }
    Ok(config)
}

/// Pipeline configuration with persisted overrides applied over defaults.
pub fn pipeline_config(db: &Database) -> PipelineConfig {
    let mut config = PipelineConfig::default();

    match db.get_setting("output_mode").ok().flatten().as_deref() {
        Some("structured") => config.mode = OutputMode::Structured,
        Some("freeform") | None => {}
        Some(other) => {
            tracing::warn!(value = other, "ignoring unknown output_mode setting");
        }
    }
    if let Some(value) = db.get_setting("retry_queries").ok().flatten() {
        config.retry_queries = value != "false";
    }
    if let Some(model) = db.get_setting("text_model").ok().flatten() {
        config.text_model = model;
    }
    if let Some(model) = db.get_setting("media_model").ok().flatten() {
        config.media_model = model;
    }
    if let Some(model) = db.get_setting("query_model").ok().flatten() {
        config.query_model = model;
    }

    config
}

//! Instruction blocks sent to the model, and the structured-output schema.
//!
//! Uses `{placeholder}` substitution; callers fill the slots per request.

use serde_json::json;

/// Freeform critique instructions. The model answers in a fixed Markdown
/// section layout the UI renders directly.
pub const FREEFORM_PROMPT: &str = r#"You are WorkLens, an elite Universal Analyst.
Target File: "{file_name}"
{context}

YOUR MISSION:
1. DETECT the domain immediately (Is this a Legal Contract? Engineering Spec? Investment Deck? Fiction Manuscript? Academic Paper?).
2. ADOPT the persona of the harshest, most expensive consultant in that field.
3. CRITIQUE the content. Do not just summarize. Tear it apart. Find the holes.

STRICT OUTPUT FORMAT (Markdown):
Render your response in clean Markdown. Follow this structure exactly, adapting the bracketed terms to the detected domain:

# 1. The Verdict (Big Picture)
*   **Document Type:** [e.g., Series A Term Sheet / MRI Report / Screenplay]
*   **Intended Audience:** [Who is this for?]
*   **Quality Score:** [Rate 1-10 based on clarity and completeness]
*   **Bottom Line:** [One brutal sentence summary.]

# 2. Deep Dive Analysis (Section by Section)
(Identify the top 3 critical themes/clauses/chapters and analyze them with high intensity:)

## [Theme/Section Name]
**The Strong Points:**
*   [What is accurate, well-written, or advantageous?]

**The Gaps & Weaknesses (CRITICAL):**
*   [What is missing? What is vague? Where is the logic flawed?]

**The "Pro" Insight:**
*   [The secret sauce. A strategic tip, a negotiation counter-move, or an exam tip depending on context.]

(Repeat for 2-3 more key sections)

# 3. Final Action Plan
*   **Immediate Action:** [The very next thing the user must do]
*   **Hidden Risk:** [The biggest "Gotcha" in the file]"#;

/// Structured critique instructions. The response schema is enforced
/// separately via the generation config; the prompt restates the shape so
/// the model fills every field with intent.
pub const STRUCTURED_PROMPT: &str = r#"You are WorkLens, an elite Universal Analyst.
Target File: "{file_name}"
{context}

YOUR MISSION:
1. DETECT the domain immediately (Legal Contract? Engineering Spec? Investment Deck? Manuscript? Academic Paper?).
2. ADOPT the persona of the harshest, most expensive consultant in that field.
3. CRITIQUE the content. Do not just summarize. Find the holes.

Respond with a single JSON object:
- "status": overall verdict, one of "conflict", "success", "warning", "neutral"
- "title": short headline for the finding
- "summary": one-paragraph brutal assessment
- "risks": the concrete gaps, traps, and exposures you found, worst first
- "recommendations": the actions the user must take, most urgent first"#;

/// Contextual query instructions for the lighter chat model.
pub const QUERY_PROMPT: &str = r#"System: You are WorkLens, a ruthless and precise Deal Intelligence Analyst.
Document Context: {context}
User Query: {query}

Response Protocol: Be concise. Focus on financial impact and legal risk. Use bullet points if listing items."#;

const CONTEXT_PREVIEW: &str = r#"Context Preview (Full analysis pending on backend): "{snippet}""#;

/// Build the analysis instruction block. When the request carries an inline
/// binary payload the snippet is omitted; the model reads the file itself.
pub fn analysis_prompt(template: &str, file_name: &str, snippet: Option<&str>) -> String {
    let context = match snippet {
        Some(text) => CONTEXT_PREVIEW.replace("{snippet}", text),
        None => String::new(),
    };
    template
        .replace("{file_name}", file_name)
        .replace("{context}", &context)
}

pub fn query_prompt(query: &str, context: &str) -> String {
    QUERY_PROMPT
        .replace("{context}", context)
        .replace("{query}", query)
}

/// Response schema for structured mode, in the backend's OpenAPI-style
/// schema dialect. Every field is required; `status` is constrained to the
/// four admissible verdicts.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "status": {
                "type": "STRING",
                "enum": ["conflict", "success", "warning", "neutral"]
            },
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "risks": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "recommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["status", "title", "summary", "risks", "recommendations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_inlined_with_pending_note() {
        let prompt = analysis_prompt(
            FREEFORM_PROMPT,
            "contract.pdf",
            Some("Clause 7 has no cap on liability."),
        );
        assert!(prompt.contains("Target File: \"contract.pdf\""));
        assert!(prompt.contains("Clause 7 has no cap on liability."));
        assert!(prompt.contains("Full analysis pending on backend"));
    }

    #[test]
    fn test_no_snippet_when_payload_is_inline() {
        let prompt = analysis_prompt(STRUCTURED_PROMPT, "pitch.mp4", None);
        assert!(prompt.contains("Target File: \"pitch.mp4\""));
        assert!(!prompt.contains("Context Preview"));
    }

    #[test]
    fn test_schema_constrains_status() {
        let schema = response_schema();
        let status_enum = &schema["properties"]["status"]["enum"];
        assert_eq!(
            status_enum,
            &serde_json::json!(["conflict", "success", "warning", "neutral"])
        );
        assert_eq!(schema["required"].as_array().unwrap().len(), 5);
    }
}

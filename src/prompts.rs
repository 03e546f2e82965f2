//! Prompts for LLM-backed summary extraction.
//!
//! Every prompt lives here so it can be inspected by unit tests without a
//! live model. Callers can override the system prompt through
//! [`crate::config::SummaryConfig::system_prompt`]; the constant below is used
//! only when no override is provided.

use crate::pipeline::chunk::Chunk;

/// Default system prompt describing the JSON shape the extractor must return.
///
/// The keys mirror [`crate::summary::MedicalSummary`] exactly; anything else
/// is rejected as a malformed extraction.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a medical records analyst preparing a disability claim summary. You will receive excerpts of a claimant's medical case file, each tagged with the page it came from.

Return ONE JSON object and nothing else, with exactly these keys:

{
  "profile": {
    "claimant_name": string or null,
    "ssn": string or null,
    "date_of_birth": "YYYY-MM-DD" or null,
    "alleged_onset_date": "YYYY-MM-DD" or null,
    "date_last_insured": "YYYY-MM-DD" or null,
    "age_at_aod": integer or null,
    "current_age": integer or null,
    "education": string or null,
    "claim_title": string or null,
    "notes": string or null
  },
  "events": [
    {"date": "YYYY-MM-DD" or null, "provider": string or null, "reason": string or null, "reference": "page n/m" or null}
  ],
  "custom_tables": {
    "<table name>": [ {"<column>": string, number, boolean or null} ]
  }
}

Rules:
1. Use null for anything the excerpts do not state. Never guess.
2. List events in chronological order. Use the excerpt's page tag as the reference.
3. Every row of a custom table must use the same column names.
4. Produce custom tables only when the additional instructions ask for them; otherwise use {}.
5. Do NOT wrap the JSON in ```json fences and do NOT add commentary."#;

/// Render chunks as page-tagged excerpts for the user message.
pub fn render_excerpts(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        match chunk.page_label() {
            Some(label) => out.push_str(&format!("[page {label}]\n")),
            None => out.push_str(&format!("[excerpt {}]\n", i + 1)),
        }
        out.push_str(chunk.text.trim());
    }
    out
}

/// Build the full user message: excerpts plus the optional custom instruction.
pub fn user_prompt(chunks: &[Chunk], instruction: Option<&str>) -> String {
    let excerpts = render_excerpts(chunks);
    match instruction.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!(
            "Case file excerpts:\n\n{excerpts}\n\nAdditional instructions:\n\"\"\"{extra}\"\"\""
        ),
        None => format!("Case file excerpts:\n\n{excerpts}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pages::Metadata;

    fn chunk(text: &str, label: Option<&str>) -> Chunk {
        let mut metadata = Metadata::new();
        if let Some(l) = label {
            metadata.insert("page_label".into(), l.into());
        }
        Chunk {
            text: text.into(),
            metadata,
            start: 0,
            overlap: 0,
        }
    }

    #[test]
    fn system_prompt_names_every_top_level_key() {
        for key in ["\"profile\"", "\"events\"", "\"custom_tables\"", "age_at_aod"] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(key), "missing {key}");
        }
    }

    #[test]
    fn excerpts_are_tagged_with_page_labels() {
        let text = render_excerpts(&[
            chunk("MRI lumbar spine", Some("12/504")),
            chunk(" free ", None),
        ]);
        assert_eq!(text, "[page 12/504]\nMRI lumbar spine\n\n[excerpt 2]\nfree");
    }

    #[test]
    fn blank_instruction_is_omitted() {
        let chunks = [chunk("x", Some("1/1"))];
        assert!(!user_prompt(&chunks, Some("   ")).contains("Additional instructions"));
        let with = user_prompt(&chunks, Some("Add an Education History table"));
        assert!(with.ends_with("\"\"\"Add an Education History table\"\"\""));
    }
}

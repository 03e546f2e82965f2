//! Pipeline stages for PDF-to-summary extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pages ──▶ normalize ──▶ chunk ──▶ extract ──▶ MedicalSummary
//! (URL/path) (lopdf)   (markdown)   (windows)  (strategy)
//!                                                 │
//!                                                 └── llm (backend chain)
//! ```
//!
//! 1. [`input`]     canonicalise the user-supplied path or URL to a local file
//! 2. [`pages`]     read each page's text layer; runs in `spawn_blocking`
//! 3. [`normalize`] HTML/plain text to clean markdown
//! 4. [`chunk`]     overlapping windows that keep page provenance
//! 5. [`extract`]   the pluggable strategy producing summary-shaped JSON
//! 6. [`llm`]       completion backends with retry/backoff and fallback;
//!    the only stage with network I/O besides URL download

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod pages;

//! Report rendering: a [`MedicalSummary`] into `medical_summary.md` and
//! `medical_summary.docx`.
//!
//! The renderer only reads the summary. Both writers overwrite existing
//! files; a failed write leaves a file that should be treated as invalid.

pub mod docx;
pub mod format;
pub mod markdown;
pub mod styles;

use crate::config::DEFAULT_TABLE_STYLE;
use crate::error::SummaryError;
use crate::summary::MedicalSummary;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the markdown report.
pub const MARKDOWN_FILE: &str = "medical_summary.md";
/// File name of the DOCX report.
pub const DOCX_FILE: &str = "medical_summary.docx";

/// Where the reports of one run were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub docx: PathBuf,
}

/// Writes reports into one output directory.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    output_dir: PathBuf,
    table_style: String,
}

impl ReportRenderer {
    /// Create the renderer, creating `output_dir` and its parents.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, SummaryError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| SummaryError::render(&output_dir, e))?;
        Ok(Self {
            output_dir,
            table_style: DEFAULT_TABLE_STYLE.to_string(),
        })
    }

    pub fn with_table_style(mut self, style: impl Into<String>) -> Self {
        self.table_style = style.into();
        self
    }

    /// Write `medical_summary.md`.
    pub fn write_markdown(&self, summary: &MedicalSummary) -> Result<PathBuf, SummaryError> {
        let path = self.output_dir.join(MARKDOWN_FILE);
        std::fs::write(&path, markdown::render(summary))
            .map_err(|e| SummaryError::render(&path, e))?;
        info!("Markdown report written to {}", path.display());
        Ok(path)
    }

    /// Write `medical_summary.docx`, appending to `template` when given.
    pub fn write_docx(
        &self,
        summary: &MedicalSummary,
        template: Option<&Path>,
    ) -> Result<PathBuf, SummaryError> {
        let path = self.output_dir.join(DOCX_FILE);
        docx::write_docx(summary, &path, template, &self.table_style)?;
        info!("DOCX report written to {}", path.display());
        Ok(path)
    }

    /// Write both reports.
    pub fn write_all(
        &self,
        summary: &MedicalSummary,
        template: Option<&Path>,
    ) -> Result<ReportPaths, SummaryError> {
        Ok(ReportPaths {
            markdown: self.write_markdown(summary)?,
            docx: self.write_docx(summary, template)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_output_dir_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("outputs/reports/case-1");
        let renderer = ReportRenderer::new(&dir).unwrap();
        assert!(dir.is_dir());

        std::fs::write(dir.join(MARKDOWN_FILE), "stale").unwrap();
        let paths = renderer.write_all(&MedicalSummary::default(), None).unwrap();
        let md = std::fs::read_to_string(&paths.markdown).unwrap();
        assert!(md.starts_with("# Medical Summary"));
        assert_eq!(paths.docx, dir.join(DOCX_FILE));
        assert!(std::fs::metadata(&paths.docx).unwrap().len() > 0);
    }

    #[test]
    fn uncreatable_output_dir_is_render_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "x").unwrap();
        let err = ReportRenderer::new(file.join("sub")).unwrap_err();
        assert!(matches!(err, SummaryError::RenderFailure { .. }));
    }
}

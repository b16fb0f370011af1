// Markdown report writer.
//
// Consumes the ordered findings plus run metadata and writes one
// timestamped report per run into the reports directory. The report is
// only written after a successful, uncancelled analysis.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::Finding;

/// Run metadata the report needs besides the findings.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Account the posts were fetched from (username, no @)
    pub subject: String,
    /// Number of posts analyzed
    pub items_analyzed: usize,
    pub generated_at: DateTime<Utc>,
}

/// Render the report as Markdown.
pub fn render(findings: &[Finding], meta: &ReportMeta) -> String {
    let mut md = String::new();

    let _ = writeln!(
        md,
        "# Next Sight AI generated report for x.com account\n\n## @{}\n",
        meta.subject
    );
    let _ = writeln!(
        md,
        "Generated: {}\n",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(md, "**Number of Posts Analyzed:** {}\n", meta.items_analyzed);

    if findings.is_empty() {
        md.push_str("No suspicious activity detected.\n");
        return md;
    }

    md.push_str("## Detailed Flagged Posts\n\n");
    for (i, finding) in findings.iter().enumerate() {
        let _ = writeln!(md, "### Flagged Post {}\n", i + 1);
        let _ = writeln!(md, "- **Category:** {}", finding.category);
        if let Some(at) = finding.created_at {
            let _ = writeln!(md, "- **Posted:** {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
        let _ = writeln!(md, "- **Toxicity Score:** {:.2}", finding.score);
        let _ = writeln!(md, "- **Content:**\n");
        for line in finding.source_text.lines() {
            let _ = writeln!(md, "> {line}");
        }
        md.push('\n');
    }

    md
}

/// Write the report into `reports_dir` and return its path.
pub fn generate(findings: &[Finding], meta: &ReportMeta, reports_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(reports_dir).with_context(|| {
        format!("Failed to create reports directory {}", reports_dir.display())
    })?;

    let file_name = format!("report_{}.md", meta.generated_at.format("%Y%m%d-%H%M%S"));
    let path = reports_dir.join(file_name);

    std::fs::write(&path, render(findings, meta))
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    info!(path = %path.display(), findings = findings.len(), "Report written");
    Ok(path)
}

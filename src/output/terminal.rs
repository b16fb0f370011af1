// Colored terminal summary of an analysis run.

use colored::Colorize;

use crate::models::Finding;
use crate::pipeline::GENERAL_TOXICITY;

/// Per-category finding counts, in first-seen order.
pub fn category_counts(findings: &[Finding]) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for f in findings {
        match counts.iter_mut().find(|(c, _)| *c == f.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((f.category.as_str(), 1)),
        }
    }
    counts
}

/// Print a short summary: totals, counts per category, and the top findings.
pub fn display_summary(subject: &str, items_analyzed: usize, findings: &[Finding]) {
    println!(
        "\n{}",
        format!("=== Analysis of @{subject} ({items_analyzed} posts) ===").bold()
    );

    if findings.is_empty() {
        println!("  {}", "No suspicious activity detected.".green());
        return;
    }

    println!("  {} findings\n", findings.len().to_string().bold());
    for (category, n) in category_counts(findings) {
        let label = if category == GENERAL_TOXICITY {
            category.red().bold()
        } else {
            category.yellow()
        };
        println!("  {:<28} {:>4}", label, n);
    }

    let mut top: Vec<&Finding> = findings.iter().collect();
    // Stable sort keeps creation order among equal scores.
    top.sort_by(|a, b| b.score.total_cmp(&a.score));

    println!("\n  Highest-scoring findings:");
    for (i, f) in top.iter().take(5).enumerate() {
        println!(
            "    {}. [{:.2}] {:<20} {}",
            i + 1,
            f.score,
            f.category,
            super::truncate_chars(&f.source_text, 80).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: &str) -> Finding {
        Finding {
            item_id: "1".into(),
            created_at: None,
            source_text: "text".into(),
            category: category.into(),
            score: 0.5,
        }
    }

    #[test]
    fn counts_keep_first_seen_order() {
        let findings = vec![
            finding("Spam"),
            finding("General Toxicity"),
            finding("Spam"),
        ];
        assert_eq!(
            category_counts(&findings),
            vec![("Spam", 2), ("General Toxicity", 1)]
        );
    }
}

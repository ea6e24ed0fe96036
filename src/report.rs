//! Markdown rendering of analyses and comparisons.
//!
//! All functions are pure: they read only the typed model and return the
//! document text. Dates come from the rendered value's `created_at`.

use std::path::Path;

use crate::models::{Analysis, Comparison, ComparisonItem, Quadrant, StrategicPair, CHANGE_TYPES};

/// Full analysis report: one table per quadrant, then the four strategic
/// pairing tables.
pub fn render_analysis(analysis: &Analysis) -> String {
    let mut md = format!(
        "# SWOT analysis: {}\n\n**Date:** {}\n\n**Context:** `{}`\n\n---\n",
        analysis.source_identifier,
        analysis.created_at.format("%Y-%m-%d %H:%M"),
        analysis.context_fingerprint
    );

    for q in Quadrant::ALL {
        md.push_str(&format!(
            "\n## {}\n\n| # | Item | Reasoning |\n|---|------|-----------|\n",
            q.title()
        ));
        for (idx, item) in analysis.items(q).iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                idx + 1,
                cell(&item.text),
                cell(&item.reasoning)
            ));
        }
    }

    md.push_str("\n---\n\n## Strategic pairing\n");
    pair_table(&mut md, "S+O (offensive)", ["Strength", "Opportunity"], &analysis.strategic_so);
    pair_table(&mut md, "W+O (improvement)", ["Weakness", "Opportunity"], &analysis.strategic_wo);
    pair_table(&mut md, "S+T (defensive)", ["Strength", "Threat"], &analysis.strategic_st);

    md.push_str(
        "\n### W+T (risk minimisation)\n\n\
         | Weakness | Threat | Risk | Strategy |\n\
         |----------|--------|------|----------|\n",
    );
    for pair in &analysis.strategic_wt {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cell(&pair.factor1),
            cell(&pair.factor2),
            pair.risk.as_deref().map(cell).unwrap_or_else(|| "-".to_string()),
            cell(&pair.strategy)
        ));
    }

    md
}

fn pair_table(md: &mut String, title: &str, headers: [&str; 2], pairs: &[StrategicPair]) {
    md.push_str(&format!(
        "\n### {}\n\n| {} | {} | Strategy |\n|---|---|----------|\n",
        title, headers[0], headers[1]
    ));
    for pair in pairs {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            cell(&pair.factor1),
            cell(&pair.factor2),
            cell(&pair.strategy)
        ));
    }
}

fn change_heading(change_type: &str) -> &'static str {
    match change_type {
        "improved" => "✅ Improved",
        "new" => "🆕 New",
        "worsened" => "⚠️ Worsened",
        "lost" => "❌ Lost",
        _ => "Unclassified",
    }
}

/// Comparison report: summary, then one table per change type present in
/// the order improved, new, worsened, lost. Items with any other change
/// type go to a trailing "Unclassified" table.
pub fn render_comparison(comparison: &Comparison) -> String {
    let mut md = format!(
        "# SWOT comparison\n\n**Date:** {}\n\n**Analyses:** #{} → #{}\n\n---\n\n\
         ## Main conclusion\n\n{}\n\n---\n\n## Changes\n\n",
        comparison.created_at.format("%Y-%m-%d %H:%M"),
        comparison.old_analysis_id,
        comparison.new_analysis_id,
        comparison.summary
    );

    for change_type in CHANGE_TYPES {
        let items: Vec<&ComparisonItem> = comparison
            .items
            .iter()
            .filter(|i| i.change_type == change_type)
            .collect();
        change_table(&mut md, change_heading(change_type), &items, false);
    }

    let unclassified: Vec<&ComparisonItem> = comparison
        .items
        .iter()
        .filter(|i| !CHANGE_TYPES.contains(&i.change_type.as_str()))
        .collect();
    change_table(&mut md, change_heading(""), &unclassified, true);

    md
}

fn change_table(md: &mut String, heading: &str, items: &[&ComparisonItem], with_type: bool) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("### {}\n\n", heading));
    if with_type {
        md.push_str("| Type | Category | Was | Now | Reasoning |\n");
        md.push_str("|------|----------|-----|-----|-----------|\n");
    } else {
        md.push_str("| Category | Was | Now | Reasoning |\n");
        md.push_str("|----------|-----|-----|-----------|\n");
    }
    for item in items {
        let prefix = if with_type {
            format!("| {} ", cell(&item.change_type))
        } else {
            String::new()
        };
        md.push_str(&format!(
            "{}| {} | {} | {} | {} |\n",
            prefix,
            cell(&item.category),
            item.old_text.as_deref().map(cell).unwrap_or_else(|| "-".to_string()),
            item.new_text.as_deref().map(cell).unwrap_or_else(|| "-".to_string()),
            cell(&item.reasoning)
        ));
    }
    md.push('\n');
}

/// Condensed pull-request comment: counts, collapsible factor lists, and
/// the change counts plus summary when a comparison exists.
pub fn render_summary(
    analysis: &Analysis,
    comparison: Option<&Comparison>,
    report_path: &Path,
) -> String {
    let mut md = format!(
        "## 🎯 SWOT analysis: `{}`\n\n### 📊 Result\n\n| Category | Count |\n|----------|-------|\n",
        analysis.source_identifier
    );
    for (q, icon) in Quadrant::ALL.iter().zip(["💪", "😰", "🚀", "⚠️"]) {
        md.push_str(&format!(
            "| {} {} | {} |\n",
            icon,
            q.title(),
            analysis.items(*q).len()
        ));
    }
    md.push('\n');

    for q in Quadrant::ALL {
        md.push_str(&format!("<details>\n<summary>📋 {}</summary>\n\n", q.title()));
        for item in analysis.items(q) {
            md.push_str(&format!("- **{}**\n", flatten(&item.text)));
        }
        md.push_str("\n</details>\n\n");
    }

    if let Some(comparison) = comparison.filter(|c| !c.items.is_empty()) {
        md.push_str(
            "\n---\n\n### 🔄 Compared with the previous analysis\n\n\
             | Change | Count |\n|--------|-------|\n",
        );
        for change_type in CHANGE_TYPES {
            md.push_str(&format!(
                "| {} | {} |\n",
                change_heading(change_type),
                comparison.count(change_type)
            ));
        }
        md.push_str(&format!("\n**Conclusion:** {}\n", comparison.summary));
    }

    md.push_str(&format!(
        "\n---\n\n📄 Full report: `{}`\n",
        report_path.display()
    ));
    md
}

/// Escape pipes and flatten newlines so a value stays in one table cell.
fn cell(text: &str) -> String {
    flatten(text).replace('|', "\\|")
}

fn flatten(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

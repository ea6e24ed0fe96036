//! Fixed system instruction and the per-step prompt templates.
//!
//! Placeholders are `{name}` and are filled by [`crate::llm::render_template`].
//! JSON examples inside templates need no escaping: braces that do not name a
//! supplied variable are copied through unchanged.

use crate::llm::Prompt;

/// Shared system instruction. `{language}` comes from `llm.language`.
pub const SYSTEM: &str = "You are an expert in strategic business analysis.
Your task is to produce a thorough SWOT analysis. Answer in {language}.

IMPORTANT:
- S and W are INTERNAL factors (what the company controls)
- O and T are EXTERNAL factors (market, competitors, trends)
- Every item must be concrete and justified
- Reply ONLY with valid JSON, without markdown fences";

pub const INTERNAL_FACTORS: Prompt = Prompt {
    name: "internal_factors",
    system: SYSTEM,
    template: "Analyse the text and identify the INTERNAL strengths and weaknesses.

COMPANY CONTEXT:
{context}

TEXT TO ANALYSE:
{text}

Reply strictly in JSON:
{
    \"strengths\": [{\"text\": \"...\", \"reasoning\": \"...\"}],
    \"weaknesses\": [{\"text\": \"...\", \"reasoning\": \"...\"}]
}

At least 5 items in each category.",
};

pub const SEARCH_QUERIES: Prompt = Prompt {
    name: "search_queries",
    system: SYSTEM,
    template: "Write 3-5 web search queries for finding opportunities and threats.

COMPANY CONTEXT:
{context}

Reply in JSON:
{
    \"queries\": [\"query 1\", \"query 2\", \"query 3\"]
}",
};

pub const EXTERNAL_FACTORS: Prompt = Prompt {
    name: "external_factors",
    system: SYSTEM,
    template: "Identify the EXTERNAL opportunities and threats.

COMPANY CONTEXT:
{context}

MARKET RESEARCH RESULTS:
{search_results}

Reply in JSON:
{
    \"opportunities\": [{\"text\": \"...\", \"reasoning\": \"...\"}],
    \"threats\": [{\"text\": \"...\", \"reasoning\": \"...\"}]
}

At least 5 items in each category.",
};

pub const STRATEGIC_PAIRS: Prompt = Prompt {
    name: "strategic_pairs",
    system: SYSTEM,
    template: "Match the SWOT factors into strategic pairs.

STRENGTHS:
{strengths}

WEAKNESSES:
{weaknesses}

OPPORTUNITIES:
{opportunities}

THREATS:
{threats}

Reply in JSON:
{
    \"so\": [{\"factor1\": \"Strength\", \"factor2\": \"Opportunity\", \"strategy\": \"...\"}],
    \"wo\": [{\"factor1\": \"Weakness\", \"factor2\": \"Opportunity\", \"strategy\": \"...\"}],
    \"st\": [{\"factor1\": \"Strength\", \"factor2\": \"Threat\", \"strategy\": \"...\"}],
    \"wt\": [{\"factor1\": \"Weakness\", \"factor2\": \"Threat\", \"strategy\": \"...\", \"risk\": \"...\"}]
}

At least 3 pairs in each category.",
};

pub const COMPARISON: Prompt = Prompt {
    name: "comparison",
    system: SYSTEM,
    template: "Compare two SWOT analyses.

PREVIOUS SWOT:
{old_swot}

NEW SWOT:
{new_swot}

SIMILAR PAIRS (similarity >= {threshold}):
{similar_pairs}

Classify every change:
- improved: got better
- worsened: got worse
- lost: disappeared (explain why!)
- new: newly appeared

Reply in JSON:
{
    \"items\": [{
        \"old_text\": \"...\" or null,
        \"new_text\": \"...\" or null,
        \"change_type\": \"improved|worsened|lost|new\",
        \"reasoning\": \"Detailed justification\",
        \"category\": \"S|W|O|T\"
    }],
    \"summary\": \"Main conclusion\"
}",
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{extract_json, render_template};

    #[test]
    fn templates_keep_json_examples_after_rendering() {
        let out = render_template(
            INTERNAL_FACTORS.template,
            &[("context", "ACME"), ("text", "report")],
        );
        assert!(out.contains("ACME"));
        assert!(out.contains("report"));
        let example = extract_json(&out).unwrap();
        assert!(example["strengths"].is_array());
    }

    #[test]
    fn system_names_language() {
        let out = render_template(SYSTEM, &[("language", "German")]);
        assert!(out.contains("Answer in German."));
    }
}

//! Core data models used throughout SWOT Harness.
//!
//! These types represent the factors, strategic pairs, analyses, and
//! comparisons that flow through the analysis and comparison pipelines.
//! Values are produced once by a pipeline run and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic fingerprint of company-context text: the first 16 hex
/// characters of its SHA-256.
pub fn context_fingerprint(context_text: &str) -> String {
    let digest = Sha256::digest(context_text.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(16);
    hex
}

/// Current time at millisecond precision, the resolution timestamps are
/// stored with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// One factor in the Strength/Weakness/Opportunity/Threat sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotItem {
    pub text: String,
    pub reasoning: String,
}

impl SwotItem {
    pub fn new(text: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// A model-proposed combination of two factors with a recommended strategy.
///
/// `risk` is only populated for Weakness + Threat pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicPair {
    pub factor1: String,
    pub factor2: String,
    pub strategy: String,
    #[serde(default)]
    pub risk: Option<String>,
}

/// SWOT quadrant of a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl Quadrant {
    /// Fixed S, W, O, T order used for flattening and rendering.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Strengths,
        Quadrant::Weaknesses,
        Quadrant::Opportunities,
        Quadrant::Threats,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Quadrant::Strengths => "strengths",
            Quadrant::Weaknesses => "weaknesses",
            Quadrant::Opportunities => "opportunities",
            Quadrant::Threats => "threats",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Quadrant::Strengths => "Strengths",
            Quadrant::Weaknesses => "Weaknesses",
            Quadrant::Opportunities => "Opportunities",
            Quadrant::Threats => "Threats",
        }
    }
}

/// A completed SWOT analysis of one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Identifier of the analysed source (file name).
    pub source_identifier: String,
    pub source_text: String,
    /// Deterministic hash of the company context the analysis ran with.
    pub context_fingerprint: String,
    pub strengths: Vec<SwotItem>,
    pub weaknesses: Vec<SwotItem>,
    pub opportunities: Vec<SwotItem>,
    pub threats: Vec<SwotItem>,
    pub strategic_so: Vec<StrategicPair>,
    pub strategic_wo: Vec<StrategicPair>,
    pub strategic_st: Vec<StrategicPair>,
    pub strategic_wt: Vec<StrategicPair>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    pub fn items(&self, quadrant: Quadrant) -> &[SwotItem] {
        match quadrant {
            Quadrant::Strengths => &self.strengths,
            Quadrant::Weaknesses => &self.weaknesses,
            Quadrant::Opportunities => &self.opportunities,
            Quadrant::Threats => &self.threats,
        }
    }

    /// All factor texts in S, W, O, T order.
    pub fn flat_texts(&self) -> Vec<String> {
        Quadrant::ALL
            .iter()
            .flat_map(|q| self.items(*q).iter().map(|i| i.text.clone()))
            .collect()
    }
}

/// An analysis together with its storage identity.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: i64,
    pub analysis: Analysis,
}

/// The four change categories the comparison prompt asks the model for,
/// in report display order.
pub const CHANGE_TYPES: [&str; 4] = ["improved", "new", "worsened", "lost"];

/// One classified change between two analyses.
///
/// `change_type` and `category` are whatever the model returned; they are
/// not validated against [`CHANGE_TYPES`] or the S/W/O/T letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub change_type: String,
    pub reasoning: String,
    pub category: String,
}

impl ComparisonItem {
    /// A missing `old_text` implies `new`, a missing `new_text` implies `lost`.
    pub fn is_consistent(&self) -> bool {
        match (&self.old_text, &self.new_text) {
            (None, None) => false,
            (None, Some(_)) => self.change_type == "new",
            (Some(_), None) => self.change_type == "lost",
            (Some(_), Some(_)) => true,
        }
    }
}

/// Classified delta between a previous and a current analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub old_analysis_id: i64,
    pub new_analysis_id: i64,
    pub items: Vec<ComparisonItem>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl Comparison {
    pub fn count(&self, change_type: &str) -> usize {
        self.items
            .iter()
            .filter(|i| i.change_type == change_type)
            .count()
    }
}

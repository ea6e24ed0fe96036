//! # SWOT Harness
//!
//! Model-driven SWOT analysis of a source document, with run-over-run
//! comparison.
//!
//! A run extracts internal factors (strengths, weaknesses) from the
//! document, researches the market through web search, extracts external
//! factors (opportunities, threats), and pairs them into strategies. When a
//! previous analysis is stored, the two runs' factors are aligned by
//! embedding similarity and the model classifies every change.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ source.md  │──▶│ AnalysisPipeline │──▶│  SQLite  │
//! │ context.md │   │  LLM + search    │   │ analyses │
//! └────────────┘   └──────────────────┘   └────┬─────┘
//!                                              │ previous
//!                  ┌────────────────────┐      │
//!                  │ ComparisonPipeline │◀─────┘
//!                  │ align + classify   │
//!                  └─────────┬──────────┘
//!                            ▼
//!                   Markdown reports
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! swot init
//! swot analyze reports/q3.md --context context.md --comment-file pr_comment.md
//! swot history
//! swot show 2 --comparison
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`decode`] | Tolerant JSON → model decoding |
//! | [`llm`] | Language model client, JSON extraction, retry |
//! | [`prompts`] | System instruction and step templates |
//! | [`search`] | Web search collaborator |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`align`] | Similarity alignment between runs |
//! | [`pipeline`] | Analysis pipeline |
//! | [`compare`] | Comparison pipeline |
//! | [`store`] | Persistence of contexts, analyses, comparisons |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`report`] | Markdown rendering |
//! | [`progress`] | Run progress on stderr |
//! | [`analyze`] | `swot analyze` orchestration |
//! | [`history`] | `history`, `show`, `compare` commands |

pub mod align;
pub mod analyze;
pub mod compare;
pub mod config;
pub mod db;
pub mod decode;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod search;
pub mod store;

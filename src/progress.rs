//! Run progress reporting.
//!
//! Narrates an `analyze` or `compare` run step by step so users can see
//! which model call is in flight. Progress is emitted on **stderr** so
//! stdout stays reserved for command results.

use std::io::Write;
use std::path::PathBuf;

/// Model-mediated step of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    InternalFactors,
    SearchQueries,
    Research,
    ExternalFactors,
    StrategicPairs,
    Comparison,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::InternalFactors => "internal_factors",
            Phase::SearchQueries => "search_queries",
            Phase::Research => "research",
            Phase::ExternalFactors => "external_factors",
            Phase::StrategicPairs => "strategic_pairs",
            Phase::Comparison => "comparison",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Phase::InternalFactors => "extracting strengths and weaknesses",
            Phase::SearchQueries => "formulating search queries",
            Phase::Research => "researching the market",
            Phase::ExternalFactors => "extracting opportunities and threats",
            Phase::StrategicPairs => "matching strategic pairs",
            Phase::Comparison => "comparing with the previous analysis",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A run over `source` has begun.
    Started { source: String },
    PhaseStarted(Phase),
    /// Query `n` of `total` is being searched.
    Searching {
        query: String,
        n: usize,
        total: usize,
    },
    /// A phase completed; `detail` is a short result summary such as `S: 5, W: 5`.
    PhaseFinished { phase: Phase, detail: String },
    Saved { kind: &'static str, id: i64 },
    ReportWritten { path: PathBuf },
}

/// Receives progress events. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: `swot  research  query 2/3: ...`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Started { source } => format!("swot  analysing {}\n", source),
            ProgressEvent::PhaseStarted(phase) => format!("swot  {}...\n", phase.label()),
            ProgressEvent::Searching { query, n, total } => {
                format!("swot  search {}/{}: {}\n", n, total, query)
            }
            ProgressEvent::PhaseFinished { phase, detail } => {
                format!("swot  {} done  {}\n", phase.as_str(), detail)
            }
            ProgressEvent::Saved { kind, id } => format!("swot  saved {} id={}\n", kind, id),
            ProgressEvent::ReportWritten { path } => {
                format!("swot  wrote {}\n", path.display())
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = to_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn to_json(event: &ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::Started { source } => serde_json::json!({
            "event": "started",
            "source": source
        }),
        ProgressEvent::PhaseStarted(phase) => serde_json::json!({
            "event": "phase_started",
            "phase": phase.as_str()
        }),
        ProgressEvent::Searching { query, n, total } => serde_json::json!({
            "event": "searching",
            "phase": Phase::Research.as_str(),
            "query": query,
            "n": n,
            "total": total
        }),
        ProgressEvent::PhaseFinished { phase, detail } => serde_json::json!({
            "event": "phase_finished",
            "phase": phase.as_str(),
            "detail": detail
        }),
        ProgressEvent::Saved { kind, id } => serde_json::json!({
            "event": "saved",
            "kind": kind,
            "id": id
        }),
        ProgressEvent::ReportWritten { path } => serde_json::json!({
            "event": "report_written",
            "path": path.display().to_string()
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    #[default]
    Human,
    Json,
}

impl ProgressMode {
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_events_carry_phase_names() {
        let v = to_json(&ProgressEvent::Searching {
            query: "eu fintech".into(),
            n: 2,
            total: 3,
        });
        assert_eq!(v["event"], "searching");
        assert_eq!(v["phase"], "research");
        assert_eq!(v["n"], 2);

        let v = to_json(&ProgressEvent::PhaseFinished {
            phase: Phase::InternalFactors,
            detail: "S: 5, W: 5".into(),
        });
        assert_eq!(v["phase"], "internal_factors");
        assert_eq!(v["detail"], "S: 5, W: 5");
    }
}

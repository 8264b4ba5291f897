//! Aggregated outcome of a batch or corpus run.

use super::repro::ReproBundle;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Runners agree and match the expectation, if any.
    Pass,
    /// Runners disagree, or agree on the wrong value.
    Fail {
        /// What was wanted.
        expected: String,
        /// What was produced.
        actual: String,
    },
    /// The vector could not be run.
    Error(String),
}

impl Verdict {
    /// Whether this is [`Verdict::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail { expected, actual } => write!(f, "expected {}, got {}", expected, actual),
            Verdict::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Verdicts in execution order, plus a repro bundle per runner mismatch.
#[derive(Debug, Default)]
pub struct Report {
    verdicts: Vec<(String, Verdict)>,
    repros: Vec<ReproBundle>,
}

impl Report {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the verdict for vector `id`.
    pub fn record(&mut self, id: &str, verdict: Verdict) {
        self.verdicts.push((id.to_string(), verdict));
    }

    /// Keep a repro bundle for a mismatch.
    pub fn attach(&mut self, repro: ReproBundle) {
        self.repros.push(repro);
    }

    /// All verdicts.
    pub fn verdicts(&self) -> &[(String, Verdict)] {
        &self.verdicts
    }

    /// Repro bundles collected so far.
    pub fn repros(&self) -> &[ReproBundle] {
        &self.repros
    }

    /// Write each repro bundle into `dir`, creating it if needed, and
    /// return the written paths in order.
    pub fn save_repros(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.repros.len());
        for (index, repro) in self.repros.iter().enumerate() {
            let path = dir.join(repro.file_name(index));
            repro.save(&path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.verdicts.iter().filter(|(_, v)| pred(v)).count()
    }

    /// Passing vectors.
    pub fn passed(&self) -> usize {
        self.count(Verdict::is_pass)
    }

    /// Failing vectors.
    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Fail { .. }))
    }

    /// Vectors that could not be run.
    pub fn errors(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Error(_)))
    }

    /// Vectors run.
    pub fn total(&self) -> usize {
        self.verdicts.len()
    }

    /// True when every vector passed. An empty report passes.
    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Non-passing verdicts.
    pub fn problems(&self) -> impl Iterator<Item = &(String, Verdict)> {
        self.verdicts.iter().filter(|(_, v)| !v.is_pass())
    }

    /// One-line tally, e.g. `21/22 passed, 1 failed, 0 errors`.
    pub fn summary(&self) -> String {
        format!(
            "{}/{} passed, {} failed, {} errors",
            self.passed(),
            self.total(),
            self.failed(),
            self.errors()
        )
    }
}

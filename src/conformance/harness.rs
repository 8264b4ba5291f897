//! Side-by-side execution of the native hash and the emitted contract.

use super::corpus::{Corpus, Expected};
use super::repro::ReproBundle;
use super::report::{Report, Verdict};
use super::runner::{BytecodeHashRunner, HashOutput, HashRunner, NativeHashRunner};
use super::ConformanceResult;
use crate::field::Fr;
use crate::poseidon::PermutationConfig;

/// Outcome of comparing both runners on one input list.
#[derive(Debug)]
pub enum DiffResult {
    /// Same output, digest or error name.
    Match {
        /// The shared output.
        value: HashOutput,
    },
    /// The runners disagree.
    Mismatch {
        /// Library output.
        native: HashOutput,
        /// Contract output.
        bytecode: HashOutput,
        /// Everything needed to replay the call.
        repro: ReproBundle,
    },
}

impl DiffResult {
    /// Both runners agreed.
    pub fn is_match(&self) -> bool {
        matches!(self, DiffResult::Match { .. })
    }

    /// The runners disagreed.
    pub fn is_mismatch(&self) -> bool {
        !self.is_match()
    }
}

/// Native and contract runners for one parameter set.
pub struct DiffTestHarness<'a> {
    config: &'a PermutationConfig,
    native: NativeHashRunner<'a>,
    bytecode: BytecodeHashRunner,
}

impl<'a> DiffTestHarness<'a> {
    /// Emit and deploy the contract for `config`.
    pub fn new(config: &'a PermutationConfig) -> ConformanceResult<Self> {
        Ok(Self {
            config,
            native: NativeHashRunner::new(config),
            bytecode: BytecodeHashRunner::new(config)?,
        })
    }

    /// Harness over runners built elsewhere, e.g. a contract runner over
    /// modified runtime code.
    pub fn with_runners(
        config: &'a PermutationConfig,
        native: NativeHashRunner<'a>,
        bytecode: BytecodeHashRunner,
    ) -> Self {
        Self {
            config,
            native,
            bytecode,
        }
    }

    /// The configuration under test.
    pub fn config(&self) -> &PermutationConfig {
        self.config
    }

    /// The contract runner, for raw calls.
    pub fn bytecode_runner(&self) -> &BytecodeHashRunner {
        &self.bytecode
    }

    /// Native output alone.
    pub fn run_native(&self, inputs: &[Fr]) -> ConformanceResult<HashOutput> {
        self.native.compute_hash(inputs)
    }

    /// Run `inputs` through both runners.
    pub fn compare(&self, test_name: &str, inputs: &[Fr]) -> ConformanceResult<DiffResult> {
        let native = self.native.compute_hash(inputs)?;
        let bytecode = self.bytecode.compute_hash(inputs)?;

        if native == bytecode {
            return Ok(DiffResult::Match { value: native });
        }

        log::debug!(
            "{}: {} gave {:?}, {} gave {:?}",
            test_name,
            self.native.name(),
            native,
            self.bytecode.name(),
            bytecode
        );

        let repro = ReproBundle {
            test_name: test_name.to_string(),
            config_id: self.config.id(),
            width: self.config.width(),
            security_level: self.config.security_level(),
            inputs: inputs.iter().map(Fr::to_decimal).collect(),
            calldata: hex::encode(self.bytecode.calldata(inputs)),
            native_output: native.clone(),
            bytecode_output: bytecode.clone(),
        };
        Ok(DiffResult::Mismatch {
            native,
            bytecode,
            repro,
        })
    }

    /// Compare named input lists; only runner agreement is checked.
    pub fn run_batch<'t>(&self, tests: impl IntoIterator<Item = (&'t str, &'t [Fr])>) -> Report {
        let mut report = Report::new();
        for (name, inputs) in tests {
            self.check(&mut report, name, inputs, None);
        }
        report
    }

    /// Run every corpus vector. A vector passes when the runners agree and
    /// the shared output satisfies its expectation, if one is given.
    pub fn run_corpus(&self, corpus: &Corpus) -> Report {
        let mut report = Report::new();
        for vector in &corpus.vectors {
            match vector.parse_inputs() {
                Ok(inputs) => self.check(&mut report, &vector.id, &inputs, vector.expected.as_ref()),
                Err(e) => report.record(&vector.id, Verdict::Error(e.to_string())),
            }
        }
        report
    }

    fn check(&self, report: &mut Report, id: &str, inputs: &[Fr], expected: Option<&Expected>) {
        let verdict = match self.compare(id, inputs) {
            Err(e) => Verdict::Error(e.to_string()),
            Ok(DiffResult::Mismatch {
                native,
                bytecode,
                repro,
            }) => {
                report.attach(repro);
                Verdict::Fail {
                    expected: format!("native {}", native.as_string()),
                    actual: format!("bytecode {}", bytecode.as_string()),
                }
            }
            Ok(DiffResult::Match { value }) => match expected {
                Some(want) if !want.matches(&value) => Verdict::Fail {
                    expected: want.to_string(),
                    actual: value.as_string().to_string(),
                },
                _ => Verdict::Pass,
            },
        };
        report.record(id, verdict);
    }
}

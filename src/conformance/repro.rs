//! Reproduction bundle for debugging conformance mismatches.

use super::runner::HashOutput;
use serde::Serialize;
use std::path::Path;

/// A bundle of information for reproducing a conformance mismatch.
#[derive(Debug, Clone, Serialize)]
pub struct ReproBundle {
    /// Test name that failed.
    pub test_name: String,
    /// Parameter set identifier.
    pub config_id: String,
    /// State width of the parameter set.
    pub width: usize,
    /// Security level of the parameter set, in bits.
    pub security_level: u32,
    /// Inputs as decimal strings.
    pub inputs: Vec<String>,
    /// Calldata sent to the contract, hex without prefix.
    pub calldata: String,
    /// Native output.
    pub native_output: HashOutput,
    /// Contract output.
    pub bytecode_output: HashOutput,
}

impl ReproBundle {
    /// Format as a human-readable report.
    pub fn to_report(&self) -> String {
        format!(
            r#"=== Conformance Mismatch Report ===
Test: {}
Parameters: {}
Inputs: [{}]
Calldata: 0x{}

Native Output: {:?}
Bytecode Output: {:?}

To reproduce:
  poseidon-gen hash --width {} --security {} {}
"#,
            self.test_name,
            self.config_id,
            self.inputs.join(", "),
            self.calldata,
            self.native_output,
            self.bytecode_output,
            self.width,
            self.security_level,
            self.inputs.join(" "),
        )
    }

    /// File name for the `index`th bundle of a run. Characters outside
    /// `[A-Za-z0-9_-]` in the test name become `_`.
    pub fn file_name(&self, index: usize) -> String {
        let safe: String = self
            .test_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{:03}_{}.txt", index, safe)
    }

    /// Save the repro bundle to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_report())
    }

    /// Format as JSON for machine parsing.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

//! Hash runner implementations for differential testing.

use super::{ConformanceError, ConformanceResult};
use crate::error::ErrorCode;
use crate::evm::{self, ExecOutcome, Machine};
use crate::field::Fr;
use crate::poseidon::{hash, PermutationConfig};
use serde::Serialize;

/// Result from one hash computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashOutput {
    /// Digest as a decimal string.
    Ok(String),
    /// Error name.
    Err(String),
}

impl HashOutput {
    /// Check if this is an Ok result.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Check if this is an Err result.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Get the value as a string (either ok value or error name).
    pub fn as_string(&self) -> &str {
        match self {
            Self::Ok(s) => s,
            Self::Err(s) => s,
        }
    }
}

impl From<ErrorCode> for HashOutput {
    fn from(e: ErrorCode) -> Self {
        HashOutput::Err(e.name().to_string())
    }
}

/// Something that can hash a list of field elements.
pub trait HashRunner {
    /// Hash `inputs` and report the outcome.
    fn compute_hash(&self, inputs: &[Fr]) -> ConformanceResult<HashOutput>;

    /// Get the runner name for reporting.
    fn name(&self) -> &str;
}

/// The library hash.
pub struct NativeHashRunner<'a> {
    config: &'a PermutationConfig,
}

impl<'a> NativeHashRunner<'a> {
    /// Runner over a configuration.
    pub fn new(config: &'a PermutationConfig) -> Self {
        Self { config }
    }
}

impl HashRunner for NativeHashRunner<'_> {
    fn compute_hash(&self, inputs: &[Fr]) -> ConformanceResult<HashOutput> {
        Ok(match hash(inputs, self.config) {
            Ok(digest) => HashOutput::Ok(digest.to_decimal()),
            Err(e) => e.into(),
        })
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// The emitted contract, deployed and called in the interpreter.
pub struct BytecodeHashRunner {
    runtime: Vec<u8>,
    selector: [u8; 4],
    arity: usize,
    machine: Machine,
}

impl BytecodeHashRunner {
    /// Emit and deploy the contract for `config`.
    pub fn new(config: &PermutationConfig) -> ConformanceResult<Self> {
        let artifact = evm::emit(config)?;
        let machine = Machine::new();
        let runtime = machine.deploy(artifact.bytecode())?;
        let entry = artifact.interface().entries().first().ok_or_else(|| {
            ConformanceError::UnexpectedOutput("interface has no entry points".to_string())
        })?;

        Ok(Self {
            runtime,
            selector: entry.selector(),
            arity: config.rate(),
            machine,
        })
    }

    /// Runner over already-deployed runtime code whose entry point takes
    /// `arity` words.
    pub fn from_runtime(runtime: Vec<u8>, selector: [u8; 4], arity: usize) -> Self {
        Self {
            runtime,
            selector,
            arity,
            machine: Machine::new(),
        }
    }

    /// Selector used by [`calldata`](Self::calldata).
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Number of input words the entry point takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Deployed runtime code.
    pub fn runtime(&self) -> &[u8] {
        &self.runtime
    }

    /// Calldata for `inputs`, zero-padded to the contract arity.
    pub fn calldata(&self, inputs: &[Fr]) -> Vec<u8> {
        let mut padded = inputs.to_vec();
        padded.resize(self.arity.max(inputs.len()), Fr::ZERO);
        evm::encode_call(self.selector, &padded)
    }

    /// Execute raw calldata.
    pub fn call_raw(&self, calldata: &[u8]) -> ConformanceResult<ExecOutcome> {
        Ok(self.machine.call(&self.runtime, calldata)?)
    }
}

impl HashRunner for BytecodeHashRunner {
    fn compute_hash(&self, inputs: &[Fr]) -> ConformanceResult<HashOutput> {
        // A fixed-size array parameter cannot carry extra elements.
        if inputs.len() > self.arity {
            return Ok(ErrorCode::InputTooLarge {
                got: inputs.len(),
                limit: self.arity,
            }
            .into());
        }

        match self.call_raw(&self.calldata(inputs))? {
            ExecOutcome::Return(out) => {
                let word: [u8; 32] = out.as_slice().try_into().map_err(|_| {
                    ConformanceError::UnexpectedOutput(format!(
                        "expected a 32-byte word, got {} bytes",
                        out.len()
                    ))
                })?;
                let digest = Fr::from_bytes_be(&word)?;
                Ok(HashOutput::Ok(digest.to_decimal()))
            }
            ExecOutcome::Revert(_) => Ok(HashOutput::Err("Revert".to_string())),
            ExecOutcome::Invalid => Ok(HashOutput::Err("Invalid".to_string())),
            ExecOutcome::Stop => Ok(HashOutput::Err("Stop".to_string())),
        }
    }

    fn name(&self) -> &str {
        "bytecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::load;

    const HASH_1_2: &str =
        "7853200120776062878684798364095072458815029376092732009249414926327459813530";

    #[test]
    fn test_native_runner() {
        let runner = NativeHashRunner::new(load(3, 128).unwrap());
        let out = runner
            .compute_hash(&[Fr::ONE, Fr::from_u64(2)])
            .unwrap();
        assert_eq!(out, HashOutput::Ok(HASH_1_2.to_string()));

        let out = runner.compute_hash(&[Fr::ONE; 3]).unwrap();
        assert_eq!(out, HashOutput::Err("InputTooLarge".to_string()));
    }

    #[test]
    fn test_bytecode_runner() {
        let runner = BytecodeHashRunner::new(load(3, 128).unwrap()).unwrap();
        assert_eq!(runner.name(), "bytecode");
        let out = runner
            .compute_hash(&[Fr::ONE, Fr::from_u64(2)])
            .unwrap();
        assert_eq!(out.as_string(), HASH_1_2);
        assert!(runner.compute_hash(&[Fr::ONE; 3]).unwrap().is_err());
    }

    #[test]
    fn test_from_runtime_matches_deployed() {
        let deployed = BytecodeHashRunner::new(load(3, 128).unwrap()).unwrap();
        let rebuilt = BytecodeHashRunner::from_runtime(
            deployed.runtime().to_vec(),
            deployed.selector(),
            deployed.arity(),
        );
        assert_eq!(rebuilt.arity(), 2);
        assert_eq!(
            rebuilt.compute_hash(&[Fr::ONE, Fr::from_u64(2)]).unwrap(),
            HashOutput::Ok(HASH_1_2.to_string())
        );
    }

    #[test]
    fn test_short_calldata_reverts() {
        let runner = BytecodeHashRunner::new(load(3, 128).unwrap()).unwrap();
        let mut calldata = runner.calldata(&[Fr::ONE, Fr::from_u64(2)]);
        calldata.pop();
        assert_eq!(
            runner.call_raw(&calldata).unwrap(),
            ExecOutcome::Revert(Vec::new())
        );
    }
}

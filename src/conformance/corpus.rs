//! Conformance corpora: input vectors with optional expected outputs.
//!
//! A corpus is a JSON file of input vectors for one parameter set, with
//! optional expected outputs:
//!
//! ```json
//! {
//!   "width": 3,
//!   "security_level": 128,
//!   "vectors": [
//!     { "id": "pair", "inputs": ["1", "2"], "expected": { "ok": "7853...3530" } },
//!     { "id": "too_many", "inputs": ["1", "1", "1"], "expected": { "err": "InputTooLarge" } }
//!   ]
//! }
//! ```
//!
//! Inputs and expected digests may be decimal or `0x`-prefixed hex.

use super::runner::HashOutput;
use super::{ConformanceError, ConformanceResult};
use crate::error::PoseidonResult;
use crate::field::{self, Fr};
use crate::poseidon::PermutationConfig;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::fs;
use std::path::Path;

/// Published digests: `(width, inputs, digest)`.
const REFERENCE_VECTORS: &[(usize, &[&str], &str)] = &[
    (
        3,
        &["1", "2"],
        "7853200120776062878684798364095072458815029376092732009249414926327459813530",
    ),
    (
        5,
        &["1", "2", "3", "4"],
        "18821383157269793795438455681495246036402687001665670618754263018637548127333",
    ),
];

const RANDOM_VECTORS: u32 = 16;
const RANDOM_DOMAIN: &[u8] = b"poseidon-gen/corpus";

/// Expected outcome of a vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expected {
    /// Digest, decimal or hex.
    Ok(String),
    /// Error name.
    Err(String),
}

impl Expected {
    /// Whether `output` satisfies this expectation.
    pub fn matches(&self, output: &HashOutput) -> bool {
        match (self, output) {
            (Expected::Ok(want), HashOutput::Ok(got)) => {
                matches!((Fr::parse(want), Fr::parse(got)), (Ok(a), Ok(b)) if a == b)
            }
            (Expected::Err(want), HashOutput::Err(got)) => want == got,
            _ => false,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Ok(v) => write!(f, "{}", v),
            Expected::Err(e) => write!(f, "{}", e),
        }
    }
}

/// One corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVector {
    /// Name, unique within the corpus.
    pub id: String,
    /// Inputs, decimal or hex.
    pub inputs: Vec<String>,
    /// Expected outcome; when absent only runner agreement is checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Expected>,
}

impl TestVector {
    /// Parse inputs into field elements.
    pub fn parse_inputs(&self) -> PoseidonResult<Vec<Fr>> {
        self.inputs.iter().map(|s| Fr::parse(s)).collect()
    }
}

/// Vectors for one `(width, security_level)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    /// State width the vectors are written for.
    pub width: usize,
    /// Security level the vectors are written for.
    pub security_level: u32,
    /// Entries, run in order.
    pub vectors: Vec<TestVector>,
}

impl Corpus {
    /// Read and parse a corpus file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConformanceResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse corpus JSON.
    pub fn from_json(content: &str) -> ConformanceResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ConformanceError::Corpus(format!("failed to parse corpus JSON: {}", e)))
    }

    /// Indented JSON.
    pub fn to_json_pretty(&self) -> ConformanceResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConformanceError::Corpus(e.to_string()))
    }

    /// Built-in vectors for a configuration: reference digests, padding
    /// and boundary cases, and deterministic pseudo-random inputs.
    pub fn builtin(config: &PermutationConfig) -> Self {
        let rate = config.rate();
        let max = (field::modulus() - 1u32).to_string();
        let mut vectors = Vec::new();

        for (width, inputs, digest) in REFERENCE_VECTORS {
            if *width == config.width() {
                vectors.push(TestVector {
                    id: format!("reference_t{}", width),
                    inputs: inputs.iter().map(|s| s.to_string()).collect(),
                    expected: Some(Expected::Ok(digest.to_string())),
                });
            }
        }

        vectors.push(TestVector {
            id: "empty".to_string(),
            inputs: Vec::new(),
            expected: None,
        });
        vectors.push(TestVector {
            id: "single_one".to_string(),
            inputs: vec!["1".to_string()],
            expected: None,
        });
        vectors.push(TestVector {
            id: "all_zero".to_string(),
            inputs: vec!["0".to_string(); rate],
            expected: None,
        });
        vectors.push(TestVector {
            id: "all_max".to_string(),
            inputs: vec![max; rate],
            expected: None,
        });
        vectors.push(TestVector {
            id: "too_many".to_string(),
            inputs: vec!["1".to_string(); rate + 1],
            expected: Some(Expected::Err("InputTooLarge".to_string())),
        });

        for i in 0..RANDOM_VECTORS {
            let inputs = (0..rate as u32)
                .map(|j| pseudo_random(i, j).to_string())
                .collect();
            vectors.push(TestVector {
                id: format!("random_{}", i),
                inputs,
                expected: None,
            });
        }

        Self {
            width: config.width(),
            security_level: config.security_level(),
            vectors,
        }
    }
}

/// `keccak256(domain || i || j) mod p`.
fn pseudo_random(i: u32, j: u32) -> BigUint {
    let mut hasher = Keccak256::new();
    hasher.update(RANDOM_DOMAIN);
    hasher.update(i.to_be_bytes());
    hasher.update(j.to_be_bytes());
    BigUint::from_bytes_be(&hasher.finalize()) % field::modulus()
}

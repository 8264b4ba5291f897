//! Solidity ABI interface descriptor for the emitted contract.

use crate::field::Fr;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Name of every entry point.
pub const FUNCTION_NAME: &str = "poseidon";

/// One ABI parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Solidity-level type, e.g. `uint256[2]`.
    #[serde(rename = "internalType")]
    pub internal_type: String,
    /// Parameter name; empty for outputs.
    pub name: String,
    /// ABI type.
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    fn new(name: &str, ty: &str) -> Self {
        Self {
            internal_type: ty.to_string(),
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }
}

/// One callable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Inputs, a single fixed-size array.
    pub inputs: Vec<Param>,
    /// Function name.
    pub name: String,
    /// Outputs, a single word.
    pub outputs: Vec<Param>,
    /// Always `pure`.
    #[serde(rename = "stateMutability")]
    pub state_mutability: String,
    /// Always `function`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl EntryPoint {
    /// `poseidon(<word>[arity]) returns (<word>)`.
    pub fn new(word: &str, arity: usize) -> Self {
        Self {
            inputs: vec![Param::new("input", &format!("{}[{}]", word, arity))],
            name: FUNCTION_NAME.to_string(),
            outputs: vec![Param::new("", word)],
            state_mutability: "pure".to_string(),
            kind: "function".to_string(),
        }
    }

    /// Canonical signature, e.g. `poseidon(uint256[2])`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the Keccak-256 of the signature.
    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }
}

/// Function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// The full ABI of an emitted contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceDescriptor {
    entries: Vec<EntryPoint>,
}

impl InterfaceDescriptor {
    /// Two entry points sharing one implementation: `uint256[arity]` and
    /// `bytes32[arity]`.
    pub fn for_arity(arity: usize) -> Self {
        Self {
            entries: vec![
                EntryPoint::new("uint256", arity),
                EntryPoint::new("bytes32", arity),
            ],
        }
    }

    /// Entry points in declaration order.
    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    /// Entry point matching a selector.
    pub fn find(&self, selector: [u8; 4]) -> Option<&EntryPoint> {
        self.entries.iter().find(|e| e.selector() == selector)
    }

    /// Compact JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON array.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Calldata for a call: selector followed by one big-endian word per input.
pub fn encode_call(selector: [u8; 4], inputs: &[Fr]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * inputs.len());
    data.extend_from_slice(&selector);
    for x in inputs {
        data.extend_from_slice(&x.to_bytes_be());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        let abi = InterfaceDescriptor::for_arity(2);
        let sigs: Vec<String> = abi.entries().iter().map(EntryPoint::signature).collect();
        assert_eq!(sigs, vec!["poseidon(uint256[2])", "poseidon(bytes32[2])"]);
    }

    #[test]
    fn test_known_selector() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_find_by_selector() {
        let abi = InterfaceDescriptor::for_arity(4);
        let bytes = &abi.entries()[1];
        assert_eq!(abi.find(bytes.selector()), Some(bytes));
        assert_eq!(abi.find([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_json_shape() {
        let json = InterfaceDescriptor::for_arity(2).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value[0];
        assert_eq!(first["name"], "poseidon");
        assert_eq!(first["type"], "function");
        assert_eq!(first["stateMutability"], "pure");
        assert_eq!(first["inputs"][0]["type"], "uint256[2]");
        assert_eq!(first["inputs"][0]["internalType"], "uint256[2]");
        assert_eq!(first["outputs"][0]["type"], "uint256");
        assert_eq!(value[1]["outputs"][0]["type"], "bytes32");
    }

    #[test]
    fn test_json_round_trip() {
        let abi = InterfaceDescriptor::for_arity(2);
        let parsed: InterfaceDescriptor = serde_json::from_str(&abi.to_json().unwrap()).unwrap();
        assert_eq!(parsed, abi);
    }

    #[test]
    fn test_encode_call() {
        let data = encode_call([1, 2, 3, 4], &[Fr::from_u64(5)]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &[1, 2, 3, 4]);
        assert_eq!(data[35], 5);
    }
}

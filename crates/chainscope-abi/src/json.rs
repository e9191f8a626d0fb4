//! JSON-ABI descriptor model.
//!
//! Mirrors the explorer-published ABI shape: entries with `type`, `name`,
//! `inputs`, `outputs`, parameters with nested `components` for tuples.
//! Signatures built from descriptors use the declared type strings verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::AbiError;
use crate::signature::selector_hex;
use crate::types::{split_dimensions, wrap_dimensions, ParamType};

/// One parameter of a JSON-ABI function entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Resolve this parameter into a [`ParamType`], expanding tuple
    /// components recursively.
    pub fn param_type(&self) -> Result<ParamType, AbiError> {
        let (base, dims) = split_dimensions(self.ty.trim());
        let base_ty = if base == "tuple" && !self.components.is_empty() {
            let mut components = Vec::with_capacity(self.components.len());
            for component in &self.components {
                components.push((component.name.clone(), component.param_type()?));
            }
            ParamType::Tuple(components)
        } else {
            ParamType::parse(base)?
        };
        Ok(wrap_dimensions(base_ty, &dims))
    }
}

/// A `type == "function"` entry of a JSON ABI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiFunction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

impl AbiFunction {
    /// Canonical signature from the declared parameter type strings.
    pub fn signature(&self) -> String {
        function_signature(&self.name, &self.inputs)
    }

    /// 8 lowercase hex characters, no prefix.
    pub fn selector(&self) -> String {
        selector_hex(&self.signature())
    }

    /// Resolved output parameter types, paired with their declared names.
    pub fn output_params(&self) -> Result<Vec<(String, ParamType)>, AbiError> {
        self.outputs
            .iter()
            .map(|out| Ok((out.name.clone(), out.param_type()?)))
            .collect()
    }

    /// Byte length of the static portion of this function's inputs: the
    /// minimum call data length after the selector.
    pub fn static_input_size(&self) -> Result<usize, AbiError> {
        let mut size = 0;
        for input in &self.inputs {
            size += input.param_type()?.head_size()?;
        }
        Ok(size)
    }
}

/// Join declared input type strings into `name(type1,type2,...)`.
pub fn function_signature(name: &str, inputs: &[AbiParam]) -> String {
    let types: Vec<&str> = inputs.iter().map(|input| input.ty.as_str()).collect();
    format!("{name}({})", types.join(","))
}

/// Selector for a named function with the given inputs.
pub fn selector_for(name: &str, inputs: &[AbiParam]) -> String {
    selector_hex(&function_signature(name, inputs))
}

/// Index an explorer-published ABI (a JSON array) by function selector.
///
/// Entries that are not functions, or whose parameters cannot be parsed,
/// are skipped.
pub fn functions_by_selector(abi: &Value) -> HashMap<String, AbiFunction> {
    let mut map = HashMap::new();
    let Some(entries) = abi.as_array() else {
        return map;
    };
    for entry in entries {
        if entry.get("type").and_then(Value::as_str) != Some("function") {
            continue;
        }
        let Ok(function) = serde_json::from_value::<AbiFunction>(entry.clone()) else {
            continue;
        };
        if function.name.is_empty() {
            continue;
        }
        map.insert(function.selector(), function);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn erc20_abi() -> Value {
        json!([
            {
                "type": "function",
                "name": "balanceOf",
                "inputs": [{"name": "owner", "type": "address"}],
                "outputs": [{"name": "", "type": "uint256"}]
            },
            {
                "type": "function",
                "name": "transfer",
                "inputs": [
                    {"name": "to", "type": "address"},
                    {"name": "amount", "type": "uint256"}
                ],
                "outputs": [{"name": "", "type": "bool"}]
            },
            {"type": "event", "name": "Transfer", "inputs": []}
        ])
    }

    #[test]
    fn selector_index_from_json_abi() {
        let map = functions_by_selector(&erc20_abi());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("70a08231").unwrap().name, "balanceOf");
        assert_eq!(map.get("a9059cbb").unwrap().name, "transfer");
    }

    #[test]
    fn tuple_components_resolve() {
        let param: AbiParam = serde_json::from_value(json!({
            "name": "order",
            "type": "tuple",
            "components": [
                {"name": "maker", "type": "address"},
                {"name": "amounts", "type": "uint256[]"}
            ]
        }))
        .unwrap();
        let ty = param.param_type().unwrap();
        assert!(ty.is_dynamic());
        match ty {
            ParamType::Tuple(components) => {
                assert_eq!(components[0].0, "maker");
                assert_eq!(components[0].1, ParamType::Address);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn static_input_size_counts_words() {
        let map = functions_by_selector(&erc20_abi());
        let transfer = map.get("a9059cbb").unwrap();
        assert_eq!(transfer.static_input_size().unwrap(), 64);
    }

    #[test]
    fn non_array_abi_yields_empty_map() {
        assert!(functions_by_selector(&json!("not verified")).is_empty());
    }
}

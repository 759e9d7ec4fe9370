//! Weight helpers for deterministic layer tests

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::collections::HashMap;

/// VarBuilder serving exactly the given named tensors
///
/// Layers built from it pick their weights by path, e.g. `"head.weight"`.
pub fn var_builder(tensors: Vec<(&str, Tensor)>, device: &Device) -> VarBuilder<'static> {
    let map: HashMap<String, Tensor> = tensors
        .into_iter()
        .map(|(name, tensor)| (name.to_string(), tensor))
        .collect();
    VarBuilder::from_tensors(map, DType::F32, device)
}

/// Freshly initialised weights, with the map kept for saving or inspection
pub fn random_var_builder(device: &Device) -> (VarMap, VarBuilder<'static>) {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    (varmap, vb)
}

/// `[rows, cols]` tensor from nested rows
pub fn matrix(rows: &[&[f32]], device: &Device) -> Tensor {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let data: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::from_vec(data, (rows.len(), cols), device).expect("rows share one length")
}

/// Square identity matrix
pub fn identity(size: usize, device: &Device) -> Tensor {
    Tensor::eye(size, DType::F32, device).expect("identity matrix")
}

use std::path::Path;

use candle::{
    utils::{cuda_is_available, metal_is_available},
    DType, Device,
};
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InferenceError, Result};

pub mod char_lstm;

/// Floating point precision the network weights are loaded with.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    F32,
    F16,
    Bf16,
}

impl Precision {
    pub fn into_dtype(self) -> DType {
        match self {
            Self::F32 => DType::F32,
            Self::F16 => DType::F16,
            Self::Bf16 => DType::BF16,
        }
    }
}

pub fn device(device_id: usize) -> std::result::Result<Device, candle::Error> {
    if cuda_is_available() {
        info!("Using CUDA");
        Device::new_cuda(device_id)
    } else if metal_is_available() {
        info!("Using Metal");
        Device::new_metal(device_id)
    } else {
        info!("Using Cpu");
        Ok(Device::Cpu)
    }
}

/// Opens a parameter blob as a [`VarBuilder`].
///
/// `.safetensors` files are memory-mapped; `.pt` and `.pth` files are read as
/// PyTorch pickles, so a `state_dict` saved with `torch.save` can be served as-is.
pub fn load_var_builder(
    weights_path: &Path,
    dtype: DType,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    if !weights_path.is_file() {
        return Err(InferenceError::Configuration(format!(
            "model weights not found at {}",
            weights_path.display()
        )));
    }
    let extension = weights_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let var_builder = match extension {
        // SAFETY: the file is only read, and is not expected to change while mapped.
        "safetensors" => unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], dtype, device)
        },
        "pt" | "pth" => VarBuilder::from_pth(weights_path, dtype, device),
        other => {
            return Err(InferenceError::Configuration(format!(
                "unsupported weights format {other:?} for {}, expected .safetensors, .pt or .pth",
                weights_path.display()
            )))
        }
    };
    var_builder.map_err(|e| {
        InferenceError::Configuration(format!(
            "failed to load model weights from {}: {e}",
            weights_path.display()
        ))
    })
}

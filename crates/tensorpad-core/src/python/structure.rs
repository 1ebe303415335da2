//! Structural summary of network modules.
//!
//! Each immediate child of a module is classified into a [`LayerKind`] by
//! class name. Known kinds declare which constructor parameters they carry;
//! anything else is probed for the recognized attribute names so custom
//! layers still show their shapes.

use pyo3::prelude::*;
use tensorpad_types::LayerSummary;

/// Type reported when a module has no registered children.
pub const OPAQUE_LAYER_TYPE: &str = "Custom/Complex";

/// Probed on unrecognized layers, in display order, with their labels.
const PROBED_ATTRIBUTES: [(&str, &str); 5] = [
    ("in_features", "in"),
    ("out_features", "out"),
    ("in_channels", "in"),
    ("out_channels", "out"),
    ("kernel_size", "k"),
];

const LINEAR_TYPES: &[&str] = &["Linear", "LazyLinear"];
const CONV_TYPES: &[&str] = &[
    "Conv1d",
    "Conv2d",
    "Conv3d",
    "ConvTranspose1d",
    "ConvTranspose2d",
    "ConvTranspose3d",
];
const POOL_TYPES: &[&str] = &[
    "MaxPool1d",
    "MaxPool2d",
    "MaxPool3d",
    "AvgPool1d",
    "AvgPool2d",
    "AvgPool3d",
];

/// A child layer, described by the parameters its kind declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    Linear {
        type_name: String,
        in_features: i64,
        out_features: i64,
    },
    Conv {
        type_name: String,
        in_channels: i64,
        out_channels: i64,
        /// `str()` of the kernel size, e.g. `(3, 3)`.
        kernel_size: String,
    },
    Pool {
        type_name: String,
        kernel_size: String,
    },
    /// Unrecognized class; whichever probed attributes it has.
    Generic {
        type_name: String,
        params: Vec<(&'static str, String)>,
    },
}

impl LayerKind {
    /// Classify a child module.
    pub fn inspect(layer: &Bound<'_, PyAny>) -> PyResult<Self> {
        let type_name: String = layer.get_type().getattr("__name__")?.extract()?;

        let declared = if LINEAR_TYPES.contains(&type_name.as_str()) {
            Self::inspect_linear(layer, &type_name)
        } else if CONV_TYPES.contains(&type_name.as_str()) {
            Self::inspect_conv(layer, &type_name)
        } else if POOL_TYPES.contains(&type_name.as_str()) {
            Self::inspect_pool(layer, &type_name)
        } else {
            None
        };

        match declared {
            Some(kind) => Ok(kind),
            None => Self::inspect_generic(layer, type_name),
        }
    }

    // A known class name without the declared fields (a user class that
    // happens to be called `Linear`) falls back to probing.
    fn inspect_linear(layer: &Bound<'_, PyAny>, type_name: &str) -> Option<Self> {
        Some(LayerKind::Linear {
            type_name: type_name.to_string(),
            in_features: layer.getattr("in_features").ok()?.extract().ok()?,
            out_features: layer.getattr("out_features").ok()?.extract().ok()?,
        })
    }

    fn inspect_conv(layer: &Bound<'_, PyAny>, type_name: &str) -> Option<Self> {
        Some(LayerKind::Conv {
            type_name: type_name.to_string(),
            in_channels: layer.getattr("in_channels").ok()?.extract().ok()?,
            out_channels: layer.getattr("out_channels").ok()?.extract().ok()?,
            kernel_size: display_attr(layer, "kernel_size")?,
        })
    }

    fn inspect_pool(layer: &Bound<'_, PyAny>, type_name: &str) -> Option<Self> {
        Some(LayerKind::Pool {
            type_name: type_name.to_string(),
            kernel_size: display_attr(layer, "kernel_size")?,
        })
    }

    fn inspect_generic(layer: &Bound<'_, PyAny>, type_name: String) -> PyResult<Self> {
        let mut params = Vec::new();
        for (attribute, label) in PROBED_ATTRIBUTES {
            if layer.hasattr(attribute)? {
                let value = layer.getattr(attribute)?.str()?;
                params.push((label, value.to_string_lossy().into_owned()));
            }
        }
        Ok(LayerKind::Generic { type_name, params })
    }

    pub fn type_name(&self) -> &str {
        match self {
            LayerKind::Linear { type_name, .. }
            | LayerKind::Conv { type_name, .. }
            | LayerKind::Pool { type_name, .. }
            | LayerKind::Generic { type_name, .. } => type_name,
        }
    }

    /// Labelled parameters in display order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            LayerKind::Linear {
                in_features,
                out_features,
                ..
            } => vec![("in", in_features.to_string()), ("out", out_features.to_string())],
            LayerKind::Conv {
                in_channels,
                out_channels,
                kernel_size,
                ..
            } => vec![
                ("in", in_channels.to_string()),
                ("out", out_channels.to_string()),
                ("k", kernel_size.clone()),
            ],
            LayerKind::Pool { kernel_size, .. } => vec![("k", kernel_size.clone())],
            LayerKind::Generic { params, .. } => params.clone(),
        }
    }

    pub fn to_summary(&self) -> LayerSummary {
        let params = self
            .params()
            .into_iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect::<Vec<_>>()
            .join(", ");
        LayerSummary::new(self.type_name(), params)
    }
}

fn display_attr(layer: &Bound<'_, PyAny>, attribute: &str) -> Option<String> {
    let value = layer.getattr(attribute).ok()?;
    let text = value.str().ok()?;
    Some(text.to_string_lossy().into_owned())
}

/// Summarize the immediate children of `module`, in declaration order.
///
/// A module without children yields a single opaque entry carrying the
/// module's full textual representation.
pub fn extract_model_structure(module: &Bound<'_, PyAny>) -> PyResult<Vec<LayerSummary>> {
    let mut layers = Vec::new();
    for child in module.call_method0("named_children")?.iter()? {
        let (_name, layer): (String, Bound<'_, PyAny>) = child?.extract()?;
        layers.push(LayerKind::inspect(&layer)?.to_summary());
    }

    if layers.is_empty() {
        let repr = module.str()?.to_string_lossy().into_owned();
        layers.push(LayerSummary::new(OPAQUE_LAYER_TYPE, repr));
    }

    Ok(layers)
}

//! Sequential convolutional network: weight format, shape checking and the
//! forward pass.
//!
//! The JSON format mirrors a Keras `Sequential` export. Weight arrays are
//! flattened row-major in Keras order: conv kernels are `(kh, kw, in, out)`,
//! dense kernels are `(in, out)`. Convolutions use stride 1 and `valid`
//! padding; max pooling uses a stride equal to the pool size.

use serde::{Deserialize, Serialize};

/// Current model file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Activation applied after a conv or dense layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, values: &mut [f32]) {
        match self {
            Self::Linear => {}
            Self::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Self::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// One layer as stored in the model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        filters: usize,
        kernel_size: [usize; 2],
        #[serde(default)]
        activation: Activation,
        weights: Vec<f32>,
        bias: Vec<f32>,
    },
    MaxPool2d {
        pool_size: [usize; 2],
    },
    Flatten,
    Dense {
        units: usize,
        #[serde(default)]
        activation: Activation,
        weights: Vec<f32>,
        bias: Vec<f32>,
    },
}

impl LayerSpec {
    fn kind(&self) -> &'static str {
        match self {
            Self::Conv2d { .. } => "conv2d",
            Self::MaxPool2d { .. } => "max_pool2d",
            Self::Flatten => "flatten",
            Self::Dense { .. } => "dense",
        }
    }
}

/// Exported model file (`cic_cnn.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub format_version: u32,
    #[serde(default)]
    pub name: String,
    /// `[height, width, channels]`
    pub input_shape: [usize; 3],
    pub layers: Vec<LayerSpec>,
}

/// Activation shape between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Spatial { h: usize, w: usize, c: usize },
    Flat(usize),
}

impl Shape {
    /// Element count, or `None` if it does not fit in `usize`.
    fn len(self) -> Option<usize> {
        match self {
            Self::Spatial { h, w, c } => h.checked_mul(w)?.checked_mul(c),
            Self::Flat(n) => Some(n),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spatial { h, w, c } => write!(f, "({h}, {w}, {c})"),
            Self::Flat(n) => write!(f, "({n})"),
        }
    }
}

/// Model file that failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("layer {index} ({kind}): {reason}")]
pub struct LayerError {
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
}

/// A layer with its input shape resolved.
#[derive(Debug, Clone)]
struct Layer {
    spec: LayerSpec,
    input: Shape,
    output: Shape,
}

/// Validated network ready for inference.
#[derive(Debug, Clone)]
pub struct Network {
    name: String,
    input: Shape,
    layers: Vec<Layer>,
    parameters: usize,
}

impl Network {
    /// Resolve every layer's shape and check that weight counts line up.
    ///
    /// # Errors
    /// Returns `LayerError` on the first inconsistent layer, or if the
    /// network does not end in a single output unit.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, LayerError> {
        if spec.format_version != FORMAT_VERSION {
            return Err(LayerError {
                index: 0,
                kind: "model",
                reason: format!("unsupported format_version {}", spec.format_version),
            });
        }

        let [h, w, c] = spec.input_shape;
        let input = Shape::Spatial { h, w, c };
        match input.len() {
            None => {
                return Err(LayerError {
                    index: 0,
                    kind: "model",
                    reason: format!("input_shape {input} is too large"),
                })
            }
            Some(0) => {
                return Err(LayerError {
                    index: 0,
                    kind: "model",
                    reason: "input_shape must be non-zero".into(),
                })
            }
            Some(_) => {}
        }

        let mut shape = input;
        let mut parameters = 0;
        let mut layers = Vec::with_capacity(spec.layers.len());

        for (index, layer) in spec.layers.into_iter().enumerate() {
            let kind = layer.kind();
            let fail = |reason: String| LayerError {
                index,
                kind,
                reason,
            };

            let output = match (&layer, shape) {
                (
                    LayerSpec::Conv2d {
                        filters,
                        kernel_size: [kh, kw],
                        weights,
                        bias,
                        ..
                    },
                    Shape::Spatial { h, w, c },
                ) => {
                    if *kh == 0 || *kw == 0 || *kh > h || *kw > w {
                        return Err(fail(format!("kernel {kh}x{kw} does not fit input {shape}")));
                    }
                    let expected = kh
                        .checked_mul(*kw)
                        .and_then(|n| n.checked_mul(c))
                        .and_then(|n| n.checked_mul(*filters))
                        .ok_or_else(|| fail(format!("weight count overflows for {filters} filters")))?;
                    if weights.len() != expected || bias.len() != *filters {
                        return Err(fail(format!(
                            "expected {expected} weights and {filters} biases, got {} and {}",
                            weights.len(),
                            bias.len()
                        )));
                    }
                    parameters += weights.len() + bias.len();
                    Shape::Spatial {
                        h: h - kh + 1,
                        w: w - kw + 1,
                        c: *filters,
                    }
                }
                (LayerSpec::MaxPool2d { pool_size: [ph, pw] }, Shape::Spatial { h, w, c }) => {
                    if *ph == 0 || *pw == 0 || *ph > h || *pw > w {
                        return Err(fail(format!("pool {ph}x{pw} does not fit input {shape}")));
                    }
                    Shape::Spatial {
                        h: h / ph,
                        w: w / pw,
                        c,
                    }
                }
                (LayerSpec::Flatten, s) => Shape::Flat(
                    s.len()
                        .ok_or_else(|| fail(format!("input {s} is too large to flatten")))?,
                ),
                (
                    LayerSpec::Dense {
                        units,
                        weights,
                        bias,
                        ..
                    },
                    Shape::Flat(n),
                ) => {
                    let expected = n
                        .checked_mul(*units)
                        .ok_or_else(|| fail(format!("weight count overflows for {units} units")))?;
                    if weights.len() != expected || bias.len() != *units {
                        return Err(fail(format!(
                            "expected {expected} weights and {units} biases, got {} and {}",
                            weights.len(),
                            bias.len()
                        )));
                    }
                    parameters += weights.len() + bias.len();
                    Shape::Flat(*units)
                }
                (_, s) => return Err(fail(format!("cannot follow activation of shape {s}"))),
            };

            if output.len().is_none() {
                return Err(fail(format!("output shape {output} is too large")));
            }

            layers.push(Layer {
                spec: layer,
                input: shape,
                output,
            });
            shape = output;
        }

        if shape != Shape::Flat(1) {
            return Err(LayerError {
                index: layers.len(),
                kind: "model",
                reason: format!("network must end in a single unit, ends in {shape}"),
            });
        }

        Ok(Self {
            name: spec.name,
            input,
            layers,
            parameters,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(height, width, channels)` of the expected input.
    #[must_use]
    pub fn input_shape(&self) -> (usize, usize, usize) {
        match self.input {
            Shape::Spatial { h, w, c } => (h, w, c),
            Shape::Flat(n) => (n, 1, 1),
        }
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters
    }

    /// Run the network on HWC input of exactly the input shape's length.
    /// Returns the single output unit.
    #[must_use]
    pub fn forward(&self, input: &[f32]) -> Option<f32> {
        if Some(input.len()) != self.input.len() {
            return None;
        }

        let mut current = input.to_vec();
        for layer in &self.layers {
            current = match (&layer.spec, layer.input) {
                (
                    LayerSpec::Conv2d {
                        filters,
                        kernel_size,
                        activation,
                        weights,
                        bias,
                    },
                    Shape::Spatial { h: _, w, c },
                ) => {
                    let mut out = conv2d(&current, w, c, layer.output, *kernel_size, *filters, weights, bias);
                    activation.apply(&mut out);
                    out
                }
                (LayerSpec::MaxPool2d { pool_size }, Shape::Spatial { w, c, .. }) => {
                    max_pool2d(&current, w, c, layer.output, *pool_size)
                }
                (LayerSpec::Flatten, _) => current,
                (
                    LayerSpec::Dense {
                        units,
                        activation,
                        weights,
                        bias,
                    },
                    Shape::Flat(_),
                ) => {
                    let mut out = dense(&current, *units, weights, bias);
                    activation.apply(&mut out);
                    out
                }
                _ => return None,
            };
        }

        current.first().copied()
    }
}

#[allow(clippy::too_many_arguments)]
fn conv2d(
    input: &[f32],
    in_w: usize,
    in_c: usize,
    output: Shape,
    [kh, kw]: [usize; 2],
    filters: usize,
    weights: &[f32],
    bias: &[f32],
) -> Vec<f32> {
    let Shape::Spatial { h: out_h, w: out_w, .. } = output else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(out_h * out_w * filters);
    for y in 0..out_h {
        for x in 0..out_w {
            let mut acc = bias.to_vec();
            for ky in 0..kh {
                for kx in 0..kw {
                    let pixel = ((y + ky) * in_w + (x + kx)) * in_c;
                    let kernel = (ky * kw + kx) * in_c;
                    for i in 0..in_c {
                        let v = input[pixel + i];
                        if v == 0.0 {
                            continue;
                        }
                        let row = &weights[(kernel + i) * filters..(kernel + i + 1) * filters];
                        for (a, wgt) in acc.iter_mut().zip(row) {
                            *a += v * wgt;
                        }
                    }
                }
            }
            out.extend_from_slice(&acc);
        }
    }
    out
}

fn max_pool2d(input: &[f32], in_w: usize, c: usize, output: Shape, [ph, pw]: [usize; 2]) -> Vec<f32> {
    let Shape::Spatial { h: out_h, w: out_w, .. } = output else {
        return Vec::new();
    };

    let mut out = vec![f32::NEG_INFINITY; out_h * out_w * c];
    for y in 0..out_h {
        for x in 0..out_w {
            let dst = (y * out_w + x) * c;
            for py in 0..ph {
                for px in 0..pw {
                    let src = ((y * ph + py) * in_w + (x * pw + px)) * c;
                    for ch in 0..c {
                        let v = input[src + ch];
                        if v > out[dst + ch] {
                            out[dst + ch] = v;
                        }
                    }
                }
            }
        }
    }
    out
}

fn dense(input: &[f32], units: usize, weights: &[f32], bias: &[f32]) -> Vec<f32> {
    let mut out = bias.to_vec();
    for (i, &v) in input.iter().enumerate() {
        if v == 0.0 {
            continue;
        }
        let row = &weights[i * units..(i + 1) * units];
        for (o, wgt) in out.iter_mut().zip(row) {
            *o += v * wgt;
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::test_support::tiny_model;
    use super::*;

    #[test]
    fn test_cic_architecture_shapes_resolve() {
        // Conv(32) → Pool → Conv(64) → Pool → Conv(128) → Pool → Flatten → Dense(128) → Dense(1)
        let conv = |cin: usize, filters: usize| LayerSpec::Conv2d {
            filters,
            kernel_size: [3, 3],
            activation: Activation::Relu,
            weights: vec![0.0; 3 * 3 * cin * filters],
            bias: vec![0.0; filters],
        };
        let pool = || LayerSpec::MaxPool2d { pool_size: [2, 2] };
        let spec = ModelSpec {
            format_version: FORMAT_VERSION,
            name: "cic_cnn".into(),
            input_shape: [128, 128, 3],
            layers: vec![
                conv(3, 32),
                pool(),
                conv(32, 64),
                pool(),
                conv(64, 128),
                pool(),
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 128,
                    activation: Activation::Relu,
                    weights: vec![0.0; 14 * 14 * 128 * 128],
                    bias: vec![0.0; 128],
                },
                LayerSpec::Dense {
                    units: 1,
                    activation: Activation::Sigmoid,
                    weights: vec![0.0; 128],
                    bias: vec![0.0],
                },
            ],
        };

        let net = Network::from_spec(spec).expect("Should validate");
        assert_eq!(net.input_shape(), (128, 128, 3));
        assert_eq!(net.layer_count(), 9);
        assert_eq!(net.layers[6].input, Shape::Spatial { h: 14, w: 14, c: 128 });
    }

    #[test]
    fn test_rejects_mismatched_weights() {
        let mut spec = tiny_model(5, 1.0);
        if let LayerSpec::Dense { weights, .. } = &mut spec.layers[3] {
            weights.pop();
        }
        let err = Network::from_spec(spec).expect_err("Should fail");
        assert_eq!(err.index, 3);
        assert_eq!(err.kind, "dense");
    }

    #[test]
    fn test_rejects_dense_before_flatten() {
        let mut spec = tiny_model(5, 1.0);
        spec.layers.remove(2);
        let err = Network::from_spec(spec).expect_err("Should fail");
        assert_eq!(err.kind, "dense");
    }

    #[test]
    fn test_oversized_dimensions_are_errors() {
        let spec = ModelSpec {
            format_version: FORMAT_VERSION,
            name: String::new(),
            input_shape: [usize::MAX / 2, usize::MAX / 2, 3],
            layers: vec![LayerSpec::Flatten],
        };
        let err = Network::from_spec(spec).expect_err("Should fail");
        assert_eq!(err.kind, "model");

        let spec = ModelSpec {
            format_version: FORMAT_VERSION,
            name: String::new(),
            input_shape: [4, 4, 3],
            layers: vec![LayerSpec::Conv2d {
                filters: usize::MAX / 4,
                kernel_size: [2, 2],
                activation: Activation::Relu,
                weights: Vec::new(),
                bias: Vec::new(),
            }],
        };
        let err = Network::from_spec(spec).expect_err("Should fail");
        assert_eq!(err.index, 0);
        assert_eq!(err.kind, "conv2d");
    }

    #[test]
    fn test_rejects_multi_unit_output() {
        let spec = ModelSpec {
            format_version: FORMAT_VERSION,
            name: String::new(),
            input_shape: [1, 1, 2],
            layers: vec![
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 2,
                    activation: Activation::Linear,
                    weights: vec![1.0; 4],
                    bias: vec![0.0; 2],
                },
            ],
        };
        assert!(Network::from_spec(spec).is_err());
    }

    #[test]
    fn test_forward_matches_hand_computation() {
        // 2x2x1 input, 1 filter of 2x2 ones, then dense identity.
        let spec = ModelSpec {
            format_version: FORMAT_VERSION,
            name: String::new(),
            input_shape: [2, 2, 1],
            layers: vec![
                LayerSpec::Conv2d {
                    filters: 1,
                    kernel_size: [2, 2],
                    activation: Activation::Linear,
                    weights: vec![1.0, 2.0, 3.0, 4.0],
                    bias: vec![0.5],
                },
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 1,
                    activation: Activation::Linear,
                    weights: vec![2.0],
                    bias: vec![-1.0],
                },
            ],
        };
        let net = Network::from_spec(spec).expect("Should validate");
        // conv = 1*1 + 2*2 + 3*3 + 4*4 + 0.5 = 30.5; dense = 2 * 30.5 - 1 = 60
        let out = net.forward(&[1.0, 2.0, 3.0, 4.0]).expect("Should run");
        assert!((out - 60.0).abs() < 1e-5);
    }

    #[test]
    fn test_max_pool_picks_maximum() {
        let out = max_pool2d(
            &[1.0, 5.0, 3.0, 2.0],
            2,
            1,
            Shape::Spatial { h: 1, w: 1, c: 1 },
            [2, 2],
        );
        assert_eq!(out, vec![5.0]);
    }

    #[test]
    fn test_sigmoid_output_bounded() {
        let net = Network::from_spec(tiny_model(6, 8.0)).expect("Should validate");
        let dark = net.forward(&vec![0.0; 6 * 6 * 3]).expect("Should run");
        let bright = net.forward(&vec![1.0; 6 * 6 * 3]).expect("Should run");
        assert!((0.0..=1.0).contains(&dark));
        assert!((0.0..=1.0).contains(&bright));
        assert!(bright > dark);
    }

    #[test]
    fn test_forward_rejects_wrong_length() {
        let net = Network::from_spec(tiny_model(5, 1.0)).expect("Should validate");
        assert!(net.forward(&[0.0; 3]).is_none());
    }

    #[test]
    fn test_model_json_roundtrip_keeps_layer_tags() {
        let json = serde_json::to_string(&tiny_model(5, 1.0)).expect("serialize");
        assert!(json.contains(r#""type":"conv2d""#));
        assert!(json.contains(r#""type":"max_pool2d""#));
        let parsed: ModelSpec = serde_json::from_str(&json).expect("parse");
        assert!(Network::from_spec(parsed).is_ok());
    }
}

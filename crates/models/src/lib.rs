//! Burn model for VSS forecasting.
//!
//! `VssModel` routes each feature family of a telemetry window through its own
//! bidirectional LSTM tower, fuses the per-timestep tower outputs with a learned
//! attention over time and maps the pooled vector to a stall probability.
//!
//! These are pure Burn Modules; training and checkpoint handling live in the
//! `training` crate.

pub mod positional;

use burn::module::Module;
use burn::nn;
use burn::tensor::activation::{sigmoid, softmax};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use serde::{Deserialize, Serialize};

pub use positional::positional_encoding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VssModelConfig {
    /// Channel count of each feature family, in window order.
    pub family_widths: Vec<usize>,
    /// Hidden size per LSTM direction.
    pub hidden: usize,
    /// Stacked bidirectional layers per tower.
    pub layers: usize,
    /// Dropout between recurrent layers.
    pub dropout: f64,
}

impl Default for VssModelConfig {
    fn default() -> Self {
        Self {
            family_widths: vec![6, 3, 2],
            hidden: 16,
            layers: 3,
            dropout: 0.0,
        }
    }
}

impl VssModelConfig {
    pub fn input_width(&self) -> usize {
        self.family_widths.iter().sum()
    }

    /// Width of the concatenated tower outputs.
    pub fn fused_width(&self) -> usize {
        self.family_widths.len() * 2 * self.hidden
    }
}

/// Bidirectional multi-layer LSTM over one contiguous channel range.
#[derive(Debug, Module)]
pub struct TowerEncoder<B: Backend> {
    layers: Vec<nn::BiLstm<B>>,
    dropout: nn::Dropout,
    offset: usize,
    width: usize,
}

impl<B: Backend> TowerEncoder<B> {
    pub fn new(
        offset: usize,
        width: usize,
        hidden: usize,
        layers: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let mut stack = Vec::with_capacity(layers.max(1));
        for layer in 0..layers.max(1) {
            let d_input = if layer == 0 { width } else { 2 * hidden };
            stack.push(nn::BiLstmConfig::new(d_input, hidden, true).init(device));
        }
        Self {
            layers: stack,
            dropout: nn::DropoutConfig::new(dropout).init(),
            offset,
            width,
        }
    }

    /// `[batch, steps, channels]` -> `[batch, steps, 2 * hidden]`, reading only this
    /// tower's channels.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, _] = input.dims();
        let mut x = input.slice([0..batch, 0..steps, self.offset..self.offset + self.width]);
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                x = self.dropout.forward(x);
            }
            let (out, _state) = layer.forward(x, None);
            x = out;
        }
        x
    }

    pub fn channels(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width
    }
}

#[derive(Debug, Module)]
pub struct VssModel<B: Backend> {
    towers: Vec<TowerEncoder<B>>,
    attention: nn::Linear<B>,
    head: nn::Linear<B>,
    fused_width: usize,
}

impl<B: Backend> VssModel<B> {
    pub fn new(cfg: &VssModelConfig, device: &B::Device) -> Self {
        let mut towers = Vec::with_capacity(cfg.family_widths.len());
        let mut offset = 0;
        for &width in &cfg.family_widths {
            towers.push(TowerEncoder::new(
                offset,
                width,
                cfg.hidden,
                cfg.layers,
                cfg.dropout,
                device,
            ));
            offset += width;
        }
        let fused_width = cfg.fused_width();
        Self {
            towers,
            attention: nn::LinearConfig::new(fused_width, 1).init(device),
            head: nn::LinearConfig::new(fused_width, 1).init(device),
            fused_width,
        }
    }

    /// Stall probability per window, shape `[batch, 1]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward_with_attention(input).0
    }

    /// Probabilities `[batch, 1]` and attention weights over time `[batch, steps]`.
    pub fn forward_with_attention(&self, input: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, steps, _] = input.dims();
        let x = self.prepare_input(input);

        let encoded: Vec<Tensor<B, 3>> = self
            .towers
            .iter()
            .map(|tower| tower.forward(x.clone()))
            .collect();
        let fused = Tensor::cat(encoded, 2);

        let scores = self.attention.forward(fused.clone());
        let weights = softmax(scores, 1);
        let pooled = (fused * weights.clone())
            .sum_dim(1)
            .reshape([batch, self.fused_width]);

        let probs = sigmoid(self.head.forward(pooled));
        (probs, weights.reshape([batch, steps]))
    }

    /// Adds the positional table, then zeroes every NaN of the sum.
    ///
    /// A missing input value therefore enters the towers as 0, while every present
    /// value carries its position.
    pub(crate) fn prepare_input(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, steps, channels] = input.dims();
        let table = positional_encoding(steps, channels);
        let pe = Tensor::<B, 2>::from_data(TensorData::new(table, [steps, channels]), &input.device())
            .reshape([1, steps, channels]);
        let x = input + pe;
        x.clone().mask_fill(x.is_nan(), 0.0)
    }

    pub fn tower_channels(&self) -> Vec<std::ops::Range<usize>> {
        self.towers.iter().map(TowerEncoder::channels).collect()
    }
}

pub mod prelude {
    pub use super::{positional_encoding, TowerEncoder, VssModel, VssModelConfig};
}

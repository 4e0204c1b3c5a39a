//! Batch iteration over a window split, producing burn tensors.

use crate::types::WindowSet;
use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::{seq::SliceRandom, SeedableRng};

pub struct WindowBatch<B: Backend> {
    /// Shape `[batch, steps, channels]`.
    pub features: Tensor<B, 3>,
    /// Shape `[batch, 1]`.
    pub labels: Tensor<B, 2>,
    /// Raw labels, kept on the host for metric bookkeeping.
    pub label_values: Vec<f32>,
}

/// Sequential batches over a split, optionally in a seeded shuffled order.
pub struct BatchIter<'a> {
    set: &'a WindowSet,
    order: Vec<usize>,
    cursor: usize,
    features_buf: Vec<f32>,
    labels_buf: Vec<f32>,
}

impl<'a> BatchIter<'a> {
    /// Visit windows in stored order.
    pub fn sequential(set: &'a WindowSet) -> Self {
        Self::from_order(set, (0..set.len()).collect())
    }

    /// Visit windows in an order permuted by `seed`.
    pub fn shuffled(set: &'a WindowSet, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..set.len()).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
        Self::from_order(set, order)
    }

    fn from_order(set: &'a WindowSet, order: Vec<usize>) -> Self {
        Self {
            set,
            order,
            cursor: 0,
            features_buf: Vec::new(),
            labels_buf: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    /// Next batch of at most `batch_size` windows; the last batch may be short.
    pub fn next_batch<B: Backend>(
        &mut self,
        batch_size: usize,
        device: &B::Device,
    ) -> Option<WindowBatch<B>> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + batch_size.max(1)).min(self.order.len());
        let slice = &self.order[self.cursor..end];
        self.cursor = end;

        self.features_buf.clear();
        self.labels_buf.clear();
        for &idx in slice {
            self.features_buf.extend_from_slice(self.set.window(idx));
            self.labels_buf.push(self.set.labels()[idx]);
        }

        let shape = self.set.shape();
        let batch = slice.len();
        let features = Tensor::<B, 3>::from_data(
            TensorData::new(
                self.features_buf.clone(),
                [batch, shape.steps, shape.channels],
            ),
            device,
        );
        let labels = Tensor::<B, 2>::from_data(
            TensorData::new(self.labels_buf.clone(), [batch, 1]),
            device,
        );
        Some(WindowBatch {
            features,
            labels,
            label_values: self.labels_buf.clone(),
        })
    }
}

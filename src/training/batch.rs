use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::parsing::Dataset;

/// Iterator over the mini-batches of one epoch
pub struct BatchLoader<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    num_batches: usize,
    next_batch: usize,
}

impl<'a> BatchLoader<'a> {
    /// Construct the batches of one epoch. When `shuffle` is set the sample order is drawn from `rng`
    pub fn new<R: Rng>(
        dataset: &'a Dataset,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        rng: &mut R,
    ) -> BatchLoader<'a> {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if shuffle {
            order.shuffle(rng);
        }

        let num_batches = if drop_last {
            order.len() / batch_size
        } else {
            order.len().div_ceil(batch_size)
        };

        BatchLoader {
            dataset,
            order,
            batch_size,
            num_batches,
            next_batch: 0,
        }
    }

    pub fn num_batches(&self) -> usize {
        self.num_batches
    }
}

impl<'a> Iterator for BatchLoader<'a> {
    type Item = (Array2<f64>, Array2<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_batch >= self.num_batches {
            return None;
        }

        let start = self.next_batch * self.batch_size;
        let end = (start + self.batch_size).min(self.order.len());
        let indices = &self.order[start..end];
        self.next_batch += 1;

        Some((
            self.dataset.data.select(Axis(0), indices),
            self.dataset.target.select(Axis(0), indices),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_batches - self.next_batch;
        (remaining, Some(remaining))
    }
}

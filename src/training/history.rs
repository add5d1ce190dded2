/// Loss and accuracy of one set (train or validation) against the global step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub loss: Vec<(usize, f64)>,
    pub accuracy: Vec<(usize, f64)>,
}

impl History {
    pub fn last_loss(&self) -> Option<f64> {
        self.loss.last().map(|&(_, loss)| loss)
    }

    pub fn last_accuracy(&self) -> Option<f64> {
        self.accuracy.last().map(|&(_, accuracy)| accuracy)
    }
}

/// The values computed at a validation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationStats {
    pub loss: f64,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
}

//! Softmax regression on MNIST, trained with mini-batch gradient descent and
//! optional L2 regularization.

pub mod error;
pub mod experiment;
pub mod model;
pub mod parsing;
pub mod report;
pub mod training;

pub use error::{Result, SoftmaxError};
pub use model::softmax::SoftmaxModel;
pub use model::Model;
pub use training::{History, Trainer, TrainerConfig};

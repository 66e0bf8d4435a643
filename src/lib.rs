pub mod client;
pub mod mnist;
pub mod predict;
pub mod proto;
pub mod tensor;

pub use client::{CallError, ClientError, ModelTarget, PredictionClient, Predictor};
pub use mnist::{load_mnist, FormatError, Mnist};
pub use predict::{predict_all, RunSummary};
pub use tensor::{image_tensor, ConversionError};

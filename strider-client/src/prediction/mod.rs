pub mod buffer;
pub mod reconcile;
pub mod smoothing;

pub use buffer::{InputBuffer, PredictionFrame};
pub use reconcile::{divergence, reconcile};
pub use smoothing::CorrectionBlend;

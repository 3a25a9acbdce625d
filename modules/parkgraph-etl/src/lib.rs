pub mod normalize;
pub mod pipeline;

pub use normalize::{normalize, normalize_at};
pub use pipeline::{EtlRun, LoadStats};

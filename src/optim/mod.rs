pub mod decay;
pub mod optimizer;

pub use decay::LrDecay;
pub use optimizer::{optimized_update, CoefState, Optimizer, UpdateParams};

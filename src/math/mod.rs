pub mod matrix;
pub mod preprocess;

pub use matrix::{Matrix, Vector};

pub mod aggregation;

pub use aggregation::Aggregation;

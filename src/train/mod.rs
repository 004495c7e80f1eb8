pub mod early_stopping;
pub mod epoch_stats;
pub mod partition;

pub use early_stopping::{EarlyStopping, Verdict};
pub use epoch_stats::EpochStats;
pub use partition::{check_dataset, partition, split_sizes, Dataset, Partition, SplitSizes};

use csv::WriterBuilder;

use crate::error::{NetworkError, Result};
use crate::network::network::Network;

impl Network {
    /// Writes the training report, one comma-separated line per item:
    ///
    /// 1. output labels
    /// 2. train loss per epoch
    /// 3. validation loss per epoch
    /// 4. metric name
    /// 5. first metric per epoch
    /// 6. second metric per epoch
    /// 7. first metric per output, on the test set with the restored weights
    /// 8. second metric per output
    /// 9. optimal epoch
    pub fn write_info(&self, path: &str) -> Result<()> {
        if self.history().is_empty() {
            return Err(NetworkError::Config("nothing to report before learn()".to_string()));
        }
        let param = self.param();
        let (real, predicted) = self.test_predictions();
        let (first_per_output, second_per_output) =
            param.metric.per_output(&real, &predicted, param.class_validity);

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)?;

        let numbers = |values: Vec<f64>| values.iter().map(f64::to_string).collect::<Vec<_>>();

        writer.write_record(self.labels())?;
        writer.write_record(numbers(self.train_losses()))?;
        writer.write_record(numbers(self.validation_losses()))?;
        writer.write_record([param.metric.name()])?;
        writer.write_record(numbers(self.history().iter().map(|s| s.first_metric).collect()))?;
        writer.write_record(numbers(self.history().iter().map(|s| s.second_metric).collect()))?;
        writer.write_record(numbers(first_per_output))?;
        writer.write_record(numbers(second_per_output))?;
        writer.write_record([self.optimal_epoch().to_string()])?;
        writer.flush()?;
        Ok(())
    }
}

pub mod network;
pub mod param;
pub mod record;
pub mod report;

pub use network::Network;
pub use param::NetworkParam;
pub use record::NetworkRecord;

pub mod bus;
pub mod cache;
pub mod correlator;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod types;
pub mod upstream;

pub use bus::{Bus, BusRecord, Headers, RdKafkaBus};
pub use cache::{FetchSideHandler, RequestSideHandler};
pub use correlator::Correlator;
pub use dedup::DedupLedger;
pub use error::{DltReason, ServiceError};
pub use pool::{PoolSettings, WorkerPool};
pub use types::{QueryKind, ReplyBody};

pub mod dispatch;
pub mod error;

pub use dispatch::run;
pub use error::WorkerError;

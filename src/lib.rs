pub mod config;
pub mod engine;
pub mod error;
pub mod quiz;

pub use config::QuizConfig;
pub use engine::QuizEngine;
pub use error::{DeliveryError, PoolError, StartError};
pub use quiz::registry::CancelOutcome;
pub use quiz::{ChatKey, DeliveryMode, SessionOutcome};

pub mod batch;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod processed;
pub mod rules;
pub mod types;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use processed::*;
pub use rules::*;
pub use types::*;

pub mod activity;
pub mod cycle;
pub mod discovery;
pub mod observer;

pub use activity::ActivityAggregator;
pub use cycle::{BotState, FlairBot};
pub use discovery::{discover_authors, fetch_and_discover};
pub use observer::{CycleEvent, CycleObserver, TracingObserver};

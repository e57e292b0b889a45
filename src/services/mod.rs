pub mod chain;
pub mod pages;
pub mod stats;

pub use chain::ChainClient;
pub use pages::{PageDirectory, PageDraft, PagePublisher, PageRegistry};
pub use stats::FlowStats;

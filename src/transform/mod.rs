// Layered transformation: runs a grammar's rules over its host graph, layer by layer,
// and tells listeners what it did.

pub mod engine;
pub mod events;
pub mod options;

pub use engine::{EngineError, LayeredTransformation, TransformationSummary};
pub use events::{Event, EventListener, LoggingListener, SubscriptionId};
pub use options::TransformationOptions;

pub mod document;
pub mod grammar;
pub mod logger;
pub mod transform;

pub use document::{GrammarDocument, LoadError, SaveError};
pub use transform::{EngineError, LayeredTransformation, TransformationOptions};

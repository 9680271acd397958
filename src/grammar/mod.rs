// Module for graph grammars: a host graph, the rules that rewrite it, and the matcher
// that finds where those rules apply.

mod condition;
pub mod host_graph;
pub mod matcher;
pub mod node;
pub mod procedures;
pub mod rule;
mod serde;
pub mod types;
pub mod validate;

pub use condition::Condition;
pub use host_graph::{EdgeId, GraphError, HostGraph, NodeId};
pub use matcher::Match;
pub use node::{Edge, Node, ToNode, Value};
pub use procedures::{ApplyResult, Procedure, ProcedureError};
pub use rule::{Nac, Pattern, PatternEdge, PatternNode, Rule};
pub use types::{AttrKind, TypeDecl, TypeSet};

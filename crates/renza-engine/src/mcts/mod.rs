//! Monte-Carlo tree search: nodes, edges, the node cache, selection
//! policies, and the tree walk itself.

mod cache;
mod node;
mod select;
mod tree;
mod value;

pub use cache::NodeCache;
pub use node::{Edge, Node, NodeKey};
pub use select::{apply_dirichlet_noise, EdgeSelector, SequentialHalving};
pub use tree::{Selection, Tree, TreeConfig};
pub use value::{ProvenValue, Value};

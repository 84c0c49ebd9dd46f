//! Node chain - one node per recognized query operation.
//!
//! The chain mirrors the fluent operator chain root-first: node 0 is the main
//! source, every later node's `source` is the node before it. Nodes are built
//! once by [`NodeFactory`] and only read during model assembly.

mod factory;

pub use factory::NodeFactory;

use crate::expression::{Expression, Lambda};
use crate::query_model::{NodeId, OrderDirection, ResultOperator};

/// Operation-specific data of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    MainSource {
        from_expression: Expression,
        item_type: Option<String>,
    },
    Where {
        predicate: Lambda,
    },
    Select {
        selector: Lambda,
    },
    SelectMany {
        collection: Lambda,
        result: Option<Lambda>,
    },
    Join {
        inner: Expression,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    },
    OrderBy {
        key: Lambda,
        direction: OrderDirection,
    },
    ThenBy {
        key: Lambda,
        direction: OrderDirection,
    },
    GroupBy {
        key: Lambda,
        element: Option<Lambda>,
    },
    ResultOperator(ResultOperator),
}

impl NodeKind {
    /// Whether applying this node adds a body or terminal clause, which
    /// forces a wrap when the model already carries result operators.
    pub fn adds_clause(&self) -> bool {
        matches!(
            self,
            NodeKind::Where { .. }
                | NodeKind::Select { .. }
                | NodeKind::SelectMany { .. }
                | NodeKind::Join { .. }
                | NodeKind::OrderBy { .. }
                | NodeKind::GroupBy { .. }
        )
    }

    /// The first lambda this node evaluates against its input element.
    pub fn input_lambda(&self) -> Option<&Lambda> {
        match self {
            NodeKind::Where { predicate } => Some(predicate),
            NodeKind::Select { selector } => Some(selector),
            NodeKind::SelectMany { collection, .. } => Some(collection),
            NodeKind::Join { outer_key, .. } => Some(outer_key),
            NodeKind::OrderBy { key, .. } | NodeKind::ThenBy { key, .. } => Some(key),
            NodeKind::GroupBy { key, .. } => Some(key),
            NodeKind::MainSource { .. } | NodeKind::ResultOperator(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub kind: NodeKind,
    /// Index of the node this one consumes; `None` for the main source.
    pub source: Option<usize>,
    /// Name of this node's output element, used for generated aliases.
    pub identifier: String,
    /// Text of the call that produced the node, for error messages.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeChain {
    pub id: u32,
    pub nodes: Vec<ExpressionNode>,
}

impl NodeChain {
    pub fn node_id(&self, index: usize) -> NodeId {
        NodeId {
            chain: self.id,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tip(&self) -> Option<&ExpressionNode> {
        self.nodes.last()
    }
}

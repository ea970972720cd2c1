pub mod compiler;

pub use compiler::compile;

use crate::value::Value;

/// Index of a node inside its template's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node matches when the main chain steps onto it.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Template root or group head; never evaluated.
    Anchor,
    /// One literal character.
    Literal(char),
    /// `_`: any number of blank or tab segments.
    SkipBlanks,
    /// `$ident`: a segment starting with a letter or digit, not quoted.
    Ident,
    /// `$value`: a value run or a quoted string.
    Value,
    /// `$rest`: everything left on the line.
    Rest,
    /// `$arg(text)`: appends a constant argument, consumes nothing.
    Inject(Value),
}

impl NodeKind {
    /// Whether this node appends an argument when traversed.
    pub fn produces_argument(&self) -> bool {
        matches!(
            self,
            NodeKind::Ident | NodeKind::Value | NodeKind::Rest | NodeKind::Inject(_)
        )
    }
}

/// A node of a compiled template.
///
/// `next` continues the main sequence, `alt` hangs an optional (`[...]`) or
/// repeatable (`<...>`) group off this node. Both children point back through
/// `parent`.
#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub next: Option<NodeId>,
    pub alt: Option<NodeId>,
    pub alt_repeatable: bool,
}

impl TemplateNode {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        TemplateNode {
            kind,
            parent,
            next: None,
            alt: None,
            alt_repeatable: false,
        }
    }
}

/// A named, compiled syntax template. Immutable once built.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    syntax: String,
    /// Arena; index 0 is the root.
    nodes: Vec<TemplateNode>,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The syntax text this template was compiled from.
    pub fn syntax(&self) -> &str {
        &self.syntax
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TemplateNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Walk parent links from `id` up to the node whose alt branch contains it.
    /// `None` when `id` sits on the root's main chain.
    pub fn branch_owner(&self, id: NodeId) -> Option<NodeId> {
        branch_owner(&self.nodes, id)
    }

    /// The literal characters that follow `id` on the main chain, provided the
    /// chain holds nothing else and no group hangs off it.
    pub fn literal_tail(&self, id: NodeId) -> Option<String> {
        let mut tail = String::new();
        let mut cursor = self.node(id).next;
        while let Some(next) = cursor {
            let node = self.node(next);
            match node.kind {
                NodeKind::Literal(c) if node.alt.is_none() => tail.push(c),
                _ => return None,
            }
            cursor = node.next;
        }
        Some(tail)
    }
}

fn branch_owner(nodes: &[TemplateNode], id: NodeId) -> Option<NodeId> {
    let mut child = id;
    let mut current = nodes[id.0].parent?;
    loop {
        if nodes[current.0].alt == Some(child) {
            return Some(current);
        }
        child = current;
        current = nodes[current.0].parent?;
    }
}

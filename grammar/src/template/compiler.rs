use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::GrammarError;
use crate::segment::is_strict_name_char;
use crate::template::{NodeId, NodeKind, Template, TemplateNode, branch_owner};
use crate::value::Value;

const START_REPEATABLE: char = '<';
const END_REPEATABLE: char = '>';
const START_OPTIONAL: char = '[';
const END_OPTIONAL: char = ']';
const PLACEHOLDER: char = '$';
const SKIP_BLANKS: char = '_';

/// Placeholder names are at most this many characters.
pub const MAX_PLACEHOLDER_LENGTH: usize = 10;

const PLACEHOLDER_NAMES: &str =
    "value, ident, rest, arg(...), lbracket, rbracket, lbrace, rbrace, dollar";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compile a syntax template into its node tree.
pub fn compile(name: &str, syntax: &str) -> Result<Template, GrammarError> {
    let mut state = CompileState::new(name, syntax);
    let mut chars = syntax.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            PLACEHOLDER => state.placeholder(pos, &mut chars)?,
            START_REPEATABLE => state.open_group(true, pos),
            START_OPTIONAL => state.open_group(false, pos),
            END_REPEATABLE => state.close_group(true, pos)?,
            END_OPTIONAL => state.close_group(false, pos)?,
            SKIP_BLANKS => {
                state.push_node(NodeKind::SkipBlanks);
            }
            _ => {
                state.push_node(NodeKind::Literal(c));
            }
        }
    }

    state.finish()
}

// ---------------------------------------------------------------------------
// Compile state
// ---------------------------------------------------------------------------

struct CompileState<'a> {
    name: &'a str,
    syntax: &'a str,
    nodes: Vec<TemplateNode>,
    /// Tip of the chain new nodes are appended to.
    current: NodeId,
    /// Byte offsets of the groups still open, innermost last.
    open_groups: Vec<usize>,
}

impl<'a> CompileState<'a> {
    fn new(name: &'a str, syntax: &'a str) -> Self {
        CompileState {
            name,
            syntax,
            nodes: vec![TemplateNode::new(NodeKind::Anchor, None)],
            current: NodeId(0),
            open_groups: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>, span: std::ops::Range<usize>) -> GrammarError {
        GrammarError::new(message, self.name, span)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TemplateNode::new(kind, Some(self.current)));
        id
    }

    /// Append a node to the main chain and make it the tip.
    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[self.current.0].next = Some(id);
        self.current = id;
        id
    }

    fn open_group(&mut self, repeatable: bool, pos: usize) {
        // A node carries one group; a second one hangs off an empty anchor
        if self.nodes[self.current.0].alt.is_some() {
            self.push_node(NodeKind::Anchor);
        }
        let head = self.alloc(NodeKind::Anchor);
        let owner = &mut self.nodes[self.current.0];
        owner.alt = Some(head);
        owner.alt_repeatable = repeatable;
        self.current = head;
        self.open_groups.push(pos);
    }

    fn close_group(&mut self, repeatable: bool, pos: usize) -> Result<(), GrammarError> {
        let closer = if repeatable { END_REPEATABLE } else { END_OPTIONAL };
        let Some(owner) = branch_owner(&self.nodes, self.current) else {
            return Err(self.error(format!("unbalanced `{}`: no group is open", closer), pos..pos + 1));
        };

        if self.nodes[owner.0].alt_repeatable != repeatable {
            let (opener, expected) = if repeatable {
                (START_OPTIONAL, END_OPTIONAL)
            } else {
                (START_REPEATABLE, END_REPEATABLE)
            };
            let open_pos = self.open_groups.last().copied().unwrap_or(pos);
            return Err(self
                .error(format!("`{}` cannot close a `{}` group", closer, opener), pos..pos + 1)
                .with_note(format!(
                    "group opened at byte {} must be closed with `{}`",
                    open_pos, expected
                )));
        }

        self.open_groups.pop();
        self.current = owner;
        Ok(())
    }

    fn placeholder(
        &mut self,
        start: usize,
        chars: &mut Peekable<CharIndices<'_>>,
    ) -> Result<(), GrammarError> {
        let name_start = start + PLACEHOLDER.len_utf8();
        let mut name_end = name_start;
        while let Some((idx, c)) = chars.next_if(|&(_, c)| is_strict_name_char(c)) {
            name_end = idx + c.len_utf8();
        }
        let name = &self.syntax[name_start..name_end];
        let span = start..name_end;

        if name.is_empty() {
            return Err(self
                .error("expected a placeholder name after `$`", start..start + 1)
                .with_note(format!("known placeholders: {}", PLACEHOLDER_NAMES)));
        }
        if name.len() > MAX_PLACEHOLDER_LENGTH {
            return Err(self.error(
                format!(
                    "placeholder name `{}` is longer than {} characters",
                    name, MAX_PLACEHOLDER_LENGTH
                ),
                span,
            ));
        }

        let kind = match name {
            "value" => NodeKind::Value,
            "ident" => NodeKind::Ident,
            "rest" => NodeKind::Rest,
            "rbracket" => NodeKind::Literal('>'),
            "lbracket" => NodeKind::Literal('<'),
            "rbrace" => NodeKind::Literal(']'),
            "lbrace" => NodeKind::Literal('['),
            "dollar" => NodeKind::Literal('$'),
            "arg" => NodeKind::Inject(self.constant_argument(start, name_end, chars)?),
            _ => {
                return Err(self
                    .error(format!("unknown placeholder `${}`", name), span)
                    .with_note(format!("known placeholders: {}", PLACEHOLDER_NAMES)));
            }
        };

        self.push_node(kind);
        Ok(())
    }

    /// Parse the `(text)` that must follow `$arg`.
    fn constant_argument(
        &self,
        start: usize,
        name_end: usize,
        chars: &mut Peekable<CharIndices<'_>>,
    ) -> Result<Value, GrammarError> {
        if chars.next_if(|&(_, c)| c == '(').is_none() {
            return Err(self.error("expected `(` after `$arg`", start..name_end));
        }

        let body = name_end + 1;
        let Some(len) = self.syntax[body..].find(')') else {
            return Err(self.error("`$arg(` is never closed with `)`", start..self.syntax.len()));
        };
        if len == 0 {
            return Err(self.error("`$arg()` needs a non-empty argument", start..body + 1));
        }

        let close = body + len;
        while chars.next_if(|&(idx, _)| idx <= close).is_some() {}
        Ok(Value::new(&self.syntax[body..close]))
    }

    fn finish(self) -> Result<Template, GrammarError> {
        if let Some(&pos) = self.open_groups.last() {
            return Err(self
                .error("group is never closed", pos..pos + 1)
                .with_note("close `<` with `>` and `[` with `]`"));
        }

        tracing::trace!(template = self.name, nodes = self.nodes.len(), "compiled template");

        Ok(Template {
            name: self.name.to_string(),
            syntax: self.syntax.to_string(),
            nodes: self.nodes,
        })
    }
}

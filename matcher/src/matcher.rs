use grammar::segment::is_strict_name_char;
use grammar::{NodeId, NodeKind, Segment, Template, Value};

/// Argument text that negates the argument after it.
pub const NEGATIVE_MARKER: &str = "_minus";

/// Position in the segment list. `offset` counts characters already consumed
/// by literal nodes inside the current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    segment: usize,
    offset: usize,
}

/// Rollback point recorded when the walk enters a group.
#[derive(Debug, Clone, Copy)]
struct Lane {
    cursor: Cursor,
    matched: bool,
    arg_count: usize,
}

enum Step {
    Continue,
    /// `$rest` consumed the line; nothing after it is visited.
    Finished,
}

/// Walk `template` over `segments`. Returns the extracted arguments if the
/// template accounts for the whole line.
///
/// Groups are tried before the main chain. Each entered group pushes a lane;
/// leaving it normally drops the lane, failing inside it restores the lane's
/// snapshot and blocks that group for the current decision.
pub fn match_template(template: &Template, segments: &[Segment]) -> Option<Vec<Value>> {
    Attempt {
        template,
        segments,
        cursor: Cursor {
            segment: 0,
            offset: 0,
        },
        matched: true,
        arguments: Vec::new(),
        lanes: Vec::new(),
    }
    .run()
}

/// Remove every `_minus` argument that has a successor and prefix that
/// successor with `-`.
pub fn fold_sign_markers(arguments: &mut Vec<Value>) {
    let mut folded = Vec::with_capacity(arguments.len());
    let mut pending = false;
    for arg in arguments.drain(..) {
        if pending {
            folded.push(arg.negated());
            pending = false;
        } else if arg == NEGATIVE_MARKER {
            pending = true;
        } else {
            folded.push(arg);
        }
    }
    if pending {
        folded.push(Value::new(NEGATIVE_MARKER));
    }
    *arguments = folded;
}

// ---------------------------------------------------------------------------
// Attempt state
// ---------------------------------------------------------------------------

struct Attempt<'a> {
    template: &'a Template,
    segments: &'a [Segment],
    cursor: Cursor,
    matched: bool,
    arguments: Vec<Value>,
    /// One entry per group on the path from the root to the current node.
    lanes: Vec<Lane>,
}

impl<'a> Attempt<'a> {
    fn run(mut self) -> Option<Vec<Value>> {
        let template = self.template;
        let mut current = template.root();
        let mut block_alt = false;

        loop {
            let node = template.node(current);
            let alt = node.alt.filter(|_| !block_alt);

            match (alt, node.next) {
                (Some(head), _) => {
                    self.lanes.push(Lane {
                        cursor: self.cursor,
                        matched: self.matched,
                        arg_count: self.arguments.len(),
                    });
                    current = head;
                    continue;
                }
                (None, Some(next)) => {
                    block_alt = false;
                    current = next;
                }
                (None, None) => {
                    let Some(lane) = self.lanes.pop() else {
                        return self.at_end().then_some(self.arguments);
                    };
                    // End of a group: back to the node it hangs off
                    let owner = template.branch_owner(current)?;
                    block_alt = !template.node(owner).alt_repeatable
                        || lane.cursor == self.cursor;
                    current = owner;
                    continue;
                }
            }

            if let Step::Finished = self.step(current) {
                tracing::trace!(template = template.name(), "rest placeholder ends match");
                return Some(self.arguments);
            }

            if !self.matched {
                let lane = self.lanes.pop()?;
                current = template.branch_owner(current)?;
                self.cursor = lane.cursor;
                self.matched = lane.matched;
                self.arguments.truncate(lane.arg_count);
                block_alt = true;
            }
        }
    }

    fn at_end(&self) -> bool {
        self.cursor.segment >= self.segments.len()
    }

    fn current_segment(&self) -> Option<&'a Segment> {
        let segments: &'a [Segment] = self.segments;
        segments.get(self.cursor.segment)
    }

    /// The current segment, unless literal nodes already consumed part of it.
    fn segment_start(&self) -> Option<&'a Segment> {
        if self.cursor.offset == 0 {
            self.current_segment()
        } else {
            None
        }
    }

    fn next_segment(&mut self) {
        self.cursor.segment += 1;
        self.cursor.offset = 0;
    }

    /// Evaluate the node the main chain just stepped onto.
    fn step(&mut self, id: NodeId) -> Step {
        let template = self.template;
        match &template.node(id).kind {
            NodeKind::Anchor => {}
            NodeKind::SkipBlanks => {
                if self.cursor.offset == 0 {
                    while self.current_segment().is_some_and(Segment::is_blank) {
                        self.next_segment();
                    }
                }
            }
            NodeKind::Literal(c) => self.literal(*c),
            NodeKind::Inject(value) => self.arguments.push(value.clone()),
            NodeKind::Ident => match self.segment_start() {
                Some(Segment::Run(run)) if run.starts_with(is_strict_name_char) => {
                    self.arguments.push(Value::new(run.as_str()));
                    self.next_segment();
                }
                _ => self.matched = false,
            },
            NodeKind::Value => match self.segment_start() {
                Some(Segment::Run(text) | Segment::Quoted(text)) => {
                    self.arguments.push(Value::new(text.as_str()));
                    self.next_segment();
                }
                _ => self.matched = false,
            },
            NodeKind::Rest => {
                if self.at_end() {
                    self.matched = false;
                } else {
                    let text = self.rest_text(id);
                    self.arguments.push(Value::new(text));
                    return Step::Finished;
                }
            }
        }
        Step::Continue
    }

    fn literal(&mut self, expected: char) {
        let Some(segment) = self.current_segment() else {
            self.matched = false;
            return;
        };
        let found = match segment {
            Segment::Run(run) => run[self.cursor.offset..].chars().next(),
            Segment::Symbol(c) => Some(*c),
            Segment::Quoted(_) => None,
        };
        if found != Some(expected) {
            self.matched = false;
            return;
        }
        self.cursor.offset += 1;
        if self.cursor.offset >= segment.literal_len() {
            self.next_segment();
        }
    }

    /// Join everything from the cursor to the end of the line. Quoted strings
    /// get both quotes back. Trailing template literals are trimmed off when
    /// the line ends with them.
    fn rest_text(&self, id: NodeId) -> String {
        let mut text = String::new();
        for (i, segment) in self.segments[self.cursor.segment..].iter().enumerate() {
            match segment {
                Segment::Run(run) if i == 0 => text.push_str(&run[self.cursor.offset..]),
                Segment::Quoted(quoted) => {
                    text.push('"');
                    text.push_str(quoted);
                    text.push('"');
                }
                other => text.push_str(&other.text()),
            }
        }

        if let Some(tail) = self.template.literal_tail(id) {
            if !tail.is_empty() && text.ends_with(&tail) {
                text.truncate(text.len() - tail.len());
            }
        }
        text
    }
}

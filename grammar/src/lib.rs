pub mod error;
pub mod segment;
pub mod template;
pub mod value;

pub use error::{ConversionError, GrammarError, TokenizeError};
pub use segment::{Segment, tokenize};
pub use template::{NodeId, NodeKind, Template, TemplateNode, compile};
pub use value::Value;

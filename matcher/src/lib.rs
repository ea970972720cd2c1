pub mod error;
pub mod line;
pub mod matcher;
pub mod registry;
pub mod reload;

pub use error::{LineError, LoaderError, ReloadError};
pub use line::LineMatch;
pub use matcher::{NEGATIVE_MARKER, fold_sign_markers, match_template};
pub use registry::TemplateRegistry;
pub use reload::{FileRegistry, ReloadStatus};

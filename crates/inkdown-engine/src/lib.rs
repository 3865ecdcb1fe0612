pub mod editing;
pub mod error;
pub mod io;
pub mod parsing;
pub mod serialize;
pub mod tree;
pub mod view;
pub mod widgets;


// Re-export key types for easier usage
pub use editing::{EditSession, KeyInput, SessionConfig, SessionState, ViewMode};
pub use error::{EditorError, Notification};
pub use io::{FsStorage, MemoryStorage, Storage};
pub use parsing::{parse, parse_with_images};
pub use serialize::serialize;
pub use tree::{Node, NodeKind, NodePath};

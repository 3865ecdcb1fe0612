//! # Editing
//!
//! Everything that changes a document while it is open:
//!
//! - **`surface`**: the tree plus a caret, with the primitive edits a
//!   rich-text widget performs (typing, Enter, Backspace, arrows)
//! - **`caret`**: caret positions that survive structural changes
//! - **`autoformat`**: typed markdown syntax turned into structure
//! - **`guard`**: refuses writes that would silently wipe a file
//! - **`session`**: the per-document controller tying these to storage,
//!   debounced saving and the widget layer

pub mod autoformat;
pub mod caret;
pub mod guard;
pub mod session;
pub mod surface;

pub use autoformat::{FullRenderReason, Outcome, Trigger, autoformat};
pub use caret::{Bias, Caret};
pub use session::{
    AutoformatTriggers, EditSession, KeyInput, SessionConfig, SessionState, ViewMode,
};
pub use surface::Surface;

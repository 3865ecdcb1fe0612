//! # Edit Session
//!
//! One open document: its editable surface, the markdown buffer that mirrors
//! it, and the bookkeeping that gets that markdown safely to storage.
//!
//! ## Lifecycle
//!
//! ```text
//! Closed ─open─▶ Loading ─▶ Viewing ─(enable delay)─▶ Editing ◀─▶ Saving
//!    ▲                                                   │
//!    └─────────────────────────close─────────────────────┘
//! ```
//!
//! The session never reads a clock. Every time-dependent call takes `now`
//! and the host drives [`EditSession::tick`], which flips a freshly opened
//! document to editable and fires the debounced save.
//!
//! ## Saving
//!
//! Every edit re-serializes the tree into the markdown buffer and
//! (re)schedules one save for the file that was active at the time. Saves
//! pass the shrink guard first. Navigating away flushes a pending save before
//! the storage collaborator hears about the navigation.
//!
//! Widget actions (checkboxes, image resize, code language) go through the
//! markdown source and save immediately; they run inside
//! [`EditSession::with_suppressed_edit_notification`] so they never count as
//! typed edits.

use crate::editing::autoformat::{self, FullRenderReason, Outcome, Trigger};
use crate::editing::caret::{self, Caret};
use crate::editing::guard;
use crate::editing::surface::Surface;
use crate::error::{ConversionError, EditorError, Notification};
use crate::io::Storage;
use crate::parsing::images::ImageResolver;
use crate::parsing::{parse, parse_with_images};
use crate::serialize::{serialize, serialize_with_raw};
use crate::tree::{ImageAttrs, Node, NodeKind, NodePath};
use crate::widgets::image::ImageResize;
use crate::widgets::{self, checkbox, code_language, image};
use relative_path::{RelativePath, RelativePathBuf};
use std::ops::Range;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Loading,
    /// Rendered, not yet accepting input.
    Viewing,
    Editing,
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Rich,
    /// Raw markdown shown beside a frozen surface.
    Raw,
}

/// Which inputs run the autoformatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoformatTriggers {
    pub on_space: bool,
    pub on_enter: bool,
    pub on_printable: bool,
    pub on_paste: bool,
}

impl Default for AutoformatTriggers {
    fn default() -> Self {
        Self {
            on_space: true,
            on_enter: true,
            on_printable: true,
            on_paste: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub save_debounce: Duration,
    /// Delay between the first paint and accepting keystrokes.
    pub enable_delay: Duration,
    pub triggers: AutoformatTriggers,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(500),
            enable_delay: Duration::from_millis(50),
            triggers: AutoformatTriggers::default(),
        }
    }
}

/// Keys the surface intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter { shift: bool },
    Backspace,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone)]
struct PendingSave {
    path: RelativePathBuf,
    markdown: String,
    due: Instant,
}

type ContentListener = Box<dyn FnMut(&str)>;

pub struct EditSession<S: Storage> {
    storage: S,
    config: SessionConfig,
    state: SessionState,
    view: ViewMode,
    /// `None` for documents not backed by storage.
    path: Option<RelativePathBuf>,
    surface: Surface,
    /// Markdown of the surface as of the last mutation.
    markdown: String,
    /// Content last read from or written to storage; the guard's baseline.
    last_saved: String,
    enable_at: Option<Instant>,
    pending_save: Option<PendingSave>,
    resize: Option<(NodePath, ImageResize)>,
    suppress_depth: usize,
    notifications: Vec<Notification>,
    listeners: Vec<ContentListener>,
}

impl<S: Storage> EditSession<S> {
    pub fn new(storage: S, config: SessionConfig) -> Self {
        Self {
            storage,
            config,
            state: SessionState::Closed,
            view: ViewMode::Rich,
            path: None,
            surface: Surface::default(),
            markdown: String::new(),
            last_saved: String::new(),
            enable_at: None,
            pending_save: None,
            resize: None,
            suppress_depth: 0,
            notifications: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn path(&self) -> Option<&RelativePath> {
        self.path.as_deref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Place the caret, e.g. after a click.
    pub fn set_caret(&mut self, caret: Caret) {
        self.surface.set_caret(caret);
    }

    /// Markdown for the current tree; in sync after every mutation.
    pub fn current_markdown(&self) -> &str {
        &self.markdown
    }

    /// Called with the new markdown after every edit that schedules a save.
    pub fn on_content_changed(&mut self, listener: impl FnMut(&str) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Open a file from storage. A failed read leaves the current document
    /// untouched.
    pub fn open(&mut self, path: impl Into<RelativePathBuf>, now: Instant) -> Result<(), EditorError> {
        let path = path.into();
        let previous = self.state;
        self.state = SessionState::Loading;
        let text = match self.storage.read_file(&path) {
            Ok(text) => text,
            Err(e) => {
                self.state = previous;
                let error = EditorError::from(e);
                self.notify(&error);
                return Err(error);
            }
        };
        self.leave_current();
        log::info!("opened {path}");
        self.path = Some(path);
        self.load(text, now);
        Ok(())
    }

    /// Open an in-memory document. Nothing is ever saved for it.
    pub fn open_document(&mut self, text: &str, now: Instant) {
        self.leave_current();
        self.state = SessionState::Loading;
        self.load(text.to_string(), now);
    }

    fn load(&mut self, text: String, now: Instant) {
        self.surface = Surface::new(self.build_tree(&text));
        self.markdown = text.clone();
        self.last_saved = text;
        self.view = ViewMode::Rich;
        self.resize = None;
        self.pending_save = None;
        self.enable_at = Some(now + self.config.enable_delay);
        self.state = SessionState::Viewing;
    }

    fn build_tree(&self, markdown: &str) -> Node {
        let mut root = match (self.storage.notes_root(), &self.path) {
            (Some(base), Some(path)) => {
                parse_with_images(markdown, &ImageResolver::new(base, path.clone()))
            }
            _ => parse(markdown),
        };
        widgets::attach(&mut root);
        root
    }

    /// Advance the session's timers.
    pub fn tick(&mut self, now: Instant) {
        if self.state == SessionState::Viewing
            && self.view == ViewMode::Rich
            && self.enable_at.is_some_and(|at| now >= at)
        {
            self.enable_at = None;
            self.state = SessionState::Editing;
            self.surface.editable = true;
            log::debug!("editing enabled");
        }
        if self.pending_save.as_ref().is_some_and(|p| now >= p.due)
            && let Err(e) = self.write_pending()
        {
            self.notify(&e);
        }
    }

    /// Write any unsaved change now: the pending save, or a buffer that a
    /// failed save left behind.
    pub fn flush(&mut self) -> Result<(), EditorError> {
        let result = self.write_unsaved();
        if let Err(e) = &result {
            self.notify(e);
        }
        result
    }

    fn write_unsaved(&mut self) -> Result<(), EditorError> {
        if self.pending_save.is_some() {
            return self.write_pending();
        }
        match self.path.clone() {
            Some(path) if self.markdown != self.last_saved => {
                let markdown = self.markdown.clone();
                self.persist(&path, &markdown)
            }
            _ => Ok(()),
        }
    }

    fn write_pending(&mut self) -> Result<(), EditorError> {
        match self.pending_save.take() {
            Some(pending) => self.persist(&pending.path, &pending.markdown),
            None => Ok(()),
        }
    }

    fn persist(&mut self, path: &RelativePath, markdown: &str) -> Result<(), EditorError> {
        guard::check_write(&self.last_saved, markdown)?;
        let resume = self.state;
        self.state = SessionState::Saving;
        let written = self.storage.write_file(path, markdown);
        self.state = resume;
        written?;
        self.last_saved = markdown.to_string();
        log::info!("saved {path}");
        Ok(())
    }

    /// Save immediately, replacing any pending save.
    fn save_now(&mut self, markdown: &str) -> Result<(), EditorError> {
        self.pending_save = None;
        match self.path.clone() {
            Some(path) => self.persist(&path, markdown),
            None => Ok(()),
        }
    }

    fn leave_current(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("left document with unsaved changes: {e}");
        }
        if let Some(path) = self.path.take()
            && let Err(e) = self.storage.navigated_away(&path)
        {
            self.notify(&EditorError::from(e));
        }
    }

    pub fn close(&mut self) {
        self.leave_current();
        self.surface = Surface::default();
        self.markdown.clear();
        self.last_saved.clear();
        self.view = ViewMode::Rich;
        self.enable_at = None;
        self.resize = None;
        self.state = SessionState::Closed;
    }

    fn accepts_input(&self) -> bool {
        self.state == SessionState::Editing && self.view == ViewMode::Rich && self.surface.editable
    }

    /// Handle a key the surface intercepts. Returns false when the key was
    /// not consumed and the host should handle it.
    pub fn handle_key(&mut self, key: KeyInput, now: Instant) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let edited = match key {
            KeyInput::Char(c) => {
                self.surface.insert_text(c.encode_utf8(&mut [0; 4]));
                let triggers = self.config.triggers;
                let wanted = if c.is_whitespace() {
                    triggers.on_space
                } else {
                    triggers.on_printable
                };
                if wanted {
                    self.autoformat(Trigger::Keystroke);
                }
                true
            }
            KeyInput::Enter { shift: true } => {
                self.surface.insert_line_break();
                true
            }
            KeyInput::Enter { shift: false } => {
                self.enter();
                true
            }
            KeyInput::Backspace => self.surface.delete_backward(),
            KeyInput::ArrowLeft => {
                self.surface.move_left();
                return true;
            }
            KeyInput::ArrowRight => {
                self.surface.move_right();
                return true;
            }
            KeyInput::ArrowDown => return self.surface.exit_code_block_down(),
            KeyInput::ArrowUp => return false,
        };
        if edited {
            self.content_edited(now);
        }
        edited
    }

    fn enter(&mut self) {
        if self.config.triggers.on_enter {
            match self.autoformat(Trigger::Enter) {
                Outcome::Applied {
                    rule: "heading" | "thematic-break",
                    ..
                }
                | Outcome::FullRender(_) => return,
                _ => {}
            }
        }
        if self.surface.enter_in_list_item() || self.surface.enter_in_blockquote() {
            return;
        }
        self.surface.split_block();
    }

    /// Insert pasted text and re-render so pasted markdown is formatted.
    pub fn handle_paste(&mut self, text: &str, now: Instant) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.surface.insert_text(text);
        if self.config.triggers.on_paste {
            self.full_render(FullRenderReason::Paste);
        }
        self.content_edited(now);
        true
    }

    /// Run the autoformatter at the caret, rolling the surface back if the
    /// transform fails.
    fn autoformat(&mut self, trigger: Trigger) -> Outcome {
        let Some(caret) = self.surface.valid_caret() else {
            return Outcome::Suppressed;
        };
        let offset = self.surface.caret_offset();
        let snapshot = self.surface.clone();

        match autoformat::autoformat(&mut self.surface.root, &caret, trigger) {
            Ok(Outcome::Applied { rule, caret }) => {
                self.surface.set_caret(caret.clone());
                Outcome::Applied { rule, caret }
            }
            Ok(Outcome::FullRender(reason)) => {
                self.full_render(reason);
                Outcome::FullRender(reason)
            }
            Ok(outcome) => {
                if self.surface.valid_caret().is_none() {
                    self.surface.caret = offset.and_then(|o| caret::restore(&self.surface.root, o));
                }
                outcome
            }
            Err(e) => {
                log::warn!("autoformat rolled back: {e}");
                self.surface = snapshot;
                self.notify(&EditorError::from(e));
                Outcome::NoMatch
            }
        }
    }

    /// Rebuild the whole tree from its own markdown.
    fn full_render(&mut self, reason: FullRenderReason) {
        log::debug!("full render: {reason:?}");
        let raw = self.typed_blocks(reason);
        match serialize_with_raw(&self.surface.root, raw) {
            Ok(markdown) => {
                self.rerender(&markdown);
                if reason != FullRenderReason::Paste {
                    self.move_caret_out_of_code();
                }
            }
            Err(e) => self.notify(&EditorError::from(e)),
        }
    }

    /// Top-level blocks whose text was just typed as markdown syntax: the
    /// caret block, plus the pending fence or table rows it completes.
    fn typed_blocks(&self, reason: FullRenderReason) -> Range<usize> {
        let Some(current) = self
            .surface
            .valid_caret()
            .and_then(|caret| caret.path.indices().first().copied())
        else {
            return 0..0;
        };
        let blocks = self.surface.root.children.get(..current).unwrap_or(&[]);
        let fence_pending =
            |n: &Node| matches!(&n.kind, NodeKind::Paragraph(marks) if marks.fence_open.is_some());
        let start = match reason {
            FullRenderReason::FenceClosed => blocks
                .iter()
                .position(|block| fence_pending(block) || block.find(&fence_pending).is_some())
                .unwrap_or(current),
            FullRenderReason::TableRow => {
                let rows = blocks
                    .iter()
                    .rev()
                    .take_while(|block| {
                        matches!(block.kind, NodeKind::Paragraph(_))
                            && block.text_content().trim_start().starts_with('|')
                    })
                    .count();
                current - rows
            }
            FullRenderReason::InlineFence | FullRenderReason::Paste => current,
        };
        start..current + 1
    }

    /// Replace the tree with one parsed from `markdown`, keeping the caret at
    /// the same document offset.
    fn rerender(&mut self, markdown: &str) {
        let offset = self.surface.caret_offset();
        self.surface.root = self.build_tree(markdown);
        self.surface.caret = offset.and_then(|o| caret::restore(&self.surface.root, o));
        self.markdown = markdown.to_string();
    }

    fn move_caret_out_of_code(&mut self) {
        let Some(caret) = self.surface.valid_caret() else {
            return;
        };
        let in_code = self
            .surface
            .root
            .closest(&caret.path, |k| matches!(k, NodeKind::CodeBlock { .. }));
        if let Some(code) = in_code
            && let Some(&top) = code.indices().first()
        {
            let caret = caret::place_after_block(&mut self.surface.root, top);
            self.surface.set_caret(caret);
        }
    }

    /// Re-render from `markdown`. Skipped while editing unless `force`d, so
    /// the caret does not jump under the user.
    pub fn render(&mut self, markdown: &str, force: bool) -> bool {
        if self.state == SessionState::Editing && !force {
            log::debug!("render skipped while editing");
            return false;
        }
        self.rerender(markdown);
        true
    }

    fn sync_markdown(&mut self) -> Result<(), ConversionError> {
        let markdown = serialize(&self.surface.root)?;
        if markdown.trim().is_empty() && !self.surface.root.is_visibly_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        self.markdown = markdown;
        Ok(())
    }

    fn content_edited(&mut self, now: Instant) {
        match self.sync_markdown() {
            Ok(()) => self.publish(now),
            Err(e) => {
                log::error!("keeping last good markdown: {e}");
                self.notify(&EditorError::from(e));
            }
        }
    }

    /// Tell listeners about the buffer and schedule its save.
    fn publish(&mut self, now: Instant) {
        if self.suppress_depth > 0 {
            return;
        }
        for listener in &mut self.listeners {
            listener(&self.markdown);
        }
        if let Some(path) = &self.path {
            self.pending_save = Some(PendingSave {
                path: path.clone(),
                markdown: self.markdown.clone(),
                due: now + self.config.save_debounce,
            });
        }
    }

    /// Switch between the rich surface and raw markdown.
    pub fn toggle_code_view(&mut self, now: Instant) -> ViewMode {
        if self.state == SessionState::Closed {
            return self.view;
        }
        match self.view {
            ViewMode::Rich => {
                if let Err(e) = self.sync_markdown() {
                    self.notify(&EditorError::from(e));
                    return self.view;
                }
                self.surface.editable = false;
                self.view = ViewMode::Raw;
            }
            ViewMode::Raw => {
                let markdown = self.markdown.clone();
                self.rerender(&markdown);
                self.view = ViewMode::Rich;
                self.state = SessionState::Viewing;
                self.enable_at = Some(now + self.config.enable_delay);
            }
        }
        self.view
    }

    /// Replace the markdown while the raw view is shown.
    pub fn edit_raw(&mut self, text: &str, now: Instant) -> bool {
        if self.view != ViewMode::Raw {
            return false;
        }
        self.markdown = text.to_string();
        self.publish(now);
        true
    }

    /// Run `f` with content-changed listeners and debounced saves muted.
    pub fn with_suppressed_edit_notification<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.suppress_depth += 1;
        let result = f(self);
        self.suppress_depth -= 1;
        result
    }

    fn widget_action<R>(
        &mut self,
        action: impl FnOnce(&mut Self) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        let result = if self.state == SessionState::Closed {
            Err(EditorError::NoDocument)
        } else {
            self.with_suppressed_edit_notification(action)
        };
        if let Err(e) = &result {
            self.notify(e);
        }
        result
    }

    /// Flip the `index`th checkbox in the stored markdown. Returns the new
    /// state.
    pub fn toggle_checkbox(&mut self, index: usize) -> Result<bool, EditorError> {
        self.widget_action(|session| {
            session.write_unsaved()?;
            let source = match &session.path {
                Some(path) => session.storage.read_file(path)?,
                None => session.markdown.clone(),
            };
            if source.trim().is_empty() {
                return Err(EditorError::CheckboxNotFound(index));
            }
            let (updated, checked) =
                checkbox::toggle_nth(&source, index).ok_or(EditorError::CheckboxNotFound(index))?;
            session.save_now(&updated)?;
            session.rerender(&updated);
            Ok(checked)
        })
    }

    /// Set the language of the code block at `block` (the block or its
    /// wrapper).
    pub fn set_code_language(&mut self, block: &NodePath, language: &str) -> Result<(), EditorError> {
        self.widget_action(|session| {
            let code = session
                .surface
                .root
                .get(block)
                .and_then(code_block_within)
                .map(Node::text_content)
                .ok_or(EditorError::CodeBlockNotFound)?;
            session.sync_markdown()?;
            let updated = code_language::set_language(&session.markdown, &code, language)
                .ok_or(EditorError::CodeBlockNotFound)?;
            session.save_now(&updated)?;
            session.rerender(&updated);
            Ok(())
        })
    }

    /// Start dragging the resize handle of the image at `image`.
    pub fn begin_image_resize(
        &mut self,
        image: NodePath,
        start_x: f64,
        start_width: u32,
        surface_width: u32,
    ) -> Result<(), EditorError> {
        if image_attrs(&mut self.surface.root, &image).is_none() {
            let error = EditorError::ImageNotFound(format!("{:?}", image.indices()));
            self.notify(&error);
            return Err(error);
        }
        self.resize = Some((image, ImageResize::begin(start_x, start_width, surface_width)));
        Ok(())
    }

    /// Live width while dragging; only the view changes.
    pub fn drag_image_resize(&mut self, x: f64) -> Option<u32> {
        let (path, resize) = self.resize.as_mut()?;
        let width = resize.drag_to(x);
        if let Some(attrs) = image_attrs(&mut self.surface.root, path) {
            attrs.width = Some(width);
        }
        Some(width)
    }

    /// Release the handle: write `=WIDTHx` into the markdown. Returns the
    /// final width, or `None` when no drag was in progress.
    pub fn finish_image_resize(&mut self) -> Result<Option<u32>, EditorError> {
        let Some((path, resize)) = self.resize.take() else {
            return Ok(None);
        };
        self.widget_action(|session| {
            let original = image_attrs(&mut session.surface.root, &path)
                .map(|attrs| attrs.markdown_path().to_string())
                .ok_or_else(|| EditorError::ImageNotFound(format!("{:?}", path.indices())))?;
            let width = resize.width();
            let updated = image::set_width(&session.markdown, &original, width)
                .ok_or_else(|| EditorError::ImageNotFound(original.clone()))?;
            if updated != session.markdown {
                session.save_now(&updated)?;
                session.rerender(&updated);
            }
            Ok(Some(width))
        })
    }

    fn notify(&mut self, error: &EditorError) {
        log::error!("{error}");
        self.notifications.push(Notification::from_error(error));
    }
}

fn code_block_within(node: &Node) -> Option<&Node> {
    if matches!(node.kind, NodeKind::CodeBlock { .. }) {
        return Some(node);
    }
    let path = node.find(&|n| matches!(n.kind, NodeKind::CodeBlock { .. }))?;
    node.get(&path)
}

fn image_attrs<'a>(root: &'a mut Node, path: &NodePath) -> Option<&'a mut ImageAttrs> {
    let node = root.get_mut(path)?;
    let node = match node.kind {
        NodeKind::ImageWrapper => node.children.first_mut()?,
        _ => node,
    };
    match &mut node.kind {
        NodeKind::Image(attrs) => Some(attrs),
        _ => None,
    }
}

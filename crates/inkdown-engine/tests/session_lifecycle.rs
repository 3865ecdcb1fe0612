use inkdown_engine::{
    EditSession, FsStorage, KeyInput, MemoryStorage, NodeKind, NodePath, SessionConfig,
    SessionState, Storage, ViewMode,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn editing<S: Storage>(storage: S, path: &str) -> (EditSession<S>, Instant) {
    let start = Instant::now();
    let mut session = EditSession::new(storage, SessionConfig::default());
    session.open(path, start).unwrap();
    let now = start + Duration::from_millis(50);
    session.tick(now);
    assert_eq!(session.state(), SessionState::Editing);
    (session, now)
}

fn type_text<S: Storage>(session: &mut EditSession<S>, text: &str, now: Instant) {
    for c in text.chars() {
        let key = match c {
            '\n' => KeyInput::Enter { shift: false },
            c => KeyInput::Char(c),
        };
        session.handle_key(key, now);
    }
}

#[test]
fn guard_refuses_to_empty_a_note() {
    // Given
    let original = "a".repeat(200);
    let storage = MemoryStorage::new().with_file("long.md", original.clone());
    let (mut session, now) = editing(storage, "long.md");

    // When
    assert_eq!(session.toggle_code_view(now), ViewMode::Raw);
    assert!(session.edit_raw("", now));
    let result = session.flush();

    // Then
    assert!(result.is_err());
    assert!(session.storage().writes.is_empty());
    assert_eq!(session.storage().content("long.md"), Some(original.as_str()));
    let notes = session.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Save Prevented");
}

#[test]
fn toggling_third_checkbox_saves_immediately() {
    // Given
    let storage = MemoryStorage::new().with_file("todo.md", "- [ ] a\n- [ ] b\n- [ ] c\n");
    let (mut session, _) = editing(storage, "todo.md");

    // When
    let checked = session.toggle_checkbox(2).unwrap();

    // Then
    assert!(checked);
    assert_eq!(
        session.storage().content("todo.md"),
        Some("- [ ] a\n- [ ] b\n- [x] c\n")
    );
    let boxes = session
        .surface()
        .root
        .find_all(&|n| matches!(n.kind, NodeKind::Checkbox { .. }));
    assert_eq!(boxes.len(), 3);
    let third = session.surface().root.get(&boxes[2]).unwrap();
    assert_eq!(third.kind, NodeKind::Checkbox { checked: true });
    assert!(!session.has_pending_save());
}

#[test]
fn enter_after_heading_leaves_no_blank_line() {
    // Given
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", ""), "a.md");

    // When
    type_text(&mut session, "## Hello\n", now);
    session.tick(now + Duration::from_secs(1));

    // Then
    assert_eq!(session.storage().content("a.md"), Some("## Hello\n"));
    assert_eq!(session.surface().root.children[0].kind, NodeKind::Heading(2));
}

#[test]
fn enter_after_hashtag_keeps_a_paragraph() {
    // Given
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", ""), "a.md");

    // When
    type_text(&mut session, "#tag\n", now);
    session.tick(now + Duration::from_secs(1));

    // Then
    let root = &session.surface().root;
    assert!(root.find(&|n| matches!(n.kind, NodeKind::Heading(_))).is_none());
    assert!(matches!(root.children[0].kind, NodeKind::Paragraph(_)));
    assert_eq!(root.children[0].text_content(), "#tag");
    assert_eq!(session.storage().content("a.md"), Some("#tag\n"));
}

#[test]
fn literal_markdown_characters_survive_reopening() {
    // Given
    let storage = MemoryStorage::new()
        .with_file("a.md", "")
        .with_file("b.md", "other\n");
    let (mut session, now) = editing(storage, "a.md");
    type_text(&mut session, "a *b [c", now);
    session.tick(now + Duration::from_secs(1));
    assert_eq!(session.storage().content("a.md"), Some("a \\*b \\[c\n"));

    // When
    session.open("b.md", now + Duration::from_secs(2)).unwrap();
    session.open("a.md", now + Duration::from_secs(3)).unwrap();
    session.tick(now + Duration::from_secs(4));

    // Then
    let root = &session.surface().root;
    assert!(root.find(&|n| n.kind == NodeKind::Emphasis).is_none());
    assert_eq!(root.children[0].text_content(), "a *b [c");
}

#[test]
fn bold_italic_is_wrapped_once() {
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", ""), "a.md");

    type_text(&mut session, "***bold*** ", now);

    assert_eq!(session.current_markdown().trim_end(), "***bold***");
    let strong = session
        .surface()
        .root
        .find(&|n| n.kind == NodeKind::Strong)
        .unwrap();
    let nested = session.surface().root.get(&strong).unwrap();
    assert_eq!(nested.children[0].kind, NodeKind::Emphasis);
}

#[test]
fn typed_fence_becomes_code_block_with_caret_after_it() {
    // Given
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", "intro\n"), "a.md");

    // When
    type_text(&mut session, "\n```rust\nlet x = 1;\n```", now);

    // Then
    let root = &session.surface().root;
    assert_eq!(root.children[1].kind, NodeKind::Gap);
    assert_eq!(root.children[2].kind, NodeKind::CodeBlockWrapper);
    let code = root
        .find(&|n| matches!(n.kind, NodeKind::CodeBlock { .. }))
        .unwrap();
    assert_eq!(root.get(&code).unwrap().text_content(), "let x = 1;");
    let caret = session.surface().caret.clone().unwrap();
    assert_eq!(caret.path, NodePath::from(vec![3, 0]));
    assert_eq!(caret.offset, 0);
    assert_eq!(session.current_markdown(), "intro\n\n```rust\nlet x = 1;\n```\n");
}

#[test]
fn pasted_markdown_is_formatted() {
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", ""), "a.md");

    assert!(session.handle_paste("**bold** text", now));

    assert_eq!(session.current_markdown(), "**bold** text\n");
    assert!(session.surface().root.find(&|n| n.kind == NodeKind::Strong).is_some());
}

#[test]
fn navigating_away_flushes_pending_save() {
    // Given
    let storage = MemoryStorage::new()
        .with_file("a.md", "first\n")
        .with_file("b.md", "second\n");
    let (mut session, now) = editing(storage, "a.md");
    type_text(&mut session, "!", now);
    assert!(session.has_pending_save());

    // When
    session.open("b.md", now + Duration::from_millis(10)).unwrap();

    // Then
    assert_eq!(session.storage().content("a.md"), Some("first!\n"));
    assert_eq!(session.storage().departures.len(), 1);
    assert_eq!(session.storage().departures[0].as_str(), "a.md");
    assert_eq!(session.path().map(|p| p.as_str()), Some("b.md"));
    assert!(!session.has_pending_save());
}

#[test]
fn rapid_typing_saves_once() {
    let (mut session, now) = editing(MemoryStorage::new().with_file("a.md", "x\n"), "a.md");

    for (i, c) in "yz".chars().enumerate() {
        session.handle_key(KeyInput::Char(c), now + Duration::from_millis(100 * i as u64));
    }
    session.tick(now + Duration::from_millis(400));
    assert!(session.storage().writes.is_empty());
    session.tick(now + Duration::from_millis(700));

    assert_eq!(session.storage().writes.len(), 1);
    assert_eq!(session.storage().content("a.md"), Some("xyz\n"));
}

#[test]
fn filesystem_session_writes_through() {
    // Given
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("note.md"), "# Note\n\n- item\n").unwrap();
    let storage = FsStorage::new(dir.path()).unwrap();
    let (mut session, now) = editing(storage, "note.md");

    // When
    type_text(&mut session, "s", now);
    session.close();

    // Then
    let saved = std::fs::read_to_string(dir.path().join("note.md")).unwrap();
    assert_eq!(saved, "# Note\n\n- items\n\n");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.storage().history().len(), 1);
}

use inkdown_engine::tree::outline;
use inkdown_engine::{NodeKind, parse, serialize, widgets};
use pretty_assertions::assert_eq;

#[test]
fn fixture_headings_and_paragraphs() {
    assert_fixture("headings_and_paragraphs");
}

#[test]
fn fixture_lists() {
    assert_fixture("lists");
}

#[test]
fn fixture_tasks_and_quotes() {
    assert_fixture("tasks_and_quotes");
}

#[test]
fn fixture_code_and_images() {
    assert_fixture("code_and_images");
}

#[test]
fn fixture_table() {
    assert_fixture("table");
}

/// Canonical markdown survives parse → serialize unchanged, and a second
/// pass is a no-op.
fn assert_fixture(name: &str) {
    let md = std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();

    let once = serialize(&parse(&md)).unwrap();
    assert_eq!(once.trim_end(), md.trim_end(), "fixture {name} changed on round trip");

    let twice = serialize(&parse(&once)).unwrap();
    assert_eq!(twice, once, "fixture {name} is not idempotent");
}

#[test]
fn widgets_do_not_change_markdown() {
    let md = std::fs::read_to_string(format!(
        "{}/tests/fixtures/code_and_images.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();
    let plain = serialize(&parse(&md)).unwrap();

    let mut root = parse(&md);
    widgets::attach(&mut root);

    assert_eq!(serialize(&root).unwrap(), plain);
    assert!(root.find(&|n| n.kind == NodeKind::CodeBlockWrapper).is_some());
    assert!(root.find(&|n| n.kind == NodeKind::ImageWrapper).is_some());
}

#[test]
fn task_list_outline() {
    let root = parse("- [ ] write tests\n- [x] ship it\n");
    insta::assert_snapshot!(outline(&root), @r#"
    List
      ListItem
        Checkbox checked=false
        Text "write tests"
      ListItem
        Checkbox checked=true
        Text "ship it"
    "#);
}

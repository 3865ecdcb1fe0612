// Shared between the bench targets in this directory; each target only
// uses some of them.
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with **bold** and `code`.\n\n- Bullet point\n  - Nested item\n- [ ] Task\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n![chart](img/chart.png =300x)\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_typing_script(lines: usize) -> String {
    let mut script = String::new();
    for i in 0..lines {
        match i % 4 {
            0 => script.push_str(&format!("## Heading {i}\n")),
            1 => script.push_str("- item with *emphasis* \n\n"),
            2 => script.push_str("plain text and `code` \n"),
            _ => script.push_str("> quoted ***words*** \n\n"),
        }
    }
    script
}

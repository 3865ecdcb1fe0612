use criterion::{Criterion, criterion_group, criterion_main};
use inkdown_engine::{EditSession, KeyInput, MemoryStorage, SessionConfig, parse, serialize};
use std::time::{Duration, Instant};
mod common;

fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");
    group.sample_size(10);

    let content = common::generate_markdown_content(100);
    group.bench_function("parse", |b| {
        b.iter(|| {
            let root = parse(std::hint::black_box(&content));
            std::hint::black_box(root);
        });
    });

    let root = parse(&content);
    group.bench_function("serialize", |b| {
        b.iter(|| {
            let md = serialize(std::hint::black_box(&root));
            std::hint::black_box(&md);
        });
    });

    group.finish();
}

fn bench_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    group.sample_size(10);

    let script = common::generate_typing_script(40);
    group.bench_function("autoformat_session", |b| {
        b.iter(|| {
            let start = Instant::now();
            let mut session = EditSession::new(MemoryStorage::new(), SessionConfig::default());
            session.open_document("", start);
            let now = start + Duration::from_secs(1);
            session.tick(now);
            for c in script.chars() {
                let key = match c {
                    '\n' => KeyInput::Enter { shift: false },
                    c => KeyInput::Char(c),
                };
                session.handle_key(key, now);
            }
            std::hint::black_box(session.current_markdown().len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_conversion, bench_typing);
criterion_main!(benches);

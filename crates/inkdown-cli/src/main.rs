//! Headless host for the inkdown engine.
//!
//! Drives an edit session against a notes folder: normalise or render a note,
//! replay typed input through the autoformatter, or apply the widget actions
//! (checkbox, image width, code language) to the stored markdown.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use inkdown_config::{Config, EditorSettings};
use inkdown_engine::editing::AutoformatTriggers;
use inkdown_engine::editing::guard;
use inkdown_engine::view::{self, Highlighter, PlainHighlighter};
use inkdown_engine::widgets::image;
use inkdown_engine::{
    EditSession, FsStorage, KeyInput, NodeKind, SessionConfig, Storage, parse, serialize,
};
use relative_path::RelativePathBuf;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "inkdown")]
#[command(version, about = "Live markdown editing engine, headless")]
struct Cli {
    /// Notes folder; defaults to `notes_path` from the config file
    #[arg(long, global = true)]
    notes: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a note's canonical markdown
    Normalize {
        file: RelativePathBuf,
        /// Save the normalised markdown back
        #[arg(long)]
        write: bool,
    },
    /// Print a note as HTML
    Render {
        file: RelativePathBuf,
        /// Skip syntax highlighting
        #[arg(long)]
        plain: bool,
    },
    /// Type text at the end of a note; `\n` presses Enter
    Type { file: RelativePathBuf, text: String },
    /// Flip the Nth checkbox (0-based)
    Toggle { file: RelativePathBuf, index: usize },
    /// Set the width of every image with the given path
    ResizeImage {
        file: RelativePathBuf,
        image: String,
        width: u32,
    },
    /// Set the language of the Nth code block (0-based)
    SetLanguage {
        file: RelativePathBuf,
        block: usize,
        language: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let (notes_path, settings) = resolve_notes(cli.notes)?;
    let storage = FsStorage::new(&notes_path)
        .with_context(|| format!("Notes path '{}' is invalid", notes_path.display()))?;
    let mut session = EditSession::new(storage, session_config(&settings));

    run(&mut session, cli.command)?;

    for note in session.take_notifications() {
        eprintln!("{}: {}", note.title, note.message);
    }
    Ok(())
}

fn resolve_notes(cli_notes: Option<PathBuf>) -> Result<(PathBuf, EditorSettings)> {
    if let Some(notes) = cli_notes {
        let settings = match Config::load() {
            Ok(config) => config.map(|c| c.editor).unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring unreadable config: {e}");
                EditorSettings::default()
            }
        };
        return Ok((notes, settings));
    }
    match Config::load()? {
        Some(config) => {
            log::info!("Loaded notes path from config: {}", config.notes_path.display());
            Ok((config.notes_path, config.editor))
        }
        None => bail!(
            "No notes path provided and no config file found; pass --notes or create {}",
            Config::config_path().display()
        ),
    }
}

fn session_config(settings: &EditorSettings) -> SessionConfig {
    SessionConfig {
        save_debounce: Duration::from_millis(settings.save_debounce_ms),
        enable_delay: Duration::from_millis(settings.enable_delay_ms),
        triggers: AutoformatTriggers {
            on_space: settings.autoformat.on_space,
            on_enter: settings.autoformat.on_enter,
            on_printable: settings.autoformat.on_printable,
            on_paste: settings.autoformat.on_paste,
        },
    }
}

fn run(session: &mut EditSession<FsStorage>, command: Command) -> Result<()> {
    let start = Instant::now();
    match command {
        Command::Normalize { file, write } => {
            let source = session.storage_mut().read_file(&file)?;
            let normalized = serialize(&parse(&source))?;
            if write {
                guard::check_write(&source, &normalized)?;
                session.storage_mut().write_file(&file, &normalized)?;
            }
            print!("{normalized}");
        }
        Command::Render { file, plain } => {
            session.open(file, start)?;
            let highlighter = highlighter(plain);
            println!("{}", view::render_html(&session.surface().root, highlighter.as_ref()));
        }
        Command::Type { file, text } => {
            session.open(file, start)?;
            let now = start + Duration::from_secs(1);
            session.tick(now);
            for c in text.replace("\\n", "\n").chars() {
                let key = match c {
                    '\n' => KeyInput::Enter { shift: false },
                    c => KeyInput::Char(c),
                };
                session.handle_key(key, now);
            }
            session.flush()?;
            print!("{}", session.current_markdown());
            session.close();
        }
        Command::Toggle { file, index } => {
            session.open(file, start)?;
            let checked = session.toggle_checkbox(index)?;
            println!("checkbox {index} is now {}", if checked { "checked" } else { "unchecked" });
        }
        Command::ResizeImage { file, image, width } => {
            let source = session.storage_mut().read_file(&file)?;
            let updated = image::set_width(&source, &image, width)
                .ok_or_else(|| anyhow!("image {image} not found in {file}"))?;
            guard::check_write(&source, &updated)?;
            session.storage_mut().write_file(&file, &updated)?;
            print!("{updated}");
        }
        Command::SetLanguage {
            file,
            block,
            language,
        } => {
            session.open(file, start)?;
            let path = session
                .surface()
                .root
                .find_all(&|n| matches!(n.kind, NodeKind::CodeBlock { .. }))
                .into_iter()
                .nth(block)
                .ok_or_else(|| anyhow!("no code block {block}"))?;
            session.set_code_language(&path, &language)?;
            print!("{}", session.current_markdown());
        }
    }
    Ok(())
}

fn highlighter(plain: bool) -> Box<dyn Highlighter> {
    if plain {
        return Box::new(PlainHighlighter);
    }
    #[cfg(feature = "syntax-highlighting")]
    {
        Box::new(view::SyntectHighlighter)
    }
    #[cfg(not(feature = "syntax-highlighting"))]
    {
        Box::new(PlainHighlighter)
    }
}

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use pagekeep::anchor::collect_anchors;
use pagekeep::clipboard;
use pagekeep::config::{self, Config};
use pagekeep::preview::{Preview, collect_links, preview_label};
use pagekeep::page::render_page;
use pagekeep::{FileSlot, FixedViewport, PageStateStore, Slot, StaticImage, TitleSlot, Viewport};

#[derive(Parser)]
#[command(
    name = "pagekeep",
    version = env!("PAGEKEEP_LONG_VERSION"),
    about = "Keep per-page scroll and image layout state in a single slot"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Slot file holding the page state
    #[arg(long, global = true)]
    slot: Option<PathBuf>,

    /// Base URL for resolving relative image sources
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Keep the state in the <title> of a rendered page instead of the slot file
    #[arg(long, global = true, value_name = "HTML")]
    page: Option<PathBuf>,

    /// Log output file path (logs go to stderr via RUST_LOG otherwise)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the persisted page state
    Show,

    /// Record a scroll event at OFFSET pixels
    Scroll { offset: u32 },

    /// Print the scroll offset a page load restores
    Restore,

    /// Run an image through its load cycle with the given natural size
    Image {
        url: String,
        width: u32,
        height: u32,
    },

    /// Print the cached layout hint for an image
    Hint { url: String },

    /// List heading anchors of a Markdown file (use `-` for stdin)
    Anchors { input: PathBuf },

    /// List link previews of a Markdown file (use `-` for stdin)
    Links {
        input: PathBuf,

        /// Copy link N (1-based) to the clipboard
        #[arg(long, value_name = "N")]
        copy: Option<usize>,
    },

    /// Copy text to the clipboard (OSC 52)
    Copy { text: String },

    /// Render a Markdown file (use `-` for stdin) to a page, keeping the
    /// state of the page it replaces
    Render {
        input: PathBuf,

        /// Page to write (defaults to --page)
        #[arg(short, long, value_name = "HTML")]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else {
        env_logger::init();
    }

    // Load config file and merge CLI overrides
    let config = match config::load_config().and_then(|mut cfg| {
        cfg.merge_cli(cli.slot, cli.base_url);
        cfg.resolve()
    }) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &config, cli.page.as_deref()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Command, config: &Config, page: Option<&Path>) -> Result<()> {
    match command {
        Command::Show => {
            let store = open_store(config, page);
            let json = serde_json::to_string_pretty(store.state())?;
            println!("{json}");
        }
        Command::Scroll { offset } => {
            let mut store = open_store(config, page);
            store.on_scroll(&FixedViewport::at(offset));
            info!("scroll: recorded {offset}");
        }
        Command::Restore => {
            let store = open_store(config, page);
            let mut viewport = FixedViewport::at(0);
            store.restore_scroll(&mut viewport);
            println!("{}", viewport.scroll_top());
        }
        Command::Image { url, width, height } => {
            let mut store = open_store(config, page);
            let key = store
                .resolve_image_url(&url)
                .ok_or_else(|| anyhow::anyhow!("cannot resolve '{url}' to an absolute URL"))?;
            let mut image = StaticImage::pending(url);
            match store.apply_cached_image_size(&mut image) {
                Some(hint) => println!("hint: {hint}"),
                None => println!("hint: none"),
            }
            image.finish(width, height);
            store.on_image_load(&mut image);
            match store.state().image_size(&key) {
                Some((w, h)) => println!("cached: {key} {w}x{h}"),
                None => println!("not cached: {key}"),
            }
        }
        Command::Hint { url } => {
            let store = open_store(config, page);
            let mut image = StaticImage::pending(url);
            match store.apply_cached_image_size(&mut image) {
                Some(hint) => println!("{hint}"),
                None => println!("none"),
            }
        }
        Command::Anchors { input } => {
            let markdown = read_input(&input)?;
            for a in collect_anchors(&markdown) {
                println!(
                    "L{:<4} {}{} {}",
                    a.line,
                    "#".repeat(a.level as usize),
                    a.fragment(),
                    a.text
                );
            }
        }
        Command::Links { input, copy } => {
            let markdown = read_input(&input)?;
            let mut preview = Preview::new(collect_links(&markdown));
            for (i, e) in preview.entries.iter().enumerate() {
                let label = preview_label(&e.url, config.preview.label_chars);
                if e.text == e.url {
                    println!("{:>3}. L{:<4} {label}", i + 1, e.line);
                } else {
                    println!("{:>3}. L{:<4} [{}] {label}", i + 1, e.line, e.text);
                }
            }
            if let Some(n) = copy {
                if !preview.select_number(n) {
                    anyhow::bail!("link {n} out of range (have {})", preview.entries.len());
                }
                if let Some(url) = preview.selected_url() {
                    clipboard::copy(url).context("failed to write OSC 52 sequence")?;
                    eprintln!("Copied {url}");
                }
            }
        }
        Command::Copy { text } => {
            clipboard::copy(&text).context("failed to write OSC 52 sequence")?;
        }
        Command::Render { input, output } => {
            let markdown = read_input(&input)?;
            let Some(target) = output.as_deref().or(page) else {
                anyhow::bail!("render needs --output or --page");
            };
            // A previous build of the page carries the state forward.
            let previous = PageStateStore::load(
                TitleSlot::new(FileSlot::new(target)),
                config.store.clone(),
            );
            let html = render_page(&markdown, previous.state());
            let mut file = previous.into_slot().into_inner();
            file.write(&html)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!("render: wrote {}", target.display());
        }
    }
    Ok(())
}

/// Where the CLI keeps state: the slot file, or a rendered page's title.
enum CliSlot {
    File(FileSlot),
    Page(TitleSlot<FileSlot>),
}

impl Slot for CliSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match self {
            CliSlot::File(s) => s.read(),
            CliSlot::Page(s) => s.read(),
        }
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        match self {
            CliSlot::File(s) => s.write(text),
            CliSlot::Page(s) => s.write(text),
        }
    }
}

fn open_store(config: &Config, page: Option<&Path>) -> PageStateStore<CliSlot> {
    let slot = match page {
        Some(path) => CliSlot::Page(TitleSlot::new(FileSlot::new(path))),
        None => CliSlot::File(FileSlot::new(&config.slot)),
    };
    PageStateStore::load(slot, config.store.clone())
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
    }
}

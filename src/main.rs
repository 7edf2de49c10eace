use clap::{Parser, Subcommand};
use stamp_studio::config::{self, StudioConfig};
use stamp_studio::editor::StampEditor;
use stamp_studio::export::{ExportSettings, Exporter, ZipArchiveWriter};
use stamp_studio::imaging::{GlyphBackend, encode_png};
use stamp_studio::types::Vec2;
use stamp_studio::{intake, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stamp-studio")]
#[command(about = "Compose a batch of images into sticker stamps")]
#[command(long_about = "\
Compose a batch of images into sticker stamps

Every image is fitted onto a 370x320 stamp and can carry a caption. Export
writes one PNG per stamp (01.png, 02.png, ...) plus a 240x240 main icon and a
96x74 tab icon into a zip archive.

Icons are picked by their 1-based position in the batch, as listed after
loading. Directories expand to the images inside them, sorted by name.

Captions need font files: set [fonts] in config.toml.
Run 'stamp-studio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a batch of images as a stamp archive
    Export {
        /// Input images or directories
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Stamp used for the main icon (1-based)
        #[arg(long)]
        main: usize,
        /// Stamp used for the tab icon (1-based)
        #[arg(long)]
        tab: usize,
        /// Caption applied to every stamp
        #[arg(long)]
        text: Option<String>,
        /// Archive to write
        #[arg(long, short, default_value = "stamps.zip")]
        output: PathBuf,
    },
    /// Render a single stamp as it appears on the editing surface
    Render {
        image: PathBuf,
        /// Caption
        #[arg(long)]
        text: Option<String>,
        /// Absolute scale (source pixels to stamp pixels)
        #[arg(long)]
        scale: Option<f64>,
        /// Pan offset in stamp pixels
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        offset: Option<Vec2>,
        /// PNG to write
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            images,
            main,
            tab,
            text,
            output: archive,
        } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let mut editor = open_editor(&config, &cli.config)?;

            let report = intake::load_paths(&images);
            output::print_intake_report(&report);
            editor.load_batch(report.bitmaps());

            if let Some(text) = &text {
                for index in 0..editor.workspace().len() {
                    editor.select(index);
                    editor.set_text(text);
                }
                editor.select(0);
            }
            if !editor.workspace().is_empty() {
                let count = editor.workspace().len();
                if !designate(main, count, |i| editor.designate_main(i)) {
                    return Err(format!("--main {main} is not a stamp number (1..={count})").into());
                }
                if !designate(tab, count, |i| editor.designate_tab(i)) {
                    return Err(format!("--tab {tab} is not a stamp number (1..={count})").into());
                }
            }

            let exporter = Exporter::new(ExportSettings::from_config(&config));
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_export_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            // Built in memory so a failed export leaves no file behind.
            let mut writer = ZipArchiveWriter::new(std::io::Cursor::new(Vec::new()));
            let result = editor.export(&exporter, &mut writer, Some(tx));
            printer.join().ok();
            let summary = result?;
            std::fs::write(&archive, writer.into_inner().into_inner())?;
            output::print_export_summary(&summary, &archive);
        }
        Command::Render {
            image,
            text,
            scale,
            offset,
            output: png,
        } => {
            let config = config::load_config(&cli.config)?;
            let mut editor = open_editor(&config, &cli.config)?;
            editor.load_batch(vec![intake::load_file(&image)?]);
            if let Some(text) = &text {
                editor.set_text(text);
            }
            editor.set_transform(scale, offset);
            std::fs::write(&png, encode_png(editor.canvas())?)?;
            println!("Rendered {} → {}", image.display(), png.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Session with fonts from the config, resolved relative to the config file.
fn open_editor(
    config: &StudioConfig,
    config_path: &Path,
) -> Result<StampEditor<GlyphBackend>, Box<dyn std::error::Error>> {
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let book = config::build_font_book(config, base_dir)?;
    Ok(StampEditor::from_config(config, GlyphBackend::new(book)))
}

/// Apply a 1-based stamp number. Returns false when it is out of range.
fn designate(number: usize, count: usize, mut apply: impl FnMut(usize) -> bool) -> bool {
    match number.checked_sub(1) {
        Some(index) if index < count => {
            apply(index);
            true
        }
        _ => false,
    }
}

/// Parse `DX,DY`.
fn parse_offset(s: &str) -> Result<Vec2, String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected DX,DY, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid offset component {v:?}: {e}"))
    };
    Ok(Vec2::new(parse(dx)?, parse(dy)?))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

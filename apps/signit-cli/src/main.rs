//! Signit command-line front end
//!
//! Bakes a JSON overlay set into a PDF and stores the result.

mod sink;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use signit_core::{EditorConfig, EditorSession, LoadedDocument, Overlay};
use sink::{write_file, FolderSink};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "signit")]
#[command(version, about = "Bake text and signature overlays into PDF documents")]
struct Cli {
    /// Editor configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count and page sizes
    Info {
        /// PDF file to inspect
        pdf: PathBuf,
    },
    /// Bake overlays into a PDF
    Bake(BakeArgs),
    /// List stored PDFs per category
    List {
        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[derive(Args, Debug)]
struct BakeArgs {
    /// Source PDF
    pdf: PathBuf,

    /// JSON array of overlays
    #[arg(long)]
    overlays: PathBuf,

    /// Render scale the overlay geometry was captured at
    #[arg(long)]
    scale: Option<f64>,

    /// Write the result to this path
    #[arg(long, conflicts_with_all = ["category", "filename"])]
    out: Option<PathBuf>,

    /// Category folder under the storage root
    #[arg(long, requires = "filename")]
    category: Option<String>,

    /// File name inside the category folder
    #[arg(long, requires = "category")]
    filename: Option<String>,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Storage root holding one folder per category
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Allowed category folders
    #[arg(long, value_delimiter = ',', default_value = "2024,2025,2026")]
    categories: Vec<String>,
}

impl StorageArgs {
    fn sink(&self) -> FolderSink {
        FolderSink::new(&self.root, self.categories.clone())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep stdout for command output
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Info { pdf } => info(&pdf),
        Command::Bake(args) => bake(config, &args),
        Command::List { storage } => list(&storage),
    }
}

fn info(pdf: &Path) -> Result<()> {
    let bytes = fs::read(pdf).with_context(|| format!("Failed to read {}", pdf.display()))?;
    let document = LoadedDocument::load(&bytes)?;

    println!("{}: {} page(s)", pdf.display(), document.page_count());
    for (index, size) in document.page_sizes().iter().enumerate() {
        println!("  page {}: {} x {} pt", index + 1, size.width, size.height);
    }
    Ok(())
}

/// Where `bake` writes its result
enum Output<'a> {
    Path(&'a Path),
    Stored {
        sink: FolderSink,
        category: &'a str,
        filename: &'a str,
    },
}

impl<'a> Output<'a> {
    fn from_args(args: &'a BakeArgs) -> Result<Self> {
        if let Some(out) = &args.out {
            return Ok(Output::Path(out));
        }
        let (Some(category), Some(filename)) = (&args.category, &args.filename) else {
            bail!("Either --out or --category with --filename is required");
        };
        let sink = args.storage.sink();
        // Reject bad names before doing any work
        sink.destination(category, filename)?;
        Ok(Output::Stored {
            sink,
            category,
            filename,
        })
    }

    fn write(&self, bytes: &[u8]) -> Result<PathBuf> {
        match self {
            Output::Path(path) => {
                write_file(path, bytes)?;
                Ok(path.to_path_buf())
            }
            Output::Stored {
                sink,
                category,
                filename,
            } => sink.save(category, filename, bytes),
        }
    }
}

fn bake(config: EditorConfig, args: &BakeArgs) -> Result<()> {
    let output = Output::from_args(args)?;

    let source = fs::read(&args.pdf)
        .with_context(|| format!("Failed to read {}", args.pdf.display()))?;
    let json = fs::read_to_string(&args.overlays)
        .with_context(|| format!("Failed to read {}", args.overlays.display()))?;
    let overlays: Vec<Overlay> =
        serde_json::from_str(&json).context("Overlay file is not a valid overlay list")?;

    let scale = args.scale.unwrap_or(config.render.scale);
    let mut session = EditorSession::new(config);
    session.load_document_at_scale(&source, scale)?;
    let count = session.import_overlays(overlays);

    tracing::info!(overlays = count, scale, "Baking");
    let baked = session.export()?;
    let destination = output.write(&baked)?;

    println!("{}", destination.display());
    Ok(())
}

fn list(storage: &StorageArgs) -> Result<()> {
    for (category, files) in storage.sink().list()? {
        println!("{}:", category);
        for file in files {
            println!("  {}", file);
        }
    }
    Ok(())
}

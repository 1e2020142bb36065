//! snapclass CLI — train and query a knowledge file from the command line.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use snapclass::{
    is_supported_format, Classifier, KnowledgeReader, KnowledgeStore, KnowledgeWriter,
    OnnxFeatureModel, PixelBuffer,
};

#[derive(Parser)]
#[command(
    name = "snapclass",
    about = "Teach a lightweight on-device classifier by labeling images, then classify new ones",
    version
)]
struct Cli {
    /// Path to the knowledge file.
    #[arg(short, long)]
    store: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features from images and store them under a label.
    Train {
        /// Label to file the images under.
        label: String,

        /// Image files or directories of images.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Path to an ONNX feature model.
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Classify an image against the knowledge file.
    Classify {
        /// Image file to classify.
        image: PathBuf,

        /// Path to an ONNX feature model.
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// List labels and their example counts.
    Labels,

    /// Delete a label and all of its examples.
    Forget {
        /// Label to delete.
        label: String,
    },

    /// Delete a single example of a label by index.
    Remove {
        /// Label to delete from.
        label: String,

        /// Zero-based example index, in training order.
        index: usize,
    },

    /// Show knowledge file statistics.
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store_path = resolve_store_path(cli.store.as_deref());

    match cli.command {
        Commands::Train {
            label,
            images,
            model,
        } => {
            let mut store = open_store(&store_path)?;
            let mut classifier = build_classifier(model.as_deref())?;
            let files = collect_images(&images)?;
            anyhow::ensure!(!files.is_empty(), "no supported image files given");

            let mut buffers = Vec::with_capacity(files.len());
            for file in &files {
                buffers.push(
                    PixelBuffer::open(file)
                        .with_context(|| format!("unable to process {}", file.display()))?,
                );
            }

            let count = classifier.train(&mut store, &label, &buffers)?;
            KnowledgeWriter::write_to_file(&store, &store_path)?;
            println!(
                "stored {count} example(s) under \"{}\" ({} total)",
                label.trim(),
                store.example_count()
            );
        }

        Commands::Classify { image, model } => {
            let store = open_store(&store_path)?;
            let mut classifier = build_classifier(model.as_deref())?;
            let buffer = PixelBuffer::open(&image)
                .with_context(|| format!("unable to process {}", image.display()))?;

            let result = classifier.classify(&buffer, &store)?;
            println!(
                "{} ({:.0}% confident) [{}]",
                result.label,
                result.confidence * 100.0,
                result.source
            );
        }

        Commands::Labels => {
            let store = open_store(&store_path)?;
            if store.is_empty() {
                println!("knowledge file is empty");
            }
            for (label, examples) in store.iter() {
                println!("{label}: {} example(s)", examples.len());
            }
        }

        Commands::Forget { label } => {
            let mut store = open_store(&store_path)?;
            if store.remove_label(&label) {
                KnowledgeWriter::write_to_file(&store, &store_path)?;
                println!("forgot \"{label}\"");
            } else {
                println!("no such label: \"{label}\"");
            }
        }

        Commands::Remove { label, index } => {
            let mut store = open_store(&store_path)?;
            if store.remove_example(&label, index) {
                KnowledgeWriter::write_to_file(&store, &store_path)?;
                println!("removed example {index} of \"{label}\"");
            } else {
                println!("no example {index} under \"{label}\"");
            }
        }

        Commands::Info => {
            let store = open_store(&store_path)?;
            println!("knowledge file: {}", store_path.display());
            println!("labels: {}", store.label_count());
            println!("examples: {}", store.example_count());
            for (label, examples) in store.iter() {
                let dims = examples
                    .first()
                    .map(|e| format!("{}x{}", e.image.width(), e.image.height()))
                    .unwrap_or_default();
                println!("  {label}: {} example(s), first {dims}", examples.len());
            }
        }
    }

    Ok(())
}

/// Resolve the knowledge file path: flag, then environment, then a default
/// under the home directory.
fn resolve_store_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    if let Ok(env_path) = std::env::var("SNAPCLASS_STORE") {
        return PathBuf::from(env_path);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".snapclass").join("knowledge.snap")
}

fn open_store(path: &Path) -> anyhow::Result<KnowledgeStore> {
    if path.exists() {
        KnowledgeReader::read_from_file(path)
            .with_context(|| format!("failed to read {}", path.display()))
    } else {
        tracing::debug!("no knowledge file at {}, starting empty", path.display());
        Ok(KnowledgeStore::new())
    }
}

fn build_classifier(model: Option<&Path>) -> anyhow::Result<Classifier> {
    match model {
        Some(path) => {
            let model = OnnxFeatureModel::load(path)
                .with_context(|| format!("failed to load model {}", path.display()))?;
            Ok(Classifier::with_model(Box::new(model)))
        }
        None => Ok(Classifier::new()),
    }
}

/// Expand file and directory arguments into a list of supported image
/// files. Directory entries are sorted for deterministic training order.
fn collect_images(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("failed to read {}", input.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported_format(&p.to_string_lossy()))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_store_path_wins() {
        let path = resolve_store_path(Some("/tmp/custom.snap"));
        assert_eq!(path, PathBuf::from("/tmp/custom.snap"));
    }

    #[test]
    fn collect_images_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = collect_images(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn collect_images_keeps_plain_files() {
        let files = collect_images(&[PathBuf::from("one.png")]).unwrap();
        assert_eq!(files, vec![PathBuf::from("one.png")]);
    }
}

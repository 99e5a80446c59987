// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Keepsake: media album pipeline
//!
//! Classifies uploaded media, runs face and voice analysis, and reconciles
//! reviewed decisions into persistent per-person albums.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use keepsake::analyze::AnalysisOrchestrator;
use keepsake::classify::RawUpload;
use keepsake::config::AppConfig;
use keepsake::db::SqliteAlbumStore;
use keepsake::model::{AnalysisBatch, ReviewDecisions};
use keepsake::reconcile::ReconciliationEngine;
use keepsake::services::mock::{
    MockAudioExtractor, MockFaceDetector, MockSummarizer, MockVoiceIdentifier,
};
use keepsake::services::ollama::OllamaSummarizer;
use keepsake::services::recognition::{ExtractorApiClient, FaceApiClient, VoiceApiClient};
use keepsake::services::{
    AlbumStore, AudioExtractor, FaceDetector, Summarizer, Utf8ChatReader, VoiceIdentifier,
};
use keepsake::{KeepsakeError, Result};

/// Keepsake CLI - media album pipeline
#[derive(Parser, Debug)]
#[command(name = "keepsake")]
#[command(version)]
#[command(about = "Face/voice analysis and album reconciliation for media uploads", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use deterministic in-process collaborators instead of live services
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a batch of uploaded files and emit a review batch
    Analyze {
        /// Files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Where to write the review batch (JSON); "-" for stdout
        #[arg(short, long, default_value = "batch.json")]
        output: PathBuf,

        /// Skip service health checks on startup
        #[arg(long)]
        skip_health_check: bool,
    },

    /// Apply reviewed decisions to a batch and persist the albums
    Finalize {
        /// Review batch produced by `analyze`
        #[arg(short, long, default_value = "batch.json")]
        batch: PathBuf,

        /// Review decisions (JSON)
        #[arg(short, long)]
        decisions: PathBuf,
    },

    /// List persisted albums
    Albums {
        /// Emit the full collection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show service and store status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("Keepsake v{} - media album pipeline", env!("CARGO_PKG_VERSION"));
    }

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Analyze { files, output, skip_health_check } => {
            run_analyze(config, files, output, cli.offline, skip_health_check).await
        }
        Commands::Finalize { batch, decisions } => {
            run_finalize(config, batch, decisions, cli.offline).await
        }
        Commands::Albums { json } => run_albums(config, json).await,
        Commands::Status => run_status(config).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config).await,
    }
}

/// Guess a content type from the file extension; the classifier works from
/// content types, not extensions
fn guess_content_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Build the analysis collaborators, live or offline
fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn AlbumStore>,
    offline: bool,
) -> Result<AnalysisOrchestrator> {
    let (face, voice, extractor): (
        Arc<dyn FaceDetector>,
        Arc<dyn VoiceIdentifier>,
        Arc<dyn AudioExtractor>,
    ) = if offline {
        (
            Arc::new(MockFaceDetector::new()),
            Arc::new(MockVoiceIdentifier::new()),
            Arc::new(MockAudioExtractor::new(&config.storage.prefix)),
        )
    } else {
        let timeout = config.services.timeout_secs;
        (
            Arc::new(FaceApiClient::new(&config.services.face_url, timeout)?),
            Arc::new(VoiceApiClient::new(&config.services.voice_url, timeout)?),
            Arc::new(ExtractorApiClient::new(&config.services.extractor_url, timeout)?),
        )
    };

    Ok(AnalysisOrchestrator::new(
        face,
        voice,
        extractor,
        Arc::new(Utf8ChatReader),
        store,
        config.storage.clone(),
    ))
}

fn build_summarizer(config: &AppConfig, offline: bool) -> Result<Arc<dyn Summarizer>> {
    if offline {
        Ok(Arc::new(MockSummarizer))
    } else {
        Ok(Arc::new(OllamaSummarizer::new(
            &config.services.summarizer.url,
            &config.services.summarizer.model,
        )?))
    }
}

/// Run the analysis phase over a set of files
async fn run_analyze(
    config: AppConfig,
    files: Vec<PathBuf>,
    output: PathBuf,
    offline: bool,
    skip_health_check: bool,
) -> Result<()> {
    if offline {
        warn!("OFFLINE MODE - using deterministic in-process collaborators");
    } else if !skip_health_check {
        info!("Checking service availability...");
        let timeout = config.services.timeout_secs;
        FaceApiClient::new(&config.services.face_url, timeout)?
            .health_check()
            .await?;
        VoiceApiClient::new(&config.services.voice_url, timeout)?
            .health_check()
            .await?;
        ExtractorApiClient::new(&config.services.extractor_url, timeout)?
            .health_check()
            .await?;
        info!("All recognition services reachable");
    } else {
        warn!("Skipping service health checks");
    }

    let mut uploads = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                KeepsakeError::Config(format!("Cannot determine filename for {:?}", path))
            })?;
        uploads.push(RawUpload {
            content_type: guess_content_type(path),
            file_name,
            bytes,
        });
    }

    let store = SqliteAlbumStore::open(&config.database.path)?;
    let orchestrator = build_orchestrator(&config, Arc::new(store), offline)?;
    let batch = orchestrator.analyze_uploads(uploads).await?;

    for result in &batch.results {
        println!(
            "{}: {} faces, voice: {}{}",
            result.asset.label,
            result.faces.len(),
            result
                .voice
                .as_ref()
                .map(|v| v.display_name.as_str())
                .unwrap_or("none"),
            result
                .error
                .as_deref()
                .map(|e| format!(" [partial: {}]", e))
                .unwrap_or_default()
        );
    }
    for chat in &batch.chats {
        println!("{}: chat transcript ({} chars)", chat.file_name, chat.transcript.len());
    }

    let json = serde_json::to_string_pretty(&batch)?;
    if output == Path::new("-") {
        println!("{}", json);
    } else {
        tokio::fs::write(&output, json).await?;
        println!(
            "\nWrote review batch ({} results, {} chats) to {:?}",
            batch.results.len(),
            batch.chats.len(),
            output
        );
    }

    Ok(())
}

/// Apply reviewed decisions and persist the resulting albums
async fn run_finalize(
    config: AppConfig,
    batch_path: PathBuf,
    decisions_path: PathBuf,
    offline: bool,
) -> Result<()> {
    let batch_json = tokio::fs::read_to_string(&batch_path).await?;
    let batch: AnalysisBatch = serde_json::from_str(&batch_json)?;

    let decisions_json = tokio::fs::read_to_string(&decisions_path).await?;
    let decisions: ReviewDecisions = serde_json::from_str(&decisions_json)?;

    let store = SqliteAlbumStore::open(&config.database.path)?;
    let engine = ReconciliationEngine::new(
        Arc::new(store),
        build_summarizer(&config, offline)?,
        config.storage.clone(),
    );

    let outcome = engine.finalize(&decisions, &batch).await?;

    println!(
        "Reconciled: {} albums created, {} updated, {} total",
        outcome.created.len(),
        outcome.updated.len(),
        outcome.albums.len()
    );
    for album in &outcome.albums {
        let marker = if outcome.created.contains(&album.id) {
            " (new)"
        } else if outcome.updated.contains(&album.id) {
            " (updated)"
        } else {
            ""
        };
        println!("  {}: {} ({} items){}", album.id, album.name, album.media_count, marker);
    }

    Ok(())
}

/// List the persisted album collection
async fn run_albums(config: AppConfig, json: bool) -> Result<()> {
    let store = SqliteAlbumStore::open(&config.database.path)?;
    let albums = store.fetch_albums().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&albums)?);
        return Ok(());
    }

    if albums.is_empty() {
        println!("No albums");
        return Ok(());
    }

    for album in &albums {
        println!("{}: {} ({} items)", album.id, album.name, album.media_count);
        if album.has_voice_sample() {
            println!("  voice sample: yes");
        }
        if let Some(summary) = &album.summary {
            println!("  summary: {}", summary);
        }
    }

    Ok(())
}

/// Check every collaborator and the album store
async fn run_status(config: AppConfig) -> Result<()> {
    println!("Keepsake v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    let timeout = config.services.timeout_secs;
    let checks: [(&str, Result<()>); 4] = [
        (
            "Face service",
            match FaceApiClient::new(&config.services.face_url, timeout) {
                Ok(c) => c.health_check().await,
                Err(e) => Err(e),
            },
        ),
        (
            "Voice service",
            match VoiceApiClient::new(&config.services.voice_url, timeout) {
                Ok(c) => c.health_check().await,
                Err(e) => Err(e),
            },
        ),
        (
            "Extractor service",
            match ExtractorApiClient::new(&config.services.extractor_url, timeout) {
                Ok(c) => c.health_check().await,
                Err(e) => Err(e),
            },
        ),
        (
            "Summarizer (Ollama)",
            match OllamaSummarizer::new(
                &config.services.summarizer.url,
                &config.services.summarizer.model,
            ) {
                Ok(c) => c.health_check().await,
                Err(e) => Err(e),
            },
        ),
    ];

    for (name, outcome) in checks {
        match outcome {
            Ok(()) => println!("{}: Running", name),
            Err(e) => println!("{}: Error - {}", name, e),
        }
    }

    match SqliteAlbumStore::open(&config.database.path) {
        Ok(store) => {
            let stats = store.stats()?;
            println!("\nAlbum store ({}):", config.database.path);
            println!("  Albums: {}", stats.album_count);
            println!("  Media items: {}", stats.media_count);
        }
        Err(e) => println!("\nAlbum store: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Storage prefix: {}", config.storage.prefix);
    println!("  Summarizer model: {}", config.services.summarizer.model);

    Ok(())
}

/// Run config commands
async fn run_config_command(
    config: AppConfig,
    action: ConfigCommands,
    config_path: &Path,
) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Face service: {}", config.services.face_url);
            println!("  Voice service: {}", config.services.voice_url);
            println!("  Extractor service: {}", config.services.extractor_url);
            println!("  Summarizer: {}", config.services.summarizer.url);
            println!("  Database: {}", config.database.path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_analyze_command() {
        let cli = Cli::try_parse_from([
            "keepsake", "analyze", "photo.jpg", "clip.mp4", "--offline",
        ])
        .unwrap();

        assert!(cli.offline);
        match cli.command {
            Commands::Analyze { files, output, .. } => {
                assert_eq!(files.len(), 2);
                assert_eq!(output, PathBuf::from("batch.json"));
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_finalize_command() {
        let cli = Cli::try_parse_from([
            "keepsake", "finalize", "--batch", "b.json", "--decisions", "d.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Finalize { batch, decisions } => {
                assert_eq!(batch, PathBuf::from("b.json"));
                assert_eq!(decisions, PathBuf::from("d.json"));
            }
            _ => panic!("Expected Finalize command"),
        }
    }

    #[test]
    fn test_cli_version_tracks_the_crate() {
        let err = Cli::try_parse_from(["keepsake", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["keepsake"]).is_err());
        assert!(Cli::try_parse_from(["keepsake", "analyze"]).is_err());
    }

    #[test]
    fn test_content_type_guessing() {
        assert_eq!(guess_content_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("b.mp4")), "video/mp4");
        assert_eq!(guess_content_type(Path::new("c.mp3")), "audio/mpeg");
        assert_eq!(guess_content_type(Path::new("chat.txt")), "text/plain");
        assert_eq!(
            guess_content_type(Path::new("mystery.bin")),
            "application/octet-stream"
        );
    }
}

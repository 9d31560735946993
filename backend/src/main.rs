//! Cinema CLI - upload, moderate and chat
//!
//! ```bash
//! cinema serve                                   # Start HTTP server (port 3000)
//! cinema upload --title "Cosmic Odyssey" \
//!     --movie odyssey.mp4 --thumbnail poster.png # Pin a movie and its thumbnail
//! cinema url                                     # Fetch a signed upload URL
//! cinema moderate gs://bucket/odyssey.mp4        # Explicit-content check
//! cinema chat "what is my balance?"              # Talk to the agent
//! ```

use clap::{Parser, Subcommand};
use cinema::api::{AppState, LogEntry, LogLevel};
use cinema::{
    Agent, ConfiguredWallet, GatewayClient, GatewayResolver, MediaFile, PinataClient, PinataSigner,
    Settings, UploadController, UploadRequest, UrlIssuer, VideoAnalyzer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "cinema")]
#[command(about = "Upload, pin and moderate movies for a decentralized cinema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Pin a movie and its thumbnail to IPFS
    Upload {
        /// Movie title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Movie file (video/*)
        #[arg(short, long)]
        movie: Option<PathBuf>,

        /// Thumbnail file (image/*)
        #[arg(long)]
        thumbnail: Option<PathBuf>,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Print a signed upload URL
    Url {
        /// Sign locally with PINATA_JWT instead of asking the gateway
        #[arg(long)]
        local: bool,
    },

    /// Check a gs:// video for explicit content
    Moderate {
        /// Google Cloud Storage URI
        uri: String,
    },

    /// Send one message to the agent
    Chat {
        /// Message text
        message: String,

        /// Conversation thread id
        #[arg(long, default_value = "cli")]
        thread: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => run(cli.command, settings).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> CliResult {
    match command {
        Commands::Serve { port } => cmd_serve(&settings, port.unwrap_or(settings.port)).await,

        Commands::Upload {
            title,
            movie,
            thumbnail,
            description,
        } => cmd_upload(&settings, title, movie.as_deref(), thumbnail.as_deref(), description).await,

        Commands::Url { local } => cmd_url(&settings, local).await,

        Commands::Moderate { uri } => cmd_moderate(&settings, &uri).await,

        Commands::Chat { message, thread } => cmd_chat(&settings, &thread, &message).await,
    }
}

async fn cmd_serve(settings: &Settings, port: u16) -> CliResult {
    let state = AppState::from_settings(settings);
    cinema::api::start_server(port, state).await?;
    Ok(())
}

async fn cmd_upload(
    settings: &Settings,
    title: String,
    movie: Option<&Path>,
    thumbnail: Option<&Path>,
    description: String,
) -> CliResult {
    let request = UploadRequest {
        title,
        movie: load(movie).await?,
        thumbnail: load(thumbnail).await?,
        description,
    };

    let wallet = ConfiguredWallet::new(settings.wallet_address.clone());
    let gateway = GatewayClient::new(settings.gateway_url.clone());
    let uploader = PinataClient::new(settings.pinata_jwt.clone(), GatewayResolver::new(&settings.pinata_gateway));
    let mut controller = UploadController::new(wallet, gateway, uploader);

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_entry(&LogEntry::from(&event)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = controller.submit(&request).await;
    drop(controller);
    let _ = printer.await;

    match outcome {
        Ok(submission) => {
            eprintln!("✅ \"{}\" uploaded by {}", submission.title, submission.wallet.short());
            for result in &submission.results {
                eprintln!("   {} → {}", result.file_name, result.cid);
            }
            println!("{}", submission.link);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "submission failed");
            Err(e.user_message().into())
        }
    }
}

async fn cmd_url(settings: &Settings, local: bool) -> CliResult {
    let target = if local {
        PinataSigner::from_settings(settings).request_temporary_url().await?
    } else {
        GatewayClient::new(settings.gateway_url.clone())
            .request_temporary_url()
            .await?
    };
    println!("{}", target.url);
    Ok(())
}

async fn cmd_moderate(settings: &Settings, uri: &str) -> CliResult {
    let analyzer = VideoAnalyzer::new(
        settings.video_intelligence_url.clone(),
        settings.video_intelligence_token.clone(),
    );
    let verdict = analyzer.analyze(uri).await?;
    println!("{}", verdict);
    Ok(())
}

async fn cmd_chat(settings: &Settings, thread: &str, message: &str) -> CliResult {
    let analyzer = Arc::new(VideoAnalyzer::new(
        settings.video_intelligence_url.clone(),
        settings.video_intelligence_token.clone(),
    ));
    let agent = Agent::from_settings(settings, analyzer)?;
    let answer = agent.chat(thread, message).await?;
    println!("{}", answer);
    Ok(())
}

async fn load(path: Option<&Path>) -> Result<Option<MediaFile>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(MediaFile::from_path(p).await.map_err(|e| format!("{}: {}", p.display(), e))?)),
        None => Ok(None),
    }
}

fn print_entry(entry: &LogEntry) {
    let prefix = match entry.level {
        LogLevel::Info => "  ",
        LogLevel::Success => "  ✓",
        LogLevel::Warning => "  ⚠️",
        LogLevel::Error => "  ❌",
    };
    eprintln!("{}{} {}", "   ".repeat(entry.indent as usize), prefix, entry.message);
}

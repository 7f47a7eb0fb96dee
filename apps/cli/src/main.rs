use std::{path::PathBuf, time::Instant};

use anyhow::Result;
use clap::Parser;
use console::style;
use tokio::fs;
use tracing_subscriber::EnvFilter;
use tubefetch_core::{
    CancellationToken, FailureReason, FetchConfig, ManifestResolver, MetadataResolver,
    SelectionPolicy, StandardConnector, StreamCatalog, TransferEngine, TubefetchError,
    YtDlpResolver, describe_variant, destination_path, format_bytes, format_duration,
    format_length,
};

use crate::{
    fetch::{RetryPolicy, choose, download},
    progress::{BarSink, create_download_bar, create_spinner},
};

mod fetch;
mod progress;

fn parse_policy(s: &str) -> Result<SelectionPolicy, String> {
    s.parse().map_err(|e: TubefetchError| e.to_string())
}

#[derive(Parser)]
#[command(name = "tubefetch")]
#[command(about = "Download a video or its audio track with resumable, cancellable transfers")]
struct Cli {
    /// Video URL (or manifest path/URL with --manifest)
    source: String,

    /// Output folder, created if missing
    #[arg(default_value = "downloads")]
    output: PathBuf,

    /// "highest", "audio", or an exact resolution such as "720p"
    #[arg(default_value = "highest", value_parser = parse_policy)]
    quality: SelectionPolicy,

    /// Read variants from a JSON manifest instead of running yt-dlp
    #[arg(short, long)]
    manifest: bool,

    /// Use the highest progressive stream when the exact resolution is missing
    #[arg(short, long)]
    fallback: bool,

    /// Resume automatically this many times after network or disk errors
    #[arg(short, long, default_value_t = 0)]
    retries: u32,

    /// Start over when a partial file exists and the source cannot resume it
    #[arg(long)]
    restart: bool,

    /// Print the available formats and exit
    #[arg(short, long)]
    list: bool,

    /// Bytes per transfer chunk (overrides TUBEFETCH_CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Proxy URL, e.g. socks5://127.0.0.1:1080 (overrides TUBEFETCH_PROXY)
    #[arg(long)]
    proxy: Option<String>,

    /// yt-dlp executable
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: String,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "tubefetch=debug,tubefetch_core=debug",
        _ => "tubefetch=trace,tubefetch_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = FetchConfig::from_env();
    if let Some(proxy) = cli.proxy.clone() {
        config.network.proxy = Some(proxy);
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size.max(1);
    }

    println!(
        "\n{}  {}\n",
        style("tubefetch").cyan().bold(),
        style("Stream Downloader").dim()
    );

    // Step 1: Resolve metadata
    let resolver: Box<dyn MetadataResolver> = if cli.manifest {
        Box::new(ManifestResolver::default())
    } else {
        Box::new(YtDlpResolver::new(&cli.yt_dlp).with_proxy(config.network.proxy.clone()))
    };
    let spinner = create_spinner(&format!("Resolving formats with {}...", resolver.name()));
    let media = match resolver.resolve(&cli.source).await {
        Ok(media) => media,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    spinner.finish_and_clear();

    println!("{} {}", style("Title:").dim(), style(&media.info.title).bold());
    println!("{} {}", style("Author:").dim(), media.info.author);
    if let Some(length) = media.info.length_seconds {
        println!("{} {}", style("Length:").dim(), format_length(length));
    }

    let catalog = StreamCatalog::build(media.variants)?;

    if cli.list {
        println!("{}", style("─".repeat(60)).dim());
        for variant in catalog.all() {
            println!("{}", describe_variant(variant));
        }
        return Ok(());
    }

    // Step 2: Select a stream
    let choice = match choose(&catalog, cli.quality, cli.fallback) {
        Ok(choice) => choice,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let TubefetchError::NoMatchingStream {
                policy: SelectionPolicy::ExactResolution(_),
            } = e
            {
                eprintln!("{}", style("Pass --fallback to take the highest progressive stream instead.").dim());
            }
            std::process::exit(1);
        }
    };
    if let Some(missed) = choice.fell_back_from {
        println!(
            "{} Requested resolution {} not available. Falling back to highest progressive.",
            style("!").yellow().bold(),
            missed
        );
    }
    let variant = choice.variant;
    println!(
        "{} Selected {}",
        style("✓").green().bold(),
        style(describe_variant(variant)).dim()
    );

    // Step 3: Transfer
    fs::create_dir_all(&cli.output).await?;
    let destination = destination_path(&cli.output, &media.info, variant);
    println!(
        "{} Downloading to {}",
        style("→").cyan().bold(),
        style(destination.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());

    let engine = TransferEngine::from_config(StandardConnector::new(&config.network)?, &config);
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let retry = RetryPolicy {
        retries: cli.retries,
        restart_unresumable: cli.restart,
        ..RetryPolicy::default()
    };
    let bar = create_download_bar(variant.size);
    let mut sink = BarSink::new(bar.clone());
    let started = Instant::now();

    match download(&engine, variant, &destination, &mut sink, &cancel, &retry).await {
        Ok(state) => {
            bar.finish_and_clear();
            let note = if state.bytes_transferred == state.resumed_from {
                style("(already complete)".to_string()).dim()
            } else {
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            };
            println!(
                "{} Download finished: {} {}",
                style("✓").green().bold(),
                format_bytes(state.bytes_transferred),
                note
            );
            Ok(())
        }
        Err(TubefetchError::Transfer { reason, state }) => {
            bar.abandon();
            let progress = match state.total_bytes {
                Some(total) => format!(
                    "{} of {}",
                    format_bytes(state.bytes_transferred),
                    format_bytes(total)
                ),
                None => format_bytes(state.bytes_transferred),
            };
            if reason == FailureReason::Cancelled {
                eprintln!(
                    "{} Cancelled after {}. Run the same command again to resume.",
                    style("✗").yellow().bold(),
                    progress
                );
            } else {
                eprintln!(
                    "{} {} ({} saved, run again to resume)",
                    style("Error:").red().bold(),
                    reason,
                    progress
                );
            }
            std::process::exit(1);
        }
        Err(e) => {
            bar.abandon();
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if matches!(e, TubefetchError::ResumeUnsupported { .. }) {
                eprintln!("{}", style("Pass --restart to discard the partial file and start over.").dim());
            }
            std::process::exit(1);
        }
    }
}

//! Application entry point: meeting protocol generator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] (defaults on first run) and resolve API keys.
//! 4. Read the recording and the protocol prompt.
//! 5. Build the [`FfmpegEngine`] and the [`PipelineRunner`].
//! 6. Run the pipeline; Ctrl-C cancels it cleanly.
//! 7. Write the protocol (or the bare transcript) to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use meeting_protocol::{
    config::{AppConfig, AppPaths, API_KEY_ENV},
    media::{estimate_processing_minutes, FfmpegEngine, MediaAsset},
    pipeline::{PipelineError, PipelineRunner, ProgressEvent},
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Turn a meeting recording into a structured protocol
#[derive(Parser, Debug)]
#[command(name = "meeting-protocol", version, about)]
struct Cli {
    /// Recording to process (mp3, wav, m4a, aac, ogg, webm, flac)
    #[arg(value_name = "FILE", required_unless_present = "write_config")]
    file: Option<PathBuf>,

    /// Read the protocol instructions from this file instead of the config
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,

    /// Where to write the result (default: protocol-<FILE>.txt)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after transcription and write the transcript only
    #[arg(long)]
    transcript_only: bool,

    /// Write the default configuration file and exit
    #[arg(long)]
    write_config: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file)
}

fn load_config(path: &Path, transcript_only: bool) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(path)?;
    config.resolve_api_keys();
    check_api_keys(&config, path, transcript_only)?;
    Ok(config)
}

/// Hosted OpenAI endpoints need a key; self-hosted ones may not. The chat
/// endpoint is never called for a bare transcript.
fn check_api_keys(config: &AppConfig, path: &Path, transcript_only: bool) -> Result<()> {
    let needs_key = |base_url: &str| base_url.contains("api.openai.com");
    let mut endpoints = vec![(&config.transcription.api_key, &config.transcription.base_url)];
    if !transcript_only {
        endpoints.push((&config.llm.api_key, &config.llm.base_url));
    }
    for (api_key, base_url) in endpoints {
        if api_key.is_none() && needs_key(base_url.as_str()) {
            bail!(
                "no API key for {base_url}: set {API_KEY_ENV} or `api_key` in {}",
                path.display()
            );
        }
    }
    Ok(())
}

async fn read_prompt(cli: &Cli, config: &AppConfig) -> Result<String> {
    match &cli.prompt_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read prompt {}", path.display())),
        None => Ok(config.summary.custom_prompt.clone()),
    }
}

fn log_progress(event: ProgressEvent) {
    log::info!("[{:>3}%] {}", event.percent, event.message);
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();
    let settings = config_path(&cli);

    if cli.write_config {
        AppConfig::default().save_to(&settings)?;
        println!("{}", settings.display());
        return Ok(());
    }

    // 3. Configuration
    let config = load_config(&settings, cli.transcript_only)?;

    // 4. Inputs
    let Some(file) = cli.file.as_deref() else {
        bail!("no input file given");
    };
    let asset = MediaAsset::from_path(file)
        .await
        .with_context(|| format!("cannot use {}", file.display()))?;
    log::info!(
        "{}: {} bytes ({}), expect roughly {} min",
        asset.name(),
        asset.len(),
        asset.mime(),
        estimate_processing_minutes(asset.len())
    );
    let prompt = read_prompt(&cli, &config).await?;

    // 5. Engine + runner
    let engine = Arc::new(FfmpegEngine::new(config.segmentation.audio_bitrate_kbps)?);
    let runner = PipelineRunner::from_config(&config, engine);

    // 6. Run
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let (path, contents) = if cli.transcript_only {
        let transcript = runner
            .transcribe(&asset, &log_progress, &cancel)
            .await
            .map_err(report)?;
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("transcript-{}.txt", asset.name())));
        (path, transcript)
    } else {
        let doc = runner
            .run_with_cancel(&asset, &prompt, &log_progress, &cancel)
            .await
            .map_err(report)?;
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(doc.suggested_file_name()));
        (path, doc.into_text())
    };

    // 7. Output
    tokio::fs::write(&path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("written to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

fn report(e: PipelineError) -> anyhow::Error {
    if e.is_cancelled() {
        log::warn!("pipeline: cancelled, nothing written");
    }
    anyhow::Error::new(e)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn keyless() -> AppConfig {
        let mut config = AppConfig::default();
        config.transcription.base_url = "http://localhost:9000".into();
        config.transcription.api_key = None;
        config.llm.base_url = "https://api.openai.com".into();
        config.llm.api_key = None;
        config
    }

    #[test]
    fn transcript_only_skips_llm_key() {
        let path = Path::new("settings.toml");
        assert!(check_api_keys(&keyless(), path, true).is_ok());
    }

    #[test]
    fn full_run_requires_llm_key() {
        let path = Path::new("settings.toml");
        let err = check_api_keys(&keyless(), path, false).unwrap_err();
        assert!(err.to_string().contains("api.openai.com"));
    }

    #[test]
    fn transcription_key_is_always_checked() {
        let mut config = keyless();
        config.transcription.base_url = "https://api.openai.com".into();
        let err = check_api_keys(&config, Path::new("settings.toml"), true).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }
}

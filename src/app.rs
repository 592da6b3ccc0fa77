//! Wiring of concrete collaborators into a [`QueryComposer`].

use std::sync::Arc;

use anyhow::Context;

use crate::composer::QueryComposer;
use crate::config::BridgeConfig;
use crate::media::twilio::TwilioMediaFetcher;
use crate::providers::vision::VisionDescriber;
use crate::providers::whisper::WhisperTranscriber;
use crate::retrieval::rag::RagClient;

/// Build the production composer: Twilio media, OpenAI Whisper and vision,
/// RAG backend.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be constructed.
pub fn build_composer(config: &BridgeConfig) -> anyhow::Result<QueryComposer> {
    let fetcher = TwilioMediaFetcher::new(config.channel_credentials(), &config.http)
        .context("failed to build media fetcher")?;
    let transcriber = WhisperTranscriber::new(&config.openai, &config.http)
        .context("failed to build transcriber")?;
    let describer = VisionDescriber::new(&config.openai, &config.http)
        .context("failed to build image describer")?;
    let gateway =
        RagClient::new(&config.rag, &config.http).context("failed to build retrieval client")?;

    Ok(QueryComposer::new(
        Arc::new(fetcher),
        Arc::new(transcriber),
        Arc::new(describer),
        Arc::new(gateway),
    ))
}

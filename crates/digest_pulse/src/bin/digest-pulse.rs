use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{Parser, Subcommand};
use cron::Schedule;
use digest_pulse::{
    audio::FfmpegConcat,
    config::{LlmArgs, MergeArgs, PipelineArgs, StoreArgs, TtsArgs, TtsProvider},
    openai::OpenAIClient,
    source::HackerNewsFetcher,
    tracing::init_tracing_subscriber,
    tts::{subtitles::estimate_srt, SpeechSynthesizer, Synthesizer},
    types::DateKey,
    DigestPipeline, DigestPipelineBuilder, RunOutcome, Speaker,
};
use digest_store::AnyArtifactStore;

type Pipeline =
    DigestPipeline<HackerNewsFetcher, OpenAIClient, Synthesizer, FfmpegConcat, AnyArtifactStore>;

#[derive(Parser)]
#[command(name = "digest-pulse", about = "Daily Hacker News digest and podcast generator")]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    tts: TtsArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    merge: MergeArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once for a date and exit
    Run {
        /// Date to process (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<DateKey>,
        /// Regenerate the text even when it already exists
        #[arg(long)]
        force: bool,
        /// Re-synthesize the audio even when it already exists
        #[arg(long)]
        force_audio: bool,
    },
    /// Start the cron scheduler, processing today on every tick
    Cron {
        /// Cron schedule expression
        #[arg(long, env = "CRON_SCHEDULE", default_value = "0 0 8 * * *")]
        schedule: String,
    },
    /// Print the stored artifact of a date as JSON
    Show {
        #[arg(long)]
        date: DateKey,
    },
    /// Delete the stored artifact and audio of a date
    Delete {
        #[arg(long)]
        date: DateKey,
    },
    /// Synthesize a single text and write it next to an estimated .srt file
    Tts {
        text: String,
        #[arg(long, default_value = "female")]
        speaker: Speaker,
        #[arg(long, short, default_value = "speech.mp3")]
        output: PathBuf,
    },
}

/// `show` and `delete` never generate, so only generating commands need an
/// OpenAI key.
async fn build_pipeline(cli: &Cli, generates: bool) -> anyhow::Result<Pipeline> {
    let openai = if generates {
        cli.llm.authenticated_client()?
    } else {
        cli.llm.client()
    };
    let store = cli.store.connect().await?;
    let synthesizer = cli.tts.synthesizer(&openai)?;

    let pipeline = DigestPipelineBuilder::new(cli.pipeline.settings())
        .fetcher(HackerNewsFetcher::new()?)
        .generator(openai)
        .synthesizer(synthesizer)
        .merger(cli.merge.merger())
        .store(store)
        .retry_policy(cli.llm.retry_policy())
        .build();

    Ok(pipeline)
}

async fn handle_tick(_tick: Tick, pipeline: Data<Arc<Pipeline>>) -> anyhow::Result<()> {
    tracing::info!("Running scheduled pipeline...");

    match pipeline.run_for_date(None, 0, false, false).await {
        // worth another attempt once the store is back
        RunOutcome::StoreUnavailable => anyhow::bail!("Artifact store unavailable"),
        outcome => {
            tracing::info!(?outcome, "Scheduled run finished");
            Ok(())
        }
    }
}

async fn synthesize_to_file(
    synthesizer: &Synthesizer,
    text: &str,
    speaker: Speaker,
    output: &Path,
) -> anyhow::Result<()> {
    let (audio, subtitles) = match synthesizer {
        Synthesizer::Edge(edge) => {
            let synthesis = edge.synthesize_with_subtitles(text, speaker).await?;
            (synthesis.audio, synthesis.subtitles)
        }
        other => (other.synthesize(text, speaker).await?, estimate_srt(text)),
    };

    tokio::fs::write(output, &audio)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let srt_path = output.with_extension("srt");
    tokio::fs::write(&srt_path, subtitles)
        .await
        .with_context(|| format!("Failed to write {}", srt_path.display()))?;

    tracing::info!(
        provider = synthesizer.provider(),
        audio = %output.display(),
        subtitles = %srt_path.display(),
        "Wrote narration"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(cli.pipeline.environment.clone().into()),
            ..Default::default()
        },
    ));

    init_tracing_subscriber()?;

    match &cli.command {
        Command::Run {
            date,
            force,
            force_audio,
        } => {
            tracing::info!(max_items = cli.pipeline.max_items, "Running pipeline once...");
            let pipeline = build_pipeline(&cli, true).await?;
            let outcome = pipeline.run_for_date(*date, 0, *force, *force_audio).await;
            tracing::info!(?outcome, "Pipeline finished");
        }
        Command::Cron { schedule } => {
            tracing::info!(%schedule, "Starting cron scheduler...");
            let schedule = Schedule::from_str(schedule)?;
            let pipeline = Arc::new(build_pipeline(&cli, true).await?);

            let worker = WorkerBuilder::new("digest-pulse-cron")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(pipeline)
                .build(handle_tick);

            worker.run().await?;
        }
        Command::Show { date } => {
            let pipeline = build_pipeline(&cli, false).await?;
            let artifact = pipeline
                .load_artifact(date)
                .await?
                .with_context(|| format!("No artifact stored for {date}"))?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
        Command::Delete { date } => {
            let pipeline = build_pipeline(&cli, false).await?;
            pipeline.delete_date(date).await?;
        }
        Command::Tts {
            text,
            speaker,
            output,
        } => {
            let openai = match cli.tts.tts_provider {
                TtsProvider::Openai => cli.llm.authenticated_client()?,
                TtsProvider::Edge => cli.llm.client(),
            };
            let synthesizer = cli.tts.synthesizer(&openai)?;
            synthesize_to_file(&synthesizer, text, *speaker, output).await?;
        }
    }

    Ok(())
}

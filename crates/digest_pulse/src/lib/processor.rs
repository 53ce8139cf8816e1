pub mod builder;

use std::sync::Arc;

use anyhow::Context;
use digest_store::{ArtifactStore, Locator};

use crate::{
    audio::{AudioFormat, AudioMerger},
    config::PipelineSettings,
    error::Error,
    llm::retry::Retrying,
    registry::{PipelineStatus, RunGuard, RunRegistry, RunState},
    script::{parse_script, ScriptTurn, Speaker},
    source::SourceFetcher,
    tts::SpeechSynthesizer,
    types::{join_summaries, ContentArtifact, DateKey, Item, StorySummary},
    PromptRole, TextGenerator,
};

/// Where a run stopped. Runs never fail outright; this is what callers and
/// logs get instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run for the same date is in flight
    AlreadyRunning,
    /// Text and audio already exist and nothing was forced
    AlreadyComplete,
    /// The artifact store could not be read or written
    StoreUnavailable,
    /// The source listed nothing for the date
    NoItems,
    /// Every item was skipped
    NoSummaries,
    GenerationFailed(PromptRole),
    /// The artifact was written; `audio` tells whether this run stored a
    /// merged narration
    Completed { audio: bool },
}

/// Answer of [`DigestPipeline::spawn_run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted(DateKey),
    AlreadyRunning(DateKey),
}

enum Decision {
    Generate,
    Synthesize(ContentArtifact),
}

/// Turns one day of stories into summaries, a two-host podcast script, a
/// blog post, an intro and a merged narration, persisted per date.
#[derive(Debug)]
pub struct DigestPipeline<F, G, S, M, A>
where
    F: SourceFetcher + Send + Sync + 'static,
    G: TextGenerator + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
    M: AudioMerger + Send + Sync + 'static,
    A: ArtifactStore + Send + Sync + 'static,
{
    settings: PipelineSettings,
    registry: RunRegistry,
    fetcher: F,
    generator: Retrying<G>,
    synthesizer: S,
    merger: M,
    store: A,
}

impl<F, G, S, M, A> DigestPipeline<F, G, S, M, A>
where
    F: SourceFetcher + Send + Sync + 'static,
    G: TextGenerator + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
    M: AudioMerger + Send + Sync + 'static,
    A: ArtifactStore + Send + Sync + 'static,
{
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn status(&self) -> PipelineStatus {
        self.registry.status()
    }

    pub fn state(&self, date: &DateKey) -> RunState {
        self.registry.state(date)
    }

    fn resolve_date(&self, date: Option<DateKey>) -> DateKey {
        date.unwrap_or_else(|| DateKey::today(self.settings.timezone))
    }

    /// Runs the whole pipeline for `date` (today when `None`) and waits for
    /// it. `max_items == 0` uses the configured default.
    pub async fn run_for_date(
        &self,
        date: Option<DateKey>,
        max_items: usize,
        force_content: bool,
        force_audio: bool,
    ) -> RunOutcome {
        let date = self.resolve_date(date);
        let Some(guard) = self.registry.try_begin(&date) else {
            tracing::warn!(%date, "Run already in progress for this date");
            return RunOutcome::AlreadyRunning;
        };

        self.run_admitted(guard, max_items, force_content, force_audio)
            .await
    }

    /// Admits a run for `date` and executes it in the background. Admission
    /// happens before this returns, so a second call for the same date
    /// observes [`Admission::AlreadyRunning`].
    pub fn spawn_run(
        self: &Arc<Self>,
        date: Option<DateKey>,
        max_items: usize,
        force_content: bool,
        force_audio: bool,
    ) -> Admission {
        let date = self.resolve_date(date);
        let Some(guard) = self.registry.try_begin(&date) else {
            tracing::warn!(%date, "Run already in progress for this date");
            return Admission::AlreadyRunning(date);
        };

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline
                .run_admitted(guard, max_items, force_content, force_audio)
                .await
        });

        Admission::Accepted(date)
    }

    #[tracing::instrument(skip(self, guard), fields(date = %guard.date()))]
    async fn run_admitted(
        &self,
        guard: RunGuard,
        max_items: usize,
        force_content: bool,
        force_audio: bool,
    ) -> RunOutcome {
        let date = *guard.date();
        let max_items = if max_items == 0 {
            self.settings.max_items
        } else {
            max_items
        };

        let outcome = self
            .execute(&date, max_items, force_content, force_audio)
            .await;
        tracing::info!(?outcome, "Run finished");

        drop(guard);
        outcome
    }

    async fn execute(
        &self,
        date: &DateKey,
        max_items: usize,
        force_content: bool,
        force_audio: bool,
    ) -> RunOutcome {
        let decision = match self.decide(date, force_content, force_audio).await {
            Ok(decision) => decision,
            Err(outcome) => return outcome,
        };

        let artifact = match decision {
            Decision::Generate => match self.generate(date, max_items).await {
                Ok(artifact) => artifact,
                Err(outcome) => return outcome,
            },
            Decision::Synthesize(artifact) => artifact,
        };

        self.synthesize(date, artifact).await
    }

    #[tracing::instrument(skip(self))]
    async fn decide(
        &self,
        date: &DateKey,
        force_content: bool,
        force_audio: bool,
    ) -> Result<Decision, RunOutcome> {
        if force_content {
            tracing::info!("Regenerating content on request");
            return Ok(Decision::Generate);
        }

        let artifact = self
            .load_artifact(date)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to read existing artifact"))
            .map_err(|_| RunOutcome::StoreUnavailable)?;

        match artifact {
            None => Ok(Decision::Generate),
            Some(artifact) if artifact.has_audio() && !force_audio => {
                tracing::info!("Content and audio already exist");
                Err(RunOutcome::AlreadyComplete)
            }
            Some(artifact) => {
                tracing::info!("Content exists, synthesizing audio");
                Ok(Decision::Synthesize(artifact))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn generate(&self, date: &DateKey, max_items: usize) -> Result<ContentArtifact, RunOutcome> {
        let items = self
            .fetcher
            .list_items(date, max_items)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list items"))
            .map_err(|_| RunOutcome::NoItems)?;
        if items.is_empty() {
            tracing::info!("No items listed for this date");
            return Err(RunOutcome::NoItems);
        }

        let summaries = self.summarize_items(&items).await;
        tracing::info!(
            listed = items.len(),
            summarized = summaries.len(),
            "Summarized items"
        );
        if summaries.is_empty() {
            return Err(RunOutcome::NoSummaries);
        }

        let digest = join_summaries(&summaries);
        let podcast_script = self.generate_text(PromptRole::Podcast, &digest).await?;
        let blog_text = self.generate_text(PromptRole::Blog, &digest).await?;
        let intro = self.generate_text(PromptRole::Intro, &podcast_script).await?;

        let artifact = ContentArtifact::new(intro, podcast_script, blog_text);
        self.write_artifact(date, &artifact)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to write content artifact"))
            .map_err(|_| RunOutcome::StoreUnavailable)?;

        Ok(artifact)
    }

    /// Summaries in item order; failed items are left out
    async fn summarize_items(&self, items: &[Item]) -> Vec<StorySummary> {
        let mut summaries = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            if idx > 0 && !self.settings.pacing.is_zero() {
                tokio::time::sleep(self.settings.pacing).await;
            }

            match self.summarize_item(item).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::warn!(error = %e, "Skipping item"),
            }
        }

        summaries
    }

    #[tracing::instrument(skip(self, item), fields(item_id = %item.id))]
    async fn summarize_item(&self, item: &Item) -> Result<StorySummary, Error> {
        let skipped = |reason: String| Error::UnitSkipped {
            unit: format!("item {}", item.id),
            reason,
        };

        let content = self
            .fetcher
            .fetch_item_content(item, self.settings.content_char_cap)
            .await
            .map_err(|e| skipped(e.to_string()))?;
        if content.is_bodyless() {
            return Err(skipped("no article or discussion text".into()));
        }

        let text = self
            .generator
            .generate(PromptRole::Story, &content.to_payload())
            .await
            .map_err(|e| skipped(e.to_string()))?;

        Ok(StorySummary {
            item_id: item.id.clone(),
            text,
        })
    }

    async fn generate_text(&self, role: PromptRole, payload: &str) -> Result<String, RunOutcome> {
        self.generator
            .generate(role, payload)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %role, "Generation failed"))
            .map_err(|_| RunOutcome::GenerationFailed(role))
    }

    #[tracing::instrument(skip(self, artifact))]
    async fn synthesize(&self, date: &DateKey, mut artifact: ContentArtifact) -> RunOutcome {
        let turns = parse_script(&artifact.podcast_script);
        let segments = self.synthesize_turns(&turns).await;

        let mut audio = false;
        if segments.is_empty() {
            tracing::warn!(turns = turns.len(), "No script turn could be synthesized");
        } else {
            match self.publish_audio(date, segments).await {
                Ok(locator) => {
                    artifact.audio_locator = Some(locator.into_string());
                    audio = true;
                }
                Err(e) => tracing::error!(error = ?e, "Failed to publish merged audio"),
            }
        }

        match self.publish_intro(date, &artifact.intro).await {
            Ok(Some(locator)) => match artifact.auxiliary_audio_locators.first_mut() {
                Some(first) => *first = locator.into_string(),
                None => artifact.auxiliary_audio_locators.push(locator.into_string()),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = ?e, "Failed to publish intro audio"),
        }

        // written back even when no audio was produced
        if let Err(e) = self.write_artifact(date, &artifact).await {
            tracing::error!(error = ?e, "Failed to write back artifact");
            return RunOutcome::StoreUnavailable;
        }

        RunOutcome::Completed { audio }
    }

    /// One segment per successfully synthesized turn, in turn order
    async fn synthesize_turns(&self, turns: &[ScriptTurn]) -> Vec<Vec<u8>> {
        let mut segments = Vec::with_capacity(turns.len());

        for (idx, turn) in turns.iter().enumerate() {
            match self.synthesizer.synthesize(&turn.text, turn.speaker).await {
                Ok(bytes) if !bytes.is_empty() => segments.push(bytes),
                Ok(_) => tracing::warn!(turn = idx, "Synthesizer returned no audio, dropping turn"),
                Err(e) => {
                    let skipped = Error::UnitSkipped {
                        unit: format!("turn {idx} ({})", turn.speaker),
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %skipped, provider = self.synthesizer.provider(), "Dropping turn");
                }
            }
        }

        tracing::info!(
            turns = turns.len(),
            segments = segments.len(),
            "Synthesized script turns"
        );
        segments
    }

    async fn publish_audio(&self, date: &DateKey, segments: Vec<Vec<u8>>) -> anyhow::Result<Locator> {
        let merged = self.merger.merge(segments).await?;
        let content_type = audio_content_type(&merged);

        self.store
            .put(&self.settings.keys.audio(date), merged, content_type)
            .await
            .context("Failed to upload merged audio")
    }

    /// Narrates the intro with the male voice; `None` when there is no intro
    async fn publish_intro(&self, date: &DateKey, intro: &str) -> anyhow::Result<Option<Locator>> {
        if intro.trim().is_empty() {
            return Ok(None);
        }

        let audio = self.synthesizer.synthesize(intro.trim(), Speaker::Male).await?;
        if audio.is_empty() {
            anyhow::bail!("Synthesizer returned no intro audio");
        }
        let content_type = audio_content_type(&audio);

        let locator = self
            .store
            .put(&self.settings.keys.intro_audio(date), audio, content_type)
            .await
            .context("Failed to upload intro audio")?;
        Ok(Some(locator))
    }

    async fn write_artifact(&self, date: &DateKey, artifact: &ContentArtifact) -> anyhow::Result<()> {
        let bytes = artifact.to_json()?;
        self.store
            .put(&self.settings.keys.content(date), bytes, "application/json")
            .await
            .context("Failed to write content artifact")?;
        Ok(())
    }

    /// Stored artifact for `date`, or `None` when nothing was generated yet.
    /// A stored record that does not parse is an error, not an absence.
    pub async fn load_artifact(&self, date: &DateKey) -> anyhow::Result<Option<ContentArtifact>> {
        let key = self.settings.keys.content(date);
        if !self.store.exists(&key).await? {
            return Ok(None);
        }

        let bytes = self.store.get(&key).await?;
        let artifact = ContentArtifact::from_json(&bytes)
            .with_context(|| format!("Stored artifact {key} is not valid"))?;
        Ok(Some(artifact))
    }

    /// Removes the content record and every current and legacy audio object
    /// of `date`. The date's run slot is held meanwhile, so this is refused
    /// while a run is in flight; the date's run state is left as it was.
    #[tracing::instrument(skip(self))]
    pub async fn delete_date(&self, date: &DateKey) -> anyhow::Result<()> {
        let Some(_guard) = self.registry.try_hold(date) else {
            anyhow::bail!("A run for {date} is in progress");
        };

        let keys = &self.settings.keys;
        let all_keys = [keys.content(date), keys.audio(date), keys.intro_audio(date)]
            .into_iter()
            .chain(keys.legacy_audio(date));

        let mut failed = Vec::new();
        for key in all_keys {
            match self.store.delete(&key).await {
                Ok(()) => tracing::debug!(%key, "Deleted"),
                Err(e) => {
                    tracing::error!(error = ?e, %key, "Failed to delete");
                    failed.push(key);
                }
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("Failed to delete {}", failed.join(", "));
        }
        tracing::info!("Deleted all artifacts for date");
        Ok(())
    }
}

// merger output that is not sniffable has been re-encoded to mp3
fn audio_content_type(bytes: &[u8]) -> &'static str {
    match AudioFormat::sniff(bytes) {
        AudioFormat::Unknown => AudioFormat::Mp3.content_type(),
        format => format.content_type(),
    }
}

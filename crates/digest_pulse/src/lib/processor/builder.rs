use digest_store::ArtifactStore;

use crate::{
    audio::AudioMerger,
    config::PipelineSettings,
    llm::retry::{RetryPolicy, Retrying},
    registry::RunRegistry,
    source::SourceFetcher,
    tts::SpeechSynthesizer,
    DigestPipeline, TextGenerator,
};

pub struct DigestPipelineBuilder<F = (), G = (), S = (), M = (), A = ()> {
    settings: PipelineSettings,
    retry_policy: RetryPolicy,
    registry: RunRegistry,
    fetcher: F,
    generator: G,
    synthesizer: S,
    merger: M,
    store: A,
}

impl DigestPipelineBuilder {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            retry_policy: RetryPolicy::default(),
            registry: RunRegistry::new(),
            fetcher: (),
            generator: (),
            synthesizer: (),
            merger: (),
            store: (),
        }
    }
}

impl<F, G, S, M, A> DigestPipelineBuilder<F, G, S, M, A> {
    pub fn fetcher<F2: SourceFetcher + Send + Sync + 'static>(
        self,
        fetcher: F2,
    ) -> DigestPipelineBuilder<F2, G, S, M, A> {
        DigestPipelineBuilder {
            settings: self.settings,
            retry_policy: self.retry_policy,
            registry: self.registry,
            fetcher,
            generator: self.generator,
            synthesizer: self.synthesizer,
            merger: self.merger,
            store: self.store,
        }
    }

    /// The generator is wrapped in the retry policy when the pipeline is built
    pub fn generator<G2: TextGenerator + Send + Sync + 'static>(
        self,
        generator: G2,
    ) -> DigestPipelineBuilder<F, G2, S, M, A> {
        DigestPipelineBuilder {
            settings: self.settings,
            retry_policy: self.retry_policy,
            registry: self.registry,
            fetcher: self.fetcher,
            generator,
            synthesizer: self.synthesizer,
            merger: self.merger,
            store: self.store,
        }
    }

    pub fn synthesizer<S2: SpeechSynthesizer + Send + Sync + 'static>(
        self,
        synthesizer: S2,
    ) -> DigestPipelineBuilder<F, G, S2, M, A> {
        DigestPipelineBuilder {
            settings: self.settings,
            retry_policy: self.retry_policy,
            registry: self.registry,
            fetcher: self.fetcher,
            generator: self.generator,
            synthesizer,
            merger: self.merger,
            store: self.store,
        }
    }

    pub fn merger<M2: AudioMerger + Send + Sync + 'static>(
        self,
        merger: M2,
    ) -> DigestPipelineBuilder<F, G, S, M2, A> {
        DigestPipelineBuilder {
            settings: self.settings,
            retry_policy: self.retry_policy,
            registry: self.registry,
            fetcher: self.fetcher,
            generator: self.generator,
            synthesizer: self.synthesizer,
            merger,
            store: self.store,
        }
    }

    pub fn store<A2: ArtifactStore + Send + Sync + 'static>(
        self,
        store: A2,
    ) -> DigestPipelineBuilder<F, G, S, M, A2> {
        DigestPipelineBuilder {
            settings: self.settings,
            retry_policy: self.retry_policy,
            registry: self.registry,
            fetcher: self.fetcher,
            generator: self.generator,
            synthesizer: self.synthesizer,
            merger: self.merger,
            store,
        }
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Shares run bookkeeping with another pipeline instance
    pub fn registry(mut self, registry: RunRegistry) -> Self {
        self.registry = registry;
        self
    }
}

impl<F, G, S, M, A> DigestPipelineBuilder<F, G, S, M, A>
where
    F: SourceFetcher + Send + Sync + 'static,
    G: TextGenerator + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
    M: AudioMerger + Send + Sync + 'static,
    A: ArtifactStore + Send + Sync + 'static,
{
    pub fn build(self) -> DigestPipeline<F, G, S, M, A> {
        DigestPipeline {
            settings: self.settings,
            registry: self.registry,
            fetcher: self.fetcher,
            generator: Retrying::new(self.generator, self.retry_policy),
            synthesizer: self.synthesizer,
            merger: self.merger,
            store: self.store,
        }
    }
}

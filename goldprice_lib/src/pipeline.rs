//! Price discovery pipeline: walk the configured stages in order, run each
//! stage's strategies against its payload, and stop at the first candidate
//! that validates.

use std::fmt;

use goldprice_api::{Client, Endpoint, Error as SourceError, RawPayload};
use tracing::{debug, info, warn};

use crate::band::PlausibilityBand;
use crate::error::DiscoveryError;
use crate::strategy::{Candidate, Extractor};

/// Source identifier recorded when several stages were tried and none won.
pub const MULTIPLE_SOURCES: &str = "multiple_sources";

/// One source adapter paired with its strategies, in fallback order, and
/// the band its candidates must fall in.
#[derive(Debug)]
pub struct Stage {
    endpoint: Endpoint,
    strategies: Vec<Box<dyn Extractor>>,
    band: Option<PlausibilityBand>,
}

impl Stage {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            strategies: Vec::new(),
            band: None,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Extractor + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_boxed_strategy(mut self, strategy: Box<dyn Extractor>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_band(mut self, band: PlausibilityBand) -> Self {
        self.band = Some(band);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn band(&self) -> Option<PlausibilityBand> {
        self.band
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    fn validate(&self, candidate: &Candidate) -> Result<(), DiscoveryError> {
        if !candidate.price.is_finite() || candidate.price <= 0.0 {
            return Err(DiscoveryError::Validation(format!(
                "malformed price {}",
                candidate.price
            )));
        }
        match self.band {
            Some(band) if !band.contains(candidate.price) => {
                Err(DiscoveryError::Validation(format!(
                    "{} outside plausible range {}-{}",
                    candidate.price, band.min, band.max
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Pipeline states. Indices refer to the stage being worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Trying(usize),
    Validating(usize),
    Success(usize),
    Exhausted,
}

/// A failed attempt: which stage, which strategy (none for a failed fetch),
/// and why.
#[derive(Debug)]
pub struct AttemptFailure {
    pub source: String,
    pub strategy: Option<&'static str>,
    pub error: DiscoveryError,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            Some(strategy) => write!(f, "{} [{}]: {}", self.source, strategy, self.error),
            None => write!(f, "{}: {}", self.source, self.error),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// A validated candidate.
    Found(Candidate),
    /// The only configured source was fetched but nothing usable was in it.
    ParsingFailed,
    /// Every stage was tried without a validated candidate.
    AllMethodsFailed,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Discovery {
    pub outcome: Outcome,
    /// URL of the winning endpoint, or of the single stage, or
    /// [`MULTIPLE_SOURCES`].
    pub source: String,
    pub trace: Vec<PipelineState>,
    pub failures: Vec<AttemptFailure>,
}

impl Discovery {
    pub fn candidate(&self) -> Option<&Candidate> {
        match &self.outcome {
            Outcome::Found(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Found(_))
    }
}

/// Ordered stages plus the client that fetches them.
pub struct Pipeline {
    client: Client,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(client: Client, stages: Vec<Stage>) -> Self {
        Self { client, stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs one full pass. Never fails: every problem is folded into the
    /// returned [`Discovery`].
    pub async fn run(&self) -> Discovery {
        let mut run = RunState::default();
        run.enter(PipelineState::Idle);

        for (i, stage) in self.stages.iter().enumerate() {
            run.enter(PipelineState::Trying(i));
            let source = stage.endpoint.url();

            let payload = match self.client.fetch(&stage.endpoint).await {
                Ok(payload) => payload,
                Err(e) => {
                    // The body arrived, it just would not decode.
                    if matches!(e, SourceError::Decode { .. }) {
                        run.fetched += 1;
                    }
                    run.fail(source, None, e.into());
                    continue;
                }
            };
            run.fetched += 1;

            if let Some(candidate) = self.extract(i, stage, &payload, &mut run) {
                run.enter(PipelineState::Success(i));
                info!(
                    "Gold price {:.2} from {} ({})",
                    candidate.price,
                    stage.endpoint.id(),
                    source
                );
                return run.finish(Outcome::Found(candidate), source.to_string());
            }
        }

        run.enter(PipelineState::Exhausted);
        let (outcome, source) = match self.stages.as_slice() {
            [only] if run.fetched == 1 => (Outcome::ParsingFailed, only.endpoint.url().to_string()),
            [only] => (Outcome::AllMethodsFailed, only.endpoint.url().to_string()),
            _ => (Outcome::AllMethodsFailed, MULTIPLE_SOURCES.to_string()),
        };
        warn!(
            "No price found after {} failed attempt(s) across {} source(s)",
            run.failures.len(),
            self.stages.len()
        );
        run.finish(outcome, source)
    }

    fn extract(
        &self,
        index: usize,
        stage: &Stage,
        payload: &RawPayload,
        run: &mut RunState,
    ) -> Option<Candidate> {
        let source = stage.endpoint.url();
        for strategy in &stage.strategies {
            let Some(candidate) = strategy.extract(payload) else {
                run.fail(
                    source,
                    Some(strategy.name()),
                    DiscoveryError::Parse("no candidate".into()),
                );
                continue;
            };

            run.enter(PipelineState::Validating(index));
            match stage.validate(&candidate) {
                Ok(()) => {
                    debug!("{} accepted candidate {}", strategy.name(), candidate.price);
                    return Some(candidate);
                }
                Err(e) => run.fail(source, Some(strategy.name()), e),
            }
        }
        None
    }
}

#[derive(Default)]
struct RunState {
    trace: Vec<PipelineState>,
    failures: Vec<AttemptFailure>,
    fetched: usize,
}

impl RunState {
    fn enter(&mut self, state: PipelineState) {
        debug!("pipeline -> {:?}", state);
        self.trace.push(state);
    }

    fn fail(&mut self, source: &str, strategy: Option<&'static str>, error: DiscoveryError) {
        let failure = AttemptFailure {
            source: source.to_string(),
            strategy,
            error,
        };
        warn!("Attempt failed: {}", failure);
        self.failures.push(failure);
    }

    fn finish(self, outcome: Outcome, source: String) -> Discovery {
        Discovery {
            outcome,
            source,
            trace: self.trace,
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldprice_api::PayloadFormat;

    fn stage() -> Stage {
        let ep = Endpoint::new("test", "https://example.com/", PayloadFormat::Html).unwrap();
        Stage::new(ep).with_band(PlausibilityBand::new(1500.0, 6000.0))
    }

    #[test]
    fn validate_accepts_in_band() {
        assert!(stage().validate(&Candidate::price_only(2345.67)).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_band() {
        let err = stage().validate(&Candidate::price_only(187.5)).unwrap_err();
        assert!(matches!(err, DiscoveryError::Validation(_)));
        assert!(err.to_string().contains("187.5"));
    }

    #[test]
    fn validate_rejects_malformed() {
        let unbounded =
            Stage::new(Endpoint::new("t", "https://example.com/", PayloadFormat::Json).unwrap());
        assert!(unbounded.validate(&Candidate::price_only(12.0)).is_ok());
        assert!(unbounded.validate(&Candidate::price_only(f64::NAN)).is_err());
        assert!(unbounded.validate(&Candidate::price_only(-1.0)).is_err());
    }

    #[test]
    fn attempt_failure_display_names_strategy() {
        let failure = AttemptFailure {
            source: "https://goldprice.org/".into(),
            strategy: Some("meta_tag"),
            error: DiscoveryError::Parse("no candidate".into()),
        };
        assert_eq!(
            failure.to_string(),
            "https://goldprice.org/ [meta_tag]: parse: no candidate"
        );
    }
}

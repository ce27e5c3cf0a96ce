use tracing::info;

use crate::error::{ErrorCategory, Result, StudioError};
use crate::image::EncodedImage;
use crate::llm::client::GenerationClient;
use crate::llm::tier::Tier;
use crate::prompt::FittingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Generating,
    Editing,
}

/// One user's studio: the current shot plus the outcome of the last call.
/// Taking `&mut self` keeps calls on a session strictly sequential.
pub struct StudioSession {
    client: GenerationClient,
    tier: Tier,
    phase: SessionPhase,
    result: Option<EncodedImage>,
    last_error: Option<StudioError>,
}

impl StudioSession {
    pub fn new(client: GenerationClient, tier: Tier) -> Self {
        StudioSession {
            client,
            tier,
            phase: SessionPhase::Idle,
            result: None,
            last_error: None,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn set_tier(&mut self, tier: Tier) {
        if self.tier != tier {
            info!("Switching studio tier from {} to {}", self.tier, tier);
        }
        self.tier = tier;
    }

    #[allow(dead_code)]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&EncodedImage> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&StudioError> {
        self.last_error.as_ref()
    }

    /// A quota failure on the shared tier is the cue to offer the Pro tier.
    pub fn suggests_pro_upgrade(&self) -> bool {
        self.tier == Tier::Standard
            && self
                .last_error
                .as_ref()
                .is_some_and(|err| err.category() == ErrorCategory::QuotaExceeded)
    }

    pub fn needs_credential_reselection(&self) -> bool {
        self.last_error
            .as_ref()
            .is_some_and(|err| err.category() == ErrorCategory::Authorization)
    }

    pub async fn generate(&mut self, image: &str, config: &FittingConfig) -> Result<&EncodedImage> {
        self.phase = SessionPhase::Generating;
        self.result = None;
        self.last_error = None;

        let outcome = self.client.generate(image, config, self.tier).await;
        self.phase = SessionPhase::Idle;
        self.settle(outcome)
    }

    /// Edits the current shot. A failed edit keeps the previous shot.
    pub async fn edit(&mut self, instruction: &str) -> Result<&EncodedImage> {
        let Some(current) = self.result.as_ref().map(ToString::to_string) else {
            self.last_error = Some(StudioError::NothingToEdit);
            return Err(StudioError::NothingToEdit);
        };
        if instruction.trim().is_empty() {
            self.last_error = Some(StudioError::EmptyInstruction);
            return Err(StudioError::EmptyInstruction);
        }

        self.phase = SessionPhase::Editing;
        self.last_error = None;

        let outcome = self.client.edit(&current, instruction, self.tier).await;
        self.phase = SessionPhase::Idle;
        self.settle(outcome)
    }

    #[allow(dead_code)]
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.result = None;
        self.last_error = None;
    }

    fn settle(&mut self, outcome: Result<EncodedImage>) -> Result<&EncodedImage> {
        match outcome {
            Ok(image) => {
                let stored: &EncodedImage = self.result.insert(image);
                Ok(stored)
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::error::{Operation, Result, StudioError};
use crate::image::EncodedImage;
use crate::llm::gemini::{
    GeminiImageConfig, GeminiResponse, GenerationTransport, RequestPart, TransportError,
};
use crate::llm::tier::{Tier, TierTable};
use crate::prompt::{build_edit_instruction, build_generation_prompt, FittingConfig};
use crate::utils::timing::log_llm_timing;

const QUOTA_MARKER: &str = "RESOURCE_EXHAUSTED";
const INVALID_KEY_MARKER: &str = "API_KEY_INVALID";

/// Issues generate and edit calls against a generation backend. Holds no
/// per-request state, so one client can serve any number of sessions.
#[derive(Clone)]
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    tiers: TierTable,
    api_key: Option<String>,
}

impl GenerationClient {
    pub fn new(
        transport: Arc<dyn GenerationTransport>,
        tiers: TierTable,
        api_key: Option<String>,
    ) -> Self {
        GenerationClient {
            transport,
            tiers,
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }

    pub async fn generate(
        &self,
        image: &str,
        config: &FittingConfig,
        tier: Tier,
    ) -> Result<EncodedImage> {
        let api_key = self.api_key()?;
        let source = EncodedImage::parse(image)?;
        let prompt = build_generation_prompt(config);
        let image_config = GeminiImageConfig {
            aspect_ratio: Some(config.aspect_ratio.to_string()),
            image_size: self.tiers.profile(tier).image_size.clone(),
        };

        self.request(Operation::Generate, api_key, &source, prompt, image_config, tier)
            .await
    }

    pub async fn edit(
        &self,
        image: &str,
        edit_instruction: &str,
        tier: Tier,
    ) -> Result<EncodedImage> {
        if edit_instruction.trim().is_empty() {
            return Err(StudioError::EmptyInstruction);
        }
        let api_key = self.api_key()?;
        let source = EncodedImage::parse(image)?;
        let instruction = build_edit_instruction(edit_instruction);
        let image_config = GeminiImageConfig {
            aspect_ratio: None,
            image_size: self.tiers.profile(tier).image_size.clone(),
        };

        self.request(Operation::Edit, api_key, &source, instruction, image_config, tier)
            .await
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(StudioError::Config)
    }

    async fn request(
        &self,
        operation: Operation,
        api_key: &str,
        source: &EncodedImage,
        instruction: String,
        image_config: GeminiImageConfig,
        tier: Tier,
    ) -> Result<EncodedImage> {
        let model = self.tiers.profile(tier).model.as_str();
        let parts = vec![
            RequestPart::inline_image(source.mime_type(), source.data()),
            RequestPart::text(instruction),
        ];
        let metadata = json!({
            "tier": tier.as_str(),
            "mimeType": source.mime_type(),
            "aspectRatio": image_config.aspect_ratio,
            "imageSize": image_config.image_size,
        });

        let response = log_llm_timing("gemini", model, operation.as_str(), Some(metadata), || {
            self.transport
                .send_generation_request(api_key, model, parts, &image_config)
        })
        .await
        .map_err(|err| {
            warn!("Gemini {} failed on {} tier: {}", operation.as_str(), tier, err);
            classify_transport_error(operation, tier, &err)
        })?;

        let image = extract_image(&response).ok_or(StudioError::EmptyResult { operation })?;
        info!(
            "Gemini {} produced an image ({} base64 chars) on {} tier",
            operation.as_str(),
            image.data().len(),
            tier
        );
        Ok(image)
    }
}

/// First candidate only; the first part carrying inline data wins.
pub fn extract_image(response: &GeminiResponse) -> Option<EncodedImage> {
    let candidate = response.candidates.as_deref()?.first()?;
    let parts = candidate.content.as_ref()?.parts.as_deref()?;
    let inline_data = parts.iter().find_map(|part| part.inline_data.as_ref())?;
    if inline_data.data.is_empty() {
        return None;
    }
    Some(EncodedImage::from_backend_payload(&inline_data.data))
}

pub fn classify_transport_error(
    operation: Operation,
    tier: Tier,
    err: &TransportError,
) -> StudioError {
    let (status, message) = match err {
        TransportError::Status {
            status,
            message,
            body,
        } => {
            let text = message.clone().unwrap_or_else(|| body.clone());
            if *status == 429 || text.contains(QUOTA_MARKER) || body.contains(QUOTA_MARKER) {
                return StudioError::QuotaExceeded { tier };
            }
            (Some(*status), message.clone())
        }
        TransportError::Request(text) | TransportError::Decode(text) => (None, Some(text.clone())),
    };

    let text = message.as_deref().unwrap_or_default();
    if text.contains(QUOTA_MARKER) {
        return StudioError::QuotaExceeded { tier };
    }
    if matches!(status, Some(401 | 403))
        || text.contains(INVALID_KEY_MARKER)
        || text.contains("401")
    {
        return StudioError::Authorization;
    }

    StudioError::Backend {
        operation,
        message: message.filter(|text| !text.trim().is_empty()),
    }
}

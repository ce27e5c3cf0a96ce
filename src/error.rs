use std::fmt;

use crate::llm::tier::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Edit,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Edit => "edit",
        }
    }

    fn empty_result_message(self) -> &'static str {
        match self {
            Operation::Generate => "Generation completed but no image was returned.",
            Operation::Edit => "Editing completed but no image was returned.",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Operation::Generate => "Generation failed.",
            Operation::Edit => "Editing failed.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    InputFormat,
    Precondition,
    QuotaExceeded,
    Authorization,
    EmptyResult,
    UnknownBackend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::Config => "config_error",
            ErrorCategory::InputFormat => "input_format_error",
            ErrorCategory::Precondition => "precondition_error",
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::Authorization => "authorization_error",
            ErrorCategory::EmptyResult => "empty_result",
            ErrorCategory::UnknownBackend => "backend_error",
        };
        f.write_str(label)
    }
}

/// Every failure a studio operation can surface. None of these are retried
/// internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudioError {
    #[error("GEMINI_API_KEY environment variable is not configured.")]
    Config,
    #[error("Invalid image format.")]
    InputFormat,
    #[error("Edit instruction must not be empty.")]
    EmptyInstruction,
    #[error("There is no generated image to edit yet.")]
    NothingToEdit,
    #[error("{}", quota_message(*tier))]
    QuotaExceeded { tier: Tier },
    #[error("API key is invalid or unauthorized. Please verify your credentials.")]
    Authorization,
    #[error("{}", operation.empty_result_message())]
    EmptyResult { operation: Operation },
    #[error("{}", message.as_deref().unwrap_or(operation.fallback_message()))]
    Backend {
        operation: Operation,
        message: Option<String>,
    },
}

fn quota_message(tier: Tier) -> &'static str {
    match tier {
        Tier::Standard => "Free tier limit reached or service is busy. Please try again in a moment or switch to the Pro tier.",
        Tier::Pro => "Pro tier quota exhausted or service is busy. Please try again in a moment.",
    }
}

impl StudioError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StudioError::Config => ErrorCategory::Config,
            StudioError::InputFormat => ErrorCategory::InputFormat,
            StudioError::EmptyInstruction | StudioError::NothingToEdit => {
                ErrorCategory::Precondition
            }
            StudioError::QuotaExceeded { .. } => ErrorCategory::QuotaExceeded,
            StudioError::Authorization => ErrorCategory::Authorization,
            StudioError::EmptyResult { .. } => ErrorCategory::EmptyResult,
            StudioError::Backend { .. } => ErrorCategory::UnknownBackend,
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_message_suggests_pro_only_on_standard_tier() {
        let standard = StudioError::QuotaExceeded {
            tier: Tier::Standard,
        }
        .to_string();
        let pro = StudioError::QuotaExceeded { tier: Tier::Pro }.to_string();
        assert!(standard.contains("Pro tier"));
        assert!(standard.contains("try again"));
        assert!(!pro.contains("switch to"));
        assert!(pro.contains("try again"));
    }

    #[test]
    fn backend_error_prefers_backend_message() {
        let with_message = StudioError::Backend {
            operation: Operation::Generate,
            message: Some("Model overloaded".to_string()),
        };
        let without_message = StudioError::Backend {
            operation: Operation::Edit,
            message: None,
        };
        assert_eq!(with_message.to_string(), "Model overloaded");
        assert_eq!(without_message.to_string(), "Editing failed.");
        assert_eq!(with_message.category(), ErrorCategory::UnknownBackend);
    }

    #[test]
    fn empty_result_message_names_the_operation() {
        let err = StudioError::EmptyResult {
            operation: Operation::Generate,
        };
        assert_eq!(
            err.to_string(),
            "Generation completed but no image was returned."
        );
        assert_eq!(err.category(), ErrorCategory::EmptyResult);
    }
}

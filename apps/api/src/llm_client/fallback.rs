//! Model fallback chain — tries each configured model in order until one answers.

use tracing::{info, warn};

use crate::llm_client::{ChatModel, ChatRequest, Completion, LlmError};

/// Calls `llm` with each model in `models` until one returns a completion.
///
/// Auth failures stop the chain immediately. Every other error is logged and
/// the next model is tried. When the list is exhausted the error carries one
/// line per attempted model.
pub async fn complete_with_fallback(
    llm: &dyn ChatModel,
    models: &[String],
    system: &str,
    prompt: &str,
    api_key: Option<&str>,
) -> Result<Completion, LlmError> {
    if models.is_empty() {
        return Err(LlmError::NoModels);
    }

    let mut attempts = Vec::with_capacity(models.len());

    for (position, model) in models.iter().enumerate() {
        let request = ChatRequest {
            model: model.as_str(),
            system,
            prompt,
            api_key,
        };

        match llm.complete(&request).await {
            Ok(completion) => {
                if position > 0 {
                    info!(model = %model, position, "Fallback model answered");
                }
                return Ok(completion);
            }
            Err(e) if e.is_auth_failure() => {
                warn!(model = %model, "Model rejected credentials, aborting fallback: {e}");
                return Err(e);
            }
            Err(e) => {
                warn!(model = %model, "Model failed, trying next: {e}");
                attempts.push(format!("{model}: {e}"));
            }
        }
    }

    Err(LlmError::AllModelsFailed { attempts })
}

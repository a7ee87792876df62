//! Scripted `ChatModel` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{ChatModel, ChatRequest, Completion, LlmError};

#[derive(Clone)]
enum Script {
    Answer(String),
    Fail(u16),
}

/// Answers per model name. Models without a script fail with 404.
#[derive(Default)]
pub struct ScriptedModel {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, model: &str, text: &str) -> Self {
        self.scripts
            .insert(model.to_string(), Script::Answer(text.to_string()));
        self
    }

    pub fn fail(mut self, model: &str, status: u16) -> Self {
        self.scripts.insert(model.to_string(), Script::Fail(status));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(request.model.to_string());
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        match self.scripts.get(request.model) {
            Some(Script::Answer(text)) => Ok(Completion {
                text: text.clone(),
                model: request.model.to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
            Some(Script::Fail(status)) => Err(LlmError::Api {
                status: *status,
                message: format!("scripted failure {status}"),
            }),
            None => Err(LlmError::Api {
                status: 404,
                message: format!("model {} not found", request.model),
            }),
        }
    }
}

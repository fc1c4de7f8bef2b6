#![forbid(unsafe_code)]

use mm_engines::decision::{
    AnthropicMessagesClient, DecisionClient, DecisionError, OpenAiChatClient,
};

/// External decision-maker asked to pick a case.
///
/// Implementations own their retry policy; an `Err` here is final for the scenario.
pub trait DecisionMaker {
    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError>;
}

impl<T: DecisionMaker + ?Sized> DecisionMaker for &T {
    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        (**self).respond(system_prompt, user_prompt)
    }
}

impl DecisionMaker for OpenAiChatClient {
    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        OpenAiChatClient::respond(self, system_prompt, user_prompt)
    }
}

impl DecisionMaker for AnthropicMessagesClient {
    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        AnthropicMessagesClient::respond(self, system_prompt, user_prompt)
    }
}

impl DecisionMaker for DecisionClient {
    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        DecisionClient::respond(self, system_prompt, user_prompt)
    }
}

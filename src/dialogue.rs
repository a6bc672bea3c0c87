//! Intent-conditioned reply generation.
//!
//! Every turn first classifies the message, then asks the completion
//! backend for a short in-persona reply that knows the detected intent.
//! Only the most recent [`HISTORY_WINDOW`] turns of caller-owned history
//! reach the prompt.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::classifier::IntentClassifier;
use crate::providers::CompletionProvider;
use crate::types::{ChatReply, CompletionOptions, ConversationTurn, Intent, Label, Message};

/// Number of history turns forwarded to the model.
pub const HISTORY_WINDOW: usize = 4;

/// Sampling temperature for replies.
pub const REPLY_TEMPERATURE: f32 = 0.7;

/// Output budget for replies.
pub const REPLY_MAX_TOKENS: u32 = 150;

/// Shop name used in the persona.
pub const SHOP_NAME: &str = "Tatlı Rüyalar";

/// Menu items quoted to the model.
pub const MENU_SAMPLE: [&str; 4] = [
    "Fıstıklı Baklava",
    "Sütlaç",
    "San Sebastian Cheesecake",
    "Tiramisu",
];

/// The most recent `HISTORY_WINDOW` turns, oldest first.
pub fn recent_history(history: &[ConversationTurn]) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(HISTORY_WINDOW)..]
}

/// System instruction for a turn whose detected intent is `intent`.
pub fn system_instruction(intent: Label) -> String {
    format!(
        "Sen '{SHOP_NAME}' adında bir tatlı mağazasının yapay zeka asistanısın.\n\
         Tespit edilen kullanıcı niyeti: {detected}\n\
         \n\
         Kurallar:\n\
         1. Çok nazik, samimi ve iştah açıcı konuş.\n\
         2. Sadece tatlılar, içecekler ve mağaza hakkında konuş.\n\
         3. Eğer niyet '{order}' ise siparişi onayla ve başka bir isteği olup olmadığını sor.\n\
         4. Yanıtların kısa ve öz olsun (maksimum 3 cümle).\n\
         \n\
         Menüden Örnekler: {menu}.",
        detected = intent.as_str().to_uppercase(),
        order = Intent::OrderDessert,
        menu = MENU_SAMPLE.join(", "),
    )
}

/// Full message list: system instruction, recent history, then the new message.
pub fn build_messages(message: &str, intent: Label, history: &[ConversationTurn]) -> Vec<Message> {
    let recent = recent_history(history);
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(system_instruction(intent)));
    messages.extend(recent.iter().map(Message::from));
    messages.push(Message::user(message));
    messages
}

/// Apology shown when reply generation fails.
pub fn apology(detail: &impl std::fmt::Display) -> String {
    format!("Şu an fırın çok sıcak, yanıt veremiyorum: {detail}")
}

/// Produces replies for one completion backend and one classifier.
pub struct DialogueResponder {
    classifier: Arc<dyn IntentClassifier>,
    provider: Arc<dyn CompletionProvider>,
}

impl DialogueResponder {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            classifier,
            provider,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn IntentClassifier> {
        &self.classifier
    }

    /// Classify `message`, then reply to it.
    ///
    /// Never fails: the intent call degrades to a sentinel label and the
    /// reply call to an apology.
    pub async fn chat(&self, message: &str, history: &[ConversationTurn]) -> ChatReply {
        let intent = self.classifier.predict_intent(message).await;
        self.respond(message, intent, history).await
    }

    /// Reply to `message` given an intent that was already detected.
    #[instrument(skip(self, message, history), fields(provider = self.provider.name(), intent = %intent))]
    pub async fn respond(
        &self,
        message: &str,
        intent: Label,
        history: &[ConversationTurn],
    ) -> ChatReply {
        let messages = build_messages(message, intent, history);
        let options = CompletionOptions::new()
            .temperature(REPLY_TEMPERATURE)
            .max_tokens(REPLY_MAX_TOKENS);

        match self.provider.complete(&messages, &options).await {
            Ok(response) => ChatReply {
                reply: response.content.trim().to_string(),
                intent,
                failure: None,
            },
            Err(e) => {
                warn!(error = %e, "reply generation failed");
                ChatReply {
                    reply: apology(&e),
                    intent,
                    failure: Some(e.kind()),
                }
            }
        }
    }
}

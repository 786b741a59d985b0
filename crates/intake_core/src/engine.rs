//! crates/intake_core/src/engine.rs
//!
//! The turn-by-turn question selection engine. It decides, from the transcript
//! alone, whether to greet, ask a model-generated question from the approved
//! bank, issue the fixed closing invitation, or stop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::{assistant_turn_count, ChatMessage, Role, Turn};
use crate::policy::QuestionPolicy;
use crate::ports::ChatModelService;

pub const OPENING_QUESTION: &str = "What is your product and what does it do?";

pub const CLOSING_INVITATION: &str =
    "Would you like to share anything else about the product which would help us find you even better matches?";

pub const FALLBACK_CLOSING: &str = "Thank you. That's all the questions we needed for now.";

/// The approved question bank. The model may rephrase these but never invent new ones.
pub const APPROVED_QUESTIONS: [&str; 18] = [
    "What is the name or model of the product?",
    "What does this product do, and what problem does it solve?",
    "What industries or use-cases does this product serve?",
    "What are the key features or technical specifications?",
    "What is your current production capacity (per month/year)?",
    "What is the minimum order quantity (MOQ)?",
    "Are there specific regions or countries you are ready to supply to?",
    "Can you provide private labeling or custom packaging if required?",
    "Who are your current or typical customers (industries, business types)?",
    "Are you open to distributors?",
    "Which geographic regions are you currently supplying to?",
    "Are there any certifications the product complies with?",
    "What makes your product better or different from competitors?",
    "What feedback do you usually get from repeat clients?",
    "Have you supplied this product for any notable projects or brands?",
    "What are your after-sales services?",
    "Are you currently looking to enter new markets or industries?",
    "Is there any additional information that would help us position your product to the right clients?",
];

const SYSTEM_RULES: &str = r#"You are a product discovery assistant collecting essential, factual information about a client's product so that we can find customers for it. Keep a professional, conversational tone.

Rules:
1. Ask exactly ONE question at a time and wait for the reply.
2. ONLY ask questions adapted from the APPROVED list below. You may rephrase slightly but must keep the intent. Never invent new questions.
3. Use every answer to choose the next question. Keep track of what was already asked and never repeat a question.
4. Never ask about things a client cannot know: future demand, market size, market forecasts or trends.
5. Only ask about the client's current customers and the markets they sell to.
6. If the answer is vague ("I don't know", "not sure") or blank, follow up with a more specific version of the previous question that offers concrete attributes to comment on. For example, after an unanswered question about technical specifications: "No worries! Would you know the dimensions, materials used, weight, power requirements, or any certifications it has?"
7. Stop once enough information has been collected (usually no more than 20 questions).

APPROVED questions:"#;

const RETRY_RULES: &str = "Avoid forbidden topics like demand forecasting, market size or vague future trends. \
Do not repeat previously asked questions. Ask only one useful, new question from the approved list.";

/// The system instruction for question generation.
pub fn system_prompt() -> String {
    let bank = APPROVED_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{SYSTEM_RULES}\n{bank}\n\nYou must never ask a question that is not directly adapted from this list.")
}

fn strict_system_prompt() -> String {
    format!("{}\n\n{}", system_prompt(), RETRY_RULES)
}

/// Where a session stands, derived from the number of assistant turns issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Greeting,
    Questioning,
    FinalPrompt,
    Completed,
}

/// What the caller should do after the engine has looked at the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Show this question and wait for an answer.
    Ask(String),
    /// Show this closing message; the session is over.
    Finish(String),
    /// No further question; redirect to the completion view.
    Complete,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Assistant turns issued before the fixed closing invitation is asked.
    pub closing_turn: usize,
    pub temperature: f32,
    pub retry_temperature: f32,
    pub generation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            closing_turn: 14,
            temperature: 0.7,
            retry_temperature: 0.3,
            generation_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn phase(&self, assistant_turns: usize) -> ConversationPhase {
        match assistant_turns {
            0 => ConversationPhase::Greeting,
            n if n < self.closing_turn => ConversationPhase::Questioning,
            n if n == self.closing_turn => ConversationPhase::FinalPrompt,
            _ => ConversationPhase::Completed,
        }
    }
}

pub struct ConversationEngine {
    model: Arc<dyn ChatModelService>,
    policy: QuestionPolicy,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(model: Arc<dyn ChatModelService>, config: EngineConfig) -> Self {
        Self {
            model,
            policy: QuestionPolicy::default(),
            config,
        }
    }

    pub fn phase(&self, turns: &[Turn]) -> ConversationPhase {
        self.config.phase(assistant_turn_count(turns))
    }

    /// Decides the next assistant turn for the given transcript.
    pub async fn next_question(&self, turns: &[Turn]) -> NextStep {
        match self.phase(turns) {
            ConversationPhase::Greeting => NextStep::Ask(OPENING_QUESTION.to_string()),
            ConversationPhase::FinalPrompt => NextStep::Ask(CLOSING_INVITATION.to_string()),
            ConversationPhase::Completed => NextStep::Complete,
            ConversationPhase::Questioning => self.generate(turns).await,
        }
    }

    async fn generate(&self, turns: &[Turn]) -> NextStep {
        let history = history_messages(turns);

        if let Some(question) = self
            .attempt(system_prompt(), &history, self.config.temperature, turns)
            .await
        {
            return NextStep::Ask(question);
        }

        debug!("Retrying question generation with stricter instructions.");
        if let Some(question) = self
            .attempt(strict_system_prompt(), &history, self.config.retry_temperature, turns)
            .await
        {
            return NextStep::Ask(question);
        }

        warn!("Both question candidates were rejected; closing the conversation.");
        NextStep::Finish(FALLBACK_CLOSING.to_string())
    }

    async fn attempt(
        &self,
        system: String,
        history: &[ChatMessage],
        temperature: f32,
        turns: &[Turn],
    ) -> Option<String> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(Role::System, system));
        messages.extend_from_slice(history);

        let completion = tokio::time::timeout(
            self.config.generation_timeout,
            self.model.complete(&messages, temperature),
        )
        .await;

        let candidate = match completion {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                warn!("Question generation failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!(
                    "Question generation timed out after {:?}",
                    self.config.generation_timeout
                );
                return None;
            }
        };

        if candidate.is_empty() {
            warn!("Model returned an empty question.");
            return None;
        }

        match self.policy.check(&candidate, turns) {
            Ok(()) => Some(candidate),
            Err(rejection) => {
                warn!("Rejected question candidate '{}': {:?}", candidate, rejection);
                None
            }
        }
    }
}

/// The transcript as the model sees it: questions from the assistant, answers from the user.
fn history_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .filter_map(|turn| match turn.role {
            Role::Assistant => Some(ChatMessage::new(Role::Assistant, turn.question.clone())),
            Role::User => Some(ChatMessage::new(Role::User, turn.answer.clone())),
            Role::System => None,
        })
        .collect()
}

pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod interview;
pub mod provider;
pub mod state;
pub mod turn;

// Re-export main types for convenience
pub use ai::{ClaudeClient, EndpointClient, OllamaClient, OpenAIClient, ProviderTurnTaker};
pub use api::{Expert, PanelApi};
pub use config::Config;
pub use error::EvaluationError;
pub use evaluation::{
    Evaluation, EvaluationSummary, Phase, RatingScale, SkillRating, TurnOutcome,
    DEFAULT_TURN_TIMEOUT,
};
pub use interview::{
    filter_interviews, parse_skills, Interview, InterviewDraft, InterviewRecord, InterviewStats,
};
pub use provider::{build_turn_taker, resolve_model, Provider};
pub use state::{ChatMessage, ChatRole};
pub use turn::{run_turn, TurnReply, TurnRequest, TurnTaker};

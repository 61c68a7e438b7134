/// Failures surfaced by the evaluation dialogue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("no evaluation session has been started")]
    NotStarted,

    #[error("a reply is already waiting for the chat service")]
    ConcurrentSubmission,

    #[error("the evaluation session is complete")]
    SessionComplete,

    /// The chat service failed or timed out. The session stays usable and
    /// the failure is also recorded in the transcript.
    #[error("chat service failure: {0}")]
    RemoteFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{error, info};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use panel_core::{
    run_turn, Evaluation, EvaluationError, InterviewDraft, InterviewRecord, PanelApi, Phase,
    RatingScale, TurnOutcome, TurnReply, TurnTaker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Ratings,
}

/// A chat call running in the background, tagged with the session it was
/// issued under
pub struct PendingTurn {
    pub generation: u64,
    pub handle: JoinHandle<anyhow::Result<TurnReply>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // The interview being prepared and its evaluation
    pub draft: InterviewDraft,
    pub evaluation: Evaluation,
    pub pending_turn: Option<PendingTurn>,
    pub taker: Arc<dyn TurnTaker>,
    pub taker_label: String,
    pub turn_timeout: Duration,

    // Reply draft
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat pane
    pub chat_width: u16,  // inner width of the chat pane
    pub ratings_state: ListState,

    // Submission
    pub api: Option<PanelApi>,
    pub submit_task: Option<JoinHandle<anyhow::Result<String>>>,
    pub submitted_id: Option<String>,

    pub status: Option<String>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub ratings_area: Option<Rect>,
}

impl App {
    pub fn new(
        draft: InterviewDraft,
        taker: Arc<dyn TurnTaker>,
        taker_label: String,
        turn_timeout: Duration,
        scale: RatingScale,
        api: Option<PanelApi>,
    ) -> Self {
        let mut ratings_state = ListState::default();
        if !draft.skills().is_empty() {
            ratings_state.select(Some(0));
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Chat,

            draft,
            evaluation: Evaluation::with_scale(scale),
            pending_turn: None,
            taker,
            taker_label,
            turn_timeout,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            ratings_state,

            api,
            submit_task: None,
            submitted_id: None,

            status: Some("Press 'b' to begin the evaluation".to_string()),
            animation_frame: 0,

            chat_area: None,
            ratings_area: None,
        }
    }

    /// Start (or restart) the evaluation over the draft's skills
    pub fn begin_evaluation(&mut self) {
        let skills = self.draft.skills();
        match self.evaluation.start(&skills) {
            Ok(()) => {
                // Its reply would be stale anyway
                if let Some(pending) = self.pending_turn.take() {
                    pending.handle.abort();
                }
                self.chat_scroll = 0;
                self.ratings_state.select(Some(0));
                self.input_mode = InputMode::Editing;
                self.status = Some(format!("Evaluating {} skill(s)", skills.len()));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Send the reply draft to the chat service in the background
    pub fn submit_input(&mut self) {
        let request = match self.evaluation.begin_reply(&self.input) {
            Ok(request) => request,
            Err(EvaluationError::ConcurrentSubmission) => {
                self.status = Some("Still waiting for the last reply...".to_string());
                return;
            }
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };

        self.input.clear();
        self.input_cursor = 0;
        self.status = None;
        self.scroll_chat_to_bottom();

        let generation = request.generation;
        let taker = Arc::clone(&self.taker);
        let deadline = self.turn_timeout;
        let handle = tokio::spawn(async move { run_turn(&*taker, &request, deadline).await });
        self.pending_turn = Some(PendingTurn { generation, handle });
    }

    /// Hand finished background work back to the evaluation
    pub async fn poll_tasks(&mut self) {
        if self.pending_turn.as_ref().is_some_and(|p| p.handle.is_finished()) {
            if let Some(pending) = self.pending_turn.take() {
                let result = match pending.handle.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("chat task failed: {}", e)),
                };
                let outcome = self.evaluation.complete_reply(pending.generation, result);
                self.apply_outcome(outcome);
            }
        }

        if self.submit_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.submit_task.take() {
                match task.await {
                    Ok(Ok(id)) => {
                        info!("Interview created with id {}", id);
                        self.status = Some(format!("Interview created ({})", id));
                        self.submitted_id = Some(id);
                    }
                    Ok(Err(e)) => {
                        error!("Interview submission failed: {:#}", e);
                        self.status = Some(format!("Submit failed: {}", e));
                    }
                    Err(e) => self.status = Some(format!("Submit failed: {}", e)),
                }
            }
        }
    }

    fn apply_outcome(&mut self, outcome: Result<TurnOutcome, EvaluationError>) {
        match outcome {
            Ok(TurnOutcome::Continued) | Ok(TurnOutcome::Stale) => {}
            Ok(TurnOutcome::Advanced { rated, rating, next }) => {
                self.status = Some(format!("{} rated {}; on to {}", rated, rating, next));
                self.ratings_state.select(self.evaluation.current_skill_index());
            }
            Ok(TurnOutcome::Completed { rated, rating }) => {
                self.status = Some(format!(
                    "{} rated {}. All skills covered, press 's' to submit",
                    rated, rating
                ));
                self.input_mode = InputMode::Normal;
            }
            Err(e) => self.status = Some(e.to_string()),
        }
        self.scroll_chat_to_bottom();
    }

    /// Override the selected skill's rating
    pub fn set_manual_rating(&mut self, rating: f64) {
        let Some(index) = self.ratings_state.selected() else {
            return;
        };
        match self.evaluation.record_manual_rating(index, rating) {
            Ok(()) => {
                let skill = self.evaluation.skills().get(index).cloned().unwrap_or_default();
                self.status = Some(format!("{} set to {}", skill, rating));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Post the interview with the ratings gathered so far
    pub fn submit_interview(&mut self) {
        if self.submit_task.is_some() {
            return;
        }
        if let Err(e) = self.draft.validate() {
            self.status = Some(e.to_string());
            return;
        }
        if self.evaluation.is_awaiting() {
            self.status = Some("Wait for the current reply before submitting".to_string());
            return;
        }

        let record = InterviewRecord::new(self.draft.clone(), self.evaluation.finalize());
        match self.api.clone() {
            Some(api) => {
                self.status = Some("Submitting interview...".to_string());
                self.submit_task = Some(tokio::spawn(async move {
                    api.create_interview(&record).await
                }));
            }
            None => {
                info!(
                    "No API configured, interview record: {}",
                    serde_json::to_string(&record).unwrap_or_default()
                );
                self.status = Some(format!(
                    "No api_base_url configured; overall rating {}",
                    record.overall_rating
                ));
            }
        }
    }

    pub fn ratings_nav_down(&mut self) {
        let len = self.rating_rows().len();
        if len > 0 {
            let i = self.ratings_state.selected().unwrap_or(0);
            self.ratings_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn ratings_nav_up(&mut self) {
        let i = self.ratings_state.selected().unwrap_or(0);
        self.ratings_state.select(Some(i.saturating_sub(1)));
    }

    /// Skill names with their ratings; before the session starts these come
    /// from the draft
    pub fn rating_rows(&self) -> Vec<(String, Option<f64>)> {
        if self.evaluation.phase() == Phase::NotStarted {
            self.draft.skills().into_iter().map(|s| (s, None)).collect()
        } else {
            self.evaluation
                .slots()
                .map(|(skill, rating)| (skill.to_string(), rating))
                .collect()
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.pending_turn.is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_thinking() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.visible_chat_height());
        self.chat_scroll = (self.chat_scroll + lines).min(max);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = self.visible_chat_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered height of the transcript at the current chat width
    fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.evaluation.transcript() {
            total_lines = total_lines.saturating_add(1); // Role line
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let wrapped = line.chars().count() / wrap_width + 1;
                total_lines = total_lines.saturating_add(u16::try_from(wrapped).unwrap_or(u16::MAX));
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_thinking() {
            total_lines = total_lines.saturating_add(2);
        }
        total_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panel_core::TurnRequest;

    /// Rates every skill with the length of the last reply
    struct Echo;

    #[async_trait]
    impl TurnTaker for Echo {
        async fn take_turn(&self, request: &TurnRequest) -> anyhow::Result<TurnReply> {
            let len = request
                .transcript
                .last()
                .map(|m| m.content.len())
                .unwrap_or_default();
            Ok(TurnReply::rated("Noted", len as f64))
        }
    }

    fn app() -> App {
        let draft = InterviewDraft {
            subject: "Platform".to_string(),
            date: "2024-06-01".to_string(),
            candidate_name: "Ana".to_string(),
            required_expertise: "Go, SQL".to_string(),
        };
        App::new(
            draft,
            Arc::new(Echo),
            "echo".to_string(),
            Duration::from_secs(5),
            RatingScale::default(),
            None,
        )
    }

    async fn settle(app: &mut App) {
        while app.pending_turn.is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
            app.poll_tasks().await;
        }
    }

    #[test]
    fn rows_come_from_draft_before_start() {
        let app = app();
        assert_eq!(
            app.rating_rows(),
            vec![("Go".to_string(), None), ("SQL".to_string(), None)]
        );
        assert_eq!(app.ratings_state.selected(), Some(0));
    }

    #[test]
    fn manual_rating_before_start_reports_error() {
        let mut app = app();
        app.set_manual_rating(5.0);
        assert_eq!(app.status.as_deref(), Some("no evaluation session has been started"));
    }

    #[test]
    fn manual_rating_applies_to_selected_skill() {
        let mut app = app();
        app.begin_evaluation();
        app.ratings_nav_down();
        app.set_manual_rating(9.0);
        assert_eq!(app.rating_rows()[1], ("SQL".to_string(), Some(9.0)));
        assert_eq!(app.evaluation.finalize().overall, 9);
    }

    #[tokio::test]
    async fn replies_advance_through_skills() {
        let mut app = app();
        app.begin_evaluation();
        assert_eq!(app.input_mode, InputMode::Editing);

        app.input = "1234567".to_string();
        app.submit_input();
        assert!(app.is_thinking());
        assert!(app.input.is_empty());

        // A second reply is refused while the first is out
        app.input = "again".to_string();
        app.submit_input();
        assert_eq!(app.status.as_deref(), Some("Still waiting for the last reply..."));
        app.input.clear();

        settle(&mut app).await;
        assert_eq!(app.evaluation.current_skill(), Some("SQL"));
        assert_eq!(app.ratings_state.selected(), Some(1));

        app.input = "12345".to_string();
        app.submit_input();
        settle(&mut app).await;

        assert_eq!(app.evaluation.phase(), Phase::Complete);
        let summary = app.evaluation.finalize();
        assert_eq!(summary.overall, 6);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn restart_drops_pending_turn() {
        let mut app = app();
        app.begin_evaluation();
        app.input = "something".to_string();
        app.submit_input();

        app.begin_evaluation();
        assert!(app.pending_turn.is_none());
        assert_eq!(app.evaluation.transcript().len(), 1);
        assert!(app.evaluation.finalize().ratings.is_empty());
    }

    #[test]
    fn huge_transcript_saturates_line_count() {
        let mut app = app();
        app.begin_evaluation();
        app.chat_width = 1;
        app.chat_height = 10;

        let huge = "x".repeat(70_000);
        let request = app.evaluation.begin_reply(&huge).unwrap();
        app.evaluation
            .complete_reply(request.generation, Ok(TurnReply::continuation(huge.clone())))
            .unwrap();

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }

    #[tokio::test]
    async fn submit_without_api_reports_overall() {
        let mut app = app();
        app.begin_evaluation();
        app.set_manual_rating(4.0);
        app.submit_interview();
        assert!(app.submit_task.is_none());
        assert_eq!(
            app.status.as_deref(),
            Some("No api_base_url configured; overall rating 4")
        );
    }
}

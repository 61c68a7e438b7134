//! Expertise evaluation dialogue
//!
//! Walks a candidate through an ordered list of skills one conversation turn
//! at a time. Each user reply is forwarded to a [`TurnTaker`]; a reply that
//! carries a rating resolves the current skill and moves on to the next one.
//!
//! The engine is split into a synchronous half ([`Evaluation::begin_reply`])
//! and a completion half ([`Evaluation::complete_reply`]) so front ends can
//! run the chat call on a background task. Every request is tagged with the
//! session generation it was issued under, and completions from an older
//! generation are dropped.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::state::ChatMessage;
use crate::turn::{run_turn, TurnReply, TurnRequest, TurnTaker};

/// Deadline for a single chat turn
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(15);

/// Inclusive bounds for per-skill ratings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 10.0 }
    }
}

impl RatingScale {
    pub fn new(min: f64, max: f64) -> Result<Self, EvaluationError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(EvaluationError::InvalidInput(format!(
                "rating scale {}..={} is not a valid range",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, rating: f64) -> f64 {
        rating.clamp(self.min, self.max)
    }
}

/// Where the dialogue currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Waiting for the user to talk about skill `i`
    Evaluating(usize),
    /// A reply about skill `i` is with the chat service
    AwaitingRemote(usize),
    Complete,
}

/// Result of applying a chat service reply
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Still discussing the same skill
    Continued,
    /// The skill was rated and the next one is up
    Advanced { rated: String, rating: f64, next: String },
    /// The last skill was rated
    Completed { rated: String, rating: f64 },
    /// The reply belonged to an earlier session and was dropped
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRating {
    pub skill: String,
    pub rating: f64,
}

/// Ratings gathered so far plus their rounded mean
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub ratings: Vec<SkillRating>,
    pub overall: i64,
}

impl EvaluationSummary {
    pub fn from_ratings(ratings: Vec<SkillRating>) -> Self {
        let overall = if ratings.is_empty() {
            0
        } else {
            let total: f64 = ratings.iter().map(|r| r.rating).sum();
            (total / ratings.len() as f64).round() as i64
        };
        Self { ratings, overall }
    }
}

#[derive(Debug, Clone)]
struct Session {
    skills: Vec<String>,
    transcript: Vec<ChatMessage>,
    // None once every skill has been rated
    current: Option<usize>,
    // One slot per queue entry so repeated skill names keep separate ratings
    ratings: Vec<Option<f64>>,
    in_flight: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    generation: u64,
    scale: RatingScale,
    session: Option<Session>,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(scale: RatingScale) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Begin a fresh session over `skills`, in order.
    ///
    /// Any reply still out for a previous session is ignored when it lands.
    pub fn start<I, S>(&mut self, skills: I) -> Result<(), EvaluationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let skills: Vec<String> = skills
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .collect();

        if skills.is_empty() {
            return Err(EvaluationError::InvalidInput(
                "at least one skill is required".to_string(),
            ));
        }
        if let Some(pos) = skills.iter().position(|s| s.is_empty()) {
            return Err(EvaluationError::InvalidInput(format!(
                "skill #{} is blank",
                pos + 1
            )));
        }

        let mut seen = HashSet::new();
        for skill in &skills {
            if !seen.insert(skill.as_str()) {
                warn!("Skill '{}' is listed more than once; each entry is rated separately", skill);
            }
        }

        if self.session.as_ref().is_some_and(|s| s.in_flight) {
            debug!("Abandoning in-flight turn from generation {}", self.generation);
        }
        self.generation = self.generation.wrapping_add(1);

        info!(
            "Starting evaluation #{} over {} skill(s): {}",
            self.generation,
            skills.len(),
            skills.join(", ")
        );

        let ratings = vec![None; skills.len()];
        let transcript = vec![ChatMessage::assistant(opening_prompt(&skills[0]))];
        self.session = Some(Session {
            skills,
            transcript,
            current: Some(0),
            ratings,
            in_flight: false,
        });
        Ok(())
    }

    /// Record the user's reply and hand back the request for the chat service.
    ///
    /// The user message is appended right away, whatever happens to the
    /// remote call afterwards.
    pub fn begin_reply(&mut self, text: &str) -> Result<TurnRequest, EvaluationError> {
        let generation = self.generation;
        let session = self.session.as_mut().ok_or(EvaluationError::NotStarted)?;
        let index = session.current.ok_or(EvaluationError::SessionComplete)?;
        if session.in_flight {
            return Err(EvaluationError::ConcurrentSubmission);
        }
        if text.trim().is_empty() {
            return Err(EvaluationError::InvalidInput("reply is blank".to_string()));
        }

        session.transcript.push(ChatMessage::user(text));
        session.in_flight = true;

        Ok(TurnRequest {
            generation,
            skill_index: index,
            transcript: session.transcript.clone(),
            current_skill: session.skills[index].clone(),
        })
    }

    /// Apply the chat service's answer to the request issued under `generation`.
    ///
    /// A failed call is recorded in the transcript and returned as
    /// [`EvaluationError::RemoteFailure`]; ratings and the current skill stay
    /// put and the user may reply again.
    pub fn complete_reply(
        &mut self,
        generation: u64,
        result: anyhow::Result<TurnReply>,
    ) -> Result<TurnOutcome, EvaluationError> {
        if generation != self.generation {
            debug!(
                "Dropping reply for generation {} (current is {})",
                generation, self.generation
            );
            return Ok(TurnOutcome::Stale);
        }
        let scale = self.scale;
        let Some(session) = self.session.as_mut() else {
            return Ok(TurnOutcome::Stale);
        };
        let Some(index) = session.current.filter(|_| session.in_flight) else {
            debug!("Dropping reply with no turn in flight");
            return Ok(TurnOutcome::Stale);
        };
        session.in_flight = false;

        let reply = result.and_then(|reply| match reply.rating {
            Some(r) if !r.is_finite() => Err(anyhow!("chat service returned an unusable rating")),
            _ => Ok(reply),
        });

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!("Turn for '{}' failed: {}", session.skills[index], reason);
                session
                    .transcript
                    .push(ChatMessage::assistant(failure_message(&session.skills[index])));
                return Err(EvaluationError::RemoteFailure(reason));
            }
        };

        session.transcript.push(ChatMessage::assistant(reply.content));

        let Some(raw) = reply.rating else {
            return Ok(TurnOutcome::Continued);
        };
        let rating = scale.clamp(raw);
        if rating != raw {
            warn!(
                "Rating {} for '{}' is outside {}..={}, using {}",
                raw, session.skills[index], scale.min, scale.max, rating
            );
        }

        let rated = session.skills[index].clone();
        session.ratings[index] = Some(rating);
        info!("Rated '{}' at {}", rated, rating);

        let next = index + 1;
        if next < session.skills.len() {
            let next_skill = session.skills[next].clone();
            session.current = Some(next);
            session
                .transcript
                .push(ChatMessage::assistant(transition_prompt(&next_skill)));
            Ok(TurnOutcome::Advanced {
                rated,
                rating,
                next: next_skill,
            })
        } else {
            session.current = None;
            session.transcript.push(ChatMessage::assistant(closing_message()));
            info!("Evaluation #{} complete", self.generation);
            Ok(TurnOutcome::Completed { rated, rating })
        }
    }

    /// Submit a reply and wait for the chat service, bounded by `deadline`.
    pub async fn submit_reply<T>(
        &mut self,
        text: &str,
        taker: &T,
        deadline: Duration,
    ) -> Result<TurnOutcome, EvaluationError>
    where
        T: TurnTaker + ?Sized,
    {
        let request = self.begin_reply(text)?;
        let result = run_turn(taker, &request, deadline).await;
        self.complete_reply(request.generation, result)
    }

    /// Set a skill's rating by hand, e.g. when the chat service is unavailable.
    pub fn record_manual_rating(&mut self, index: usize, rating: f64) -> Result<(), EvaluationError> {
        if !rating.is_finite() {
            return Err(EvaluationError::InvalidInput(format!(
                "rating {} is not a number",
                rating
            )));
        }
        let rating = self.scale.clamp(rating);
        let session = self.session.as_mut().ok_or(EvaluationError::NotStarted)?;
        let slot = session.ratings.get_mut(index).ok_or_else(|| {
            EvaluationError::InvalidInput(format!("no skill at position {}", index + 1))
        })?;
        *slot = Some(rating);
        info!("Manually rated '{}' at {}", session.skills[index], rating);
        Ok(())
    }

    /// Ratings recorded so far, in queue order, and their rounded mean.
    pub fn finalize(&self) -> EvaluationSummary {
        let ratings = self
            .slots()
            .filter_map(|(skill, rating)| {
                rating.map(|rating| SkillRating {
                    skill: skill.to_string(),
                    rating,
                })
            })
            .collect();
        EvaluationSummary::from_ratings(ratings)
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::NotStarted,
            Some(Session { current: None, .. }) => Phase::Complete,
            Some(Session {
                current: Some(i),
                in_flight: true,
                ..
            }) => Phase::AwaitingRemote(*i),
            Some(Session {
                current: Some(i), ..
            }) => Phase::Evaluating(*i),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.session
            .as_ref()
            .map(|s| s.transcript.as_slice())
            .unwrap_or_default()
    }

    pub fn skills(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.skills.as_slice())
            .unwrap_or_default()
    }

    pub fn current_skill_index(&self) -> Option<usize> {
        self.session.as_ref().and_then(|s| s.current)
    }

    pub fn current_skill(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        session.current.map(|i| session.skills[i].as_str())
    }

    pub fn rating(&self, index: usize) -> Option<f64> {
        self.session
            .as_ref()
            .and_then(|s| s.ratings.get(index).copied().flatten())
    }

    /// Every queued skill with its rating, if any
    pub fn slots(&self) -> impl Iterator<Item = (&str, Option<f64>)> + '_ {
        self.session.iter().flat_map(|s| {
            s.skills
                .iter()
                .zip(s.ratings.iter())
                .map(|(skill, rating)| (skill.as_str(), *rating))
        })
    }

    pub fn is_awaiting(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.in_flight)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }
}

pub fn opening_prompt(skill: &str) -> String {
    format!(
        "Let's start with {skill}. Tell me about your background in {skill}: \
         what have you built with it, and for how long?"
    )
}

pub fn transition_prompt(skill: &str) -> String {
    format!("Thanks. Next up is {skill}. How would you describe your experience with {skill}?")
}

pub fn closing_message() -> String {
    "That covers every skill on the list. Thanks for walking me through your experience; \
     the ratings are ready for review."
        .to_string()
}

pub fn failure_message(skill: &str) -> String {
    format!(
        "Sorry, I couldn't reach the evaluation service. Send your answer about {skill} again, \
         or enter a rating for it manually."
    )
}

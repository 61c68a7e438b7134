use std::time::Duration;

use panel_core::ai::{ClaudeClient, LlmBackend, OllamaClient, OpenAIClient, ProviderTurnTaker};
use panel_core::{
    filter_interviews, ChatMessage, EndpointClient, Evaluation, EvaluationError, InterviewDraft,
    InterviewRecord, InterviewStats, PanelApi, Phase, TurnOutcome, TurnReply, TurnRequest,
    TurnTaker,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEADLINE: Duration = Duration::from_secs(5);

fn request() -> TurnRequest {
    TurnRequest {
        generation: 1,
        skill_index: 0,
        transcript: vec![
            ChatMessage::assistant("Tell me about Go."),
            ChatMessage::user("Three years of services."),
        ],
        current_skill: "Go".to_string(),
    }
}

#[tokio::test]
async fn endpoint_posts_transcript_and_skill() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "currentSkill": "Go",
            "transcript": [
                {"role": "assistant", "content": "Tell me about Go."},
                {"role": "user", "content": "Three years of services."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "Great",
            "rating": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = EndpointClient::new(&server.uri());
    let reply = client.take_turn(&request()).await.unwrap();
    assert_eq!(reply, TurnReply::rated("Great", 7.0));
}

#[tokio::test]
async fn endpoint_error_status_becomes_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = EndpointClient::new(&server.uri());
    let mut eval = Evaluation::new();
    eval.start(["Go", "SQL"]).unwrap();

    let result = eval.submit_reply("I used Go for 3 years", &client, DEADLINE).await;
    match result {
        Err(EvaluationError::RemoteFailure(reason)) => assert!(reason.contains("503")),
        other => panic!("expected remote failure, got {:?}", other),
    }
    assert_eq!(eval.phase(), Phase::Evaluating(0));
    assert_eq!(eval.transcript().len(), 3);
}

#[tokio::test]
async fn slow_endpoint_hits_the_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": "late", "rating": 9}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = EndpointClient::new(&server.uri());
    let mut eval = Evaluation::new();
    eval.start(["Go"]).unwrap();

    let result = eval
        .submit_reply("hello", &client, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(EvaluationError::RemoteFailure(_))));
    assert!(eval.finalize().ratings.is_empty());
}

#[tokio::test]
async fn full_session_against_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"currentSkill": "Go"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "Great", "rating": 7})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"currentSkill": "SQL"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "Thanks", "rating": 5})))
        .mount(&server)
        .await;

    let client = EndpointClient::new(&server.uri());
    let mut eval = Evaluation::new();
    eval.start(["Go", "SQL"]).unwrap();

    let first = eval.submit_reply("I used Go for 3 years", &client, DEADLINE).await.unwrap();
    assert!(matches!(first, TurnOutcome::Advanced { ref next, .. } if next == "SQL"));
    let second = eval.submit_reply("Intermediate SQL", &client, DEADLINE).await.unwrap();
    assert!(matches!(second, TurnOutcome::Completed { .. }));

    let summary = eval.finalize();
    assert_eq!(summary.ratings.len(), 2);
    assert_eq!(summary.overall, 6);
}

#[tokio::test]
async fn openai_reply_is_parsed_from_json_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{\"content\": \"Which frameworks?\"}"}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAIClient::new("test-key").with_base_url(&server.uri());
    let taker = ProviderTurnTaker::new(LlmBackend::OpenAI(client), "gpt-4o-mini");
    let reply = taker.take_turn(&request()).await.unwrap();
    assert_eq!(reply, TurnReply::continuation("Which frameworks?"));
}

#[tokio::test]
async fn claude_request_opens_with_user_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "claude-key"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "I'm ready for the evaluation."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"text": "{\"content\": \"Solid.\", \"rating\": 8}"}]
        })))
        .mount(&server)
        .await;

    let client = ClaudeClient::new("claude-key").with_base_url(&server.uri());
    let reply = client.evaluate("claude-3-5-haiku-20241022", &request()).await.unwrap();
    assert_eq!(reply, TurnReply::rated("Solid.", 8.0));
}

#[tokio::test]
async fn ollama_asks_for_json_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"format": "json", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "{\"content\": \"Nice\", \"rating\": 6}",
            "done": true
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&server.uri());
    let reply = client.evaluate("llama3.2:latest", &request()).await.unwrap();
    assert_eq!(reply, TurnReply::rated("Nice", 6.0));
}

#[tokio::test]
async fn ollama_lists_pulled_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2:latest", "size": 1}, {"name": "qwen2.5:7b"}]
        })))
        .mount(&server)
        .await;

    let models = OllamaClient::new(&server.uri()).list_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest", "qwen2.5:7b"]);
}

#[tokio::test]
async fn ollama_error_status_names_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = OllamaClient::new(&server.uri())
        .evaluate("missing:latest", &request())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing:latest"));
}

fn record() -> InterviewRecord {
    let draft = InterviewDraft {
        subject: "Backend hire".to_string(),
        date: "2024-05-14".to_string(),
        candidate_name: "Sam Lee".to_string(),
        required_expertise: "Go".to_string(),
    };
    let mut eval = Evaluation::new();
    eval.start(draft.skills()).unwrap();
    eval.record_manual_rating(0, 8.0).unwrap();
    InterviewRecord::new(draft, eval.finalize())
}

#[tokio::test]
async fn create_interview_sends_bearer_token_and_ratings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/interviews"))
        .and(header("authorization", "Bearer tok"))
        .and(body_partial_json(json!({
            "candidateName": "Sam Lee",
            "overallRating": 8,
            "expertiseRatings": [{"skill": "Go", "rating": 8.0}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "abc123"})))
        .mount(&server)
        .await;

    let api = PanelApi::new(&server.uri()).with_token(Some("tok".to_string()));
    assert_eq!(api.create_interview(&record()).await.unwrap(), "abc123");
}

#[tokio::test]
async fn create_interview_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/interviews"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Date is in the past"})))
        .mount(&server)
        .await;

    let api = PanelApi::new(&server.uri());
    let err = api.create_interview(&record()).await.unwrap_err();
    assert!(err.to_string().contains("Date is in the past"));
}

#[tokio::test]
async fn create_interview_without_id_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/interviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let api = PanelApi::new(&server.uri());
    let err = api.create_interview(&record()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to create interview"));
}

#[tokio::test]
async fn experts_and_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/experts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "John Doe", "expertise": "Web Development", "experience": 5},
            {"_id": "x2", "name": "Jane Smith", "expertise": "Data Science", "experience": 7}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({"username": "admin"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-token"})))
        .mount(&server)
        .await;

    let api = PanelApi::new(&server.uri());
    let experts = api.list_experts().await.unwrap();
    assert_eq!(experts.len(), 2);
    assert_eq!(experts[0].id, json!(1));
    assert_eq!(experts[1].id, json!("x2"));
    assert_eq!(experts[1].experience, 7);

    assert_eq!(api.login("admin", "hunter2").await.unwrap(), "jwt-token");
}

#[tokio::test]
async fn interviews_are_listed_filtered_and_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interviews"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "i1", "subject": "Backend hire", "date": "2024-05-14",
             "candidateName": "Sam Lee", "requiredExpertise": "Go",
             "status": "scheduled", "expertAssigned": false},
            {"_id": "i2", "subject": "Data platform", "date": "2024-05-20",
             "candidateName": "Ana Ruiz", "requiredExpertise": "Spark",
             "status": "completed", "expertAssigned": "exp-7"},
            {"_id": "i3", "subject": "SRE", "date": "2024-06-01",
             "candidateName": "Kim Backer", "requiredExpertise": "K8s",
             "status": "completed"}
        ])))
        .mount(&server)
        .await;

    let api = PanelApi::new(&server.uri()).with_token(Some("tok".to_string()));
    let interviews = api.list_interviews().await.unwrap();
    assert_eq!(interviews.len(), 3);
    assert_eq!(interviews[1].id, json!("i2"));

    assert_eq!(
        InterviewStats::from_interviews(&interviews),
        InterviewStats { total: 3, pending_assignments: 2, completed: 2 }
    );

    let found: Vec<&str> = filter_interviews(&interviews, "back")
        .iter()
        .map(|i| i.id.as_str().unwrap_or_default())
        .collect();
    assert_eq!(found, vec!["i1", "i3"]);
}

#[tokio::test]
async fn interview_listing_failure_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interviews"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .mount(&server)
        .await;

    let err = PanelApi::new(&server.uri()).list_interviews().await.unwrap_err();
    assert!(err.to_string().contains("Token expired"));
}

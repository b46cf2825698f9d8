use async_trait::async_trait;
use chrono::Duration;
use quiz_poll::error::{AppError, CorrelationError, PublishError, StateError};
use quiz_poll::services::{
    JsonRotationStore, PollPublisher, QuestionSelector, RotationStore, StaticQuestionSource,
};
use quiz_poll::models::parse_corpus;
use quiz_poll::{AppResult, Corpus, PostFlow, PostStatus, Question, ReplyOutcome};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 记录调用的发布器
#[derive(Clone, Default)]
struct RecordingPublisher {
    polls: Arc<Mutex<Vec<String>>>,
    replies: Arc<Mutex<Vec<(String, String)>>>,
    fail_poll: bool,
    fail_reply: bool,
}

#[async_trait]
impl PollPublisher for RecordingPublisher {
    async fn publish_poll(&self, question: &Question) -> AppResult<String> {
        if self.fail_poll {
            return Err(PublishError::BadResponse {
                endpoint: "/2/tweets".to_string(),
                status: 401,
                body: "Unauthorized".to_string(),
            }
            .into());
        }
        let mut polls = self.polls.lock().unwrap();
        polls.push(question.key());
        Ok(format!("p{}", polls.len()))
    }

    async fn publish_reply(
        &self,
        poll_id: &str,
        answer_letter: &str,
        answer_text: &str,
    ) -> AppResult<String> {
        if self.fail_reply {
            return Err(PublishError::BadResponse {
                endpoint: "/2/tweets".to_string(),
                status: 503,
                body: "Service Unavailable".to_string(),
            }
            .into());
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((poll_id.to_string(), format!("{}: {}", answer_letter, answer_text)));
        Ok(format!("r{}", replies.len()))
    }
}

fn question(category: &str, id: u32) -> Question {
    Question {
        id: id.to_string(),
        domain_objective: String::new(),
        category: category.to_string(),
        text: format!("{} question {}", category, id),
        choice_a: "Firewall".to_string(),
        choice_b: "IDS".to_string(),
        choice_c: "VPN".to_string(),
        choice_d: "Proxy".to_string(),
        answer_letter: "B".to_string(),
        answer_text: "IDS".to_string(),
        image: None,
        post_events: Vec::new(),
    }
}

fn corpus(layout: &[(&str, u32)]) -> Corpus {
    let mut categories = BTreeMap::new();
    for (name, count) in layout {
        categories.insert(
            name.to_string(),
            (1..=*count).map(|id| question(name, id)).collect(),
        );
    }
    Corpus::new(categories)
}

fn flow(corpus: Corpus, state_path: &Path, publisher: RecordingPublisher) -> PostFlow {
    PostFlow::new(
        Box::new(StaticQuestionSource::new(corpus)),
        Box::new(JsonRotationStore::new(state_path)),
        Box::new(publisher),
    )
    .with_selector(QuestionSelector::seeded(42))
    .with_reply_delay(Duration::minutes(120))
}

#[tokio::test]
async fn test_post_then_reply() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 3), ("B", 2)]), &state_path, publisher.clone());

    let posted = flow.post().await.unwrap();
    assert_eq!(posted.poll_id, "p1");
    assert_eq!(posted.interval, 0);
    assert!(!posted.rolled_over);

    // 投票发布后状态已经落盘
    let store = JsonRotationStore::new(&state_path);
    let state = store.load().await.unwrap();
    assert!(state.is_used(&posted.question_key));
    let pending = state.pending_reply.clone().unwrap();
    assert_eq!(pending.poll_id, "p1");
    assert_eq!(state.history(&posted.question_key).len(), 1);
    assert_eq!(state.history(&posted.question_key)[0].reply_id, None);

    // 还没到时间
    let early = flow
        .reply_at(posted.posted_at + Duration::minutes(30), false)
        .await
        .unwrap();
    assert!(matches!(early, ReplyOutcome::NotDue { ref poll_id, .. } if poll_id == "p1"));
    assert!(publisher.replies.lock().unwrap().is_empty());

    let replied = flow
        .reply_at(posted.posted_at + Duration::minutes(120), false)
        .await
        .unwrap();
    assert_eq!(
        replied,
        ReplyOutcome::Replied {
            question_key: posted.question_key.clone(),
            poll_id: "p1".to_string(),
            reply_id: "r1".to_string(),
        }
    );
    assert_eq!(
        publisher.replies.lock().unwrap()[0],
        ("p1".to_string(), "B: IDS".to_string())
    );

    let state = store.load().await.unwrap();
    assert!(state.pending_reply.is_none());
    assert_eq!(
        state.history(&posted.question_key)[0].reply_id.as_deref(),
        Some("r1")
    );

    // 再次回复没有可做的
    assert_eq!(flow.reply(false).await.unwrap(), ReplyOutcome::NothingPending);
}

#[tokio::test]
async fn test_post_refuses_while_reply_pending() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 3)]), &state_path, publisher.clone());

    flow.post().await.unwrap();
    let err = flow.post().await.unwrap_err();

    assert!(matches!(err, AppError::State(StateError::ReplyPending { .. })));
    assert_eq!(publisher.polls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_two_question_corpus_cycles() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 2)]), &state_path, publisher.clone())
        .with_cycle_threshold(Some(2));
    let store = JsonRotationStore::new(&state_path);

    let first = flow.post().await.unwrap();
    flow.reply(true).await.unwrap();
    assert_eq!(store.load().await.unwrap().used_count(), 1);

    let second = flow.post().await.unwrap();
    flow.reply(true).await.unwrap();
    assert_ne!(first.question_key, second.question_key);
    assert_eq!(second.interval, 0);
    assert!(second.rolled_over);

    let state = store.load().await.unwrap();
    assert_eq!(state.interval, 1);
    assert!(state.active_questions.is_empty());

    // 新一轮可以再次使用之前的题
    let third = flow.post().await.unwrap();
    assert_eq!(third.interval, 1);
    assert_eq!(third.poll_id, "p3");
    let state = store.load().await.unwrap();
    assert_eq!(state.used_count(), 1);
    assert_eq!(state.history(&third.question_key).len(), 2);
}

#[tokio::test]
async fn test_shared_objective_text_does_not_merge_categories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");

    let record = r#"{
        "domain_objective": "general security concepts",
        "question_id": 1,
        "question_text": "Which control detects intrusions?",
        "choice_a": "Firewall", "choice_b": "IDS", "choice_c": "VPN", "choice_d": "Proxy",
        "answer_letter": "B", "answer_text": "IDS"
    }"#;
    let fetched = parse_corpus(&format!("{{\"A\": [{0}], \"B\": [{0}]}}", record), "mem").unwrap();
    assert_eq!(fetched.total_questions(), 2);

    let publisher = RecordingPublisher::default();
    let mut flow = flow(fetched, &state_path, publisher.clone());

    let first = flow.post().await.unwrap();
    assert!(!first.rolled_over);
    flow.reply(true).await.unwrap();

    let second = flow.post().await.unwrap();
    assert_ne!(first.question_key, second.question_key);
    assert_eq!(second.interval, 0);
    assert!(second.rolled_over);

    let mut keys = publisher.polls.lock().unwrap().clone();
    keys.sort();
    assert_eq!(keys, vec!["A/1".to_string(), "B/1".to_string()]);
}

#[tokio::test]
async fn test_run_posts_waits_and_replies() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 2)]), &state_path, publisher.clone())
        .with_reply_delay(Duration::zero());

    let (posted, replied) = flow.run().await.unwrap();
    assert_eq!(
        replied,
        ReplyOutcome::Replied {
            question_key: posted.question_key.clone(),
            poll_id: posted.poll_id.clone(),
            reply_id: "r1".to_string(),
        }
    );

    let state = JsonRotationStore::new(&state_path).load().await.unwrap();
    assert!(state.pending_reply.is_none());
    assert_eq!(
        state.history(&posted.question_key)[0].reply_id.as_deref(),
        Some("r1")
    );
    assert_eq!(publisher.replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_cycle_in_saved_state_rolls_over_before_pick() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");

    // 上一次运行写入的状态已经达到阈值
    let store = JsonRotationStore::new(&state_path);
    let mut state = quiz_poll::RotationState::fresh();
    state.mark_used("A/1");
    store.save(&state).await.unwrap();

    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 1), ("B", 0)]), &state_path, publisher.clone())
        .with_cycle_threshold(Some(1));

    let posted = flow.post().await.unwrap();
    assert_eq!(posted.interval, 1);
    assert_eq!(posted.question_key, "A/1");
}

#[tokio::test]
async fn test_failed_poll_saves_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher {
        fail_poll: true,
        ..Default::default()
    };
    let mut flow = flow(corpus(&[("A", 3)]), &state_path, publisher.clone());

    let err = flow.post().await.unwrap_err();
    assert!(matches!(err, AppError::Publish(_)));
    assert!(!state_path.exists());
    assert!(publisher.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_reply_keeps_pending_poll() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");

    let mut flow_ok = flow(corpus(&[("A", 3)]), &state_path, RecordingPublisher::default());
    let posted = flow_ok.post().await.unwrap();

    let failing = flow(
        corpus(&[("A", 3)]),
        &state_path,
        RecordingPublisher {
            fail_reply: true,
            ..Default::default()
        },
    );
    let err = failing.reply(true).await.unwrap_err();
    assert!(matches!(err, AppError::Publish(_)));

    let state = JsonRotationStore::new(&state_path).load().await.unwrap();
    assert_eq!(state.pending_reply.as_ref().unwrap().poll_id, posted.poll_id);
    assert_eq!(state.history(&posted.question_key)[0].reply_id, None);
}

#[tokio::test]
async fn test_reply_without_recorded_poll_is_correlation_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let publisher = RecordingPublisher::default();

    let mut flow = flow(corpus(&[("A", 3)]), &state_path, publisher.clone());
    flow.post().await.unwrap();

    // 待回复指向一个没有记录的投票
    let store = JsonRotationStore::new(&state_path);
    let mut state = store.load().await.unwrap();
    if let Some(pending) = state.pending_reply.as_mut() {
        pending.poll_id = "p999".to_string();
    }
    store.save(&state).await.unwrap();

    let err = flow.reply(true).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Correlation(CorrelationError::UnknownPoll { ref poll_id, .. }) if poll_id == "p999"
    ));
    assert!(publisher.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_state_stops_post() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    std::fs::write(&state_path, "{\"interval\": ").unwrap();

    let publisher = RecordingPublisher::default();
    let mut flow = flow(corpus(&[("A", 3)]), &state_path, publisher.clone());

    let err = flow.post().await.unwrap_err();
    assert!(matches!(err, AppError::State(StateError::Corrupt { .. })));
    assert!(publisher.polls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_merged_history_marks_question_status() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_path = temp_dir.path().join("analytics_file.json");
    let mut flow = flow(corpus(&[("A", 1)]), &state_path, RecordingPublisher::default());

    let posted = flow.post().await.unwrap();
    let state = JsonRotationStore::new(&state_path).load().await.unwrap();

    let mut fetched = corpus(&[("A", 1)]);
    fetched.merge_history(&state.post_events);
    assert_eq!(
        fetched.find(&posted.question_key).unwrap().status(),
        PostStatus::PollPublished
    );
}

/// 需要真实凭证：cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_live_post_and_reply() {
    quiz_poll::logger::init();

    let config = quiz_poll::Config::load(None).expect("加载配置失败");
    quiz_poll::App::initialize(config)
        .run(quiz_poll::Command::Run)
        .await
        .expect("发布流程失败");
}

//! Chaos Tests
//!
//! Many sessions at once, bursts on a single session, failing components
//! and intent reloads while classification is running.

use super::{ready_orchestrator, test_config, INTENTS};
use crate::actors::orchestrator::{emergency_reply, ChatOrchestrator, APOLOGY_REPLY};
use crate::brain::intent::IntentIndex;
use crate::config::EngineConfig;
use futures::future::join_all;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn intents_with_grief() -> String {
    let mut file: serde_json::Value = serde_json::from_str(INTENTS).unwrap();
    file["intents"].as_array_mut().unwrap().push(serde_json::json!({
        "tag": "grief",
        "patterns": ["grief", "grieving", "lost my mother"],
        "priority": 3,
        "sentiment": "negative"
    }));
    file.to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_in_parallel() {
    let orchestrator = Arc::new(ready_orchestrator(test_config()));
    let messages = ["hello", "I feel anxious", "panic again today", "thanks", "bye"];

    let tasks = (0..20).map(|user| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let session = format!("user-{}", user);
            let mut replies = Vec::new();
            for message in messages {
                replies.push(orchestrator.get_response(message, &session).await);
            }
            replies
        })
    });

    for replies in join_all(tasks).await {
        let replies = replies.unwrap();
        assert_eq!(replies.len(), messages.len());
        assert!(replies.iter().all(|r| !r.is_empty() && r != APOLOGY_REPLY));
    }
    assert_eq!(orchestrator.active_sessions(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_on_one_session_is_linearised() {
    let orchestrator = Arc::new(ready_orchestrator(test_config()));

    let tasks = (0..12).map(|i| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.get_response(&format!("note {}", i), "shared").await })
    });
    for reply in join_all(tasks).await {
        assert_ne!(reply.unwrap(), APOLOGY_REPLY);
    }

    // Every update landed, and the window still holds exactly the last four
    let history = orchestrator.history("shared").await.unwrap();
    assert_eq!(history.len(), 4);
    let seen: HashSet<&str> = history.iter().map(|t| t.user.as_str()).collect();
    assert_eq!(seen.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crisis_never_lost_under_load() {
    let orchestrator = Arc::new(ready_orchestrator(test_config()));

    let tasks = (0..30).map(|i| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let text = if i % 3 == 0 { "I want to kill myself" } else { "hello there" };
            (i, orchestrator.get_response(text, &format!("s{}", i % 5)).await)
        })
    });

    for result in join_all(tasks).await {
        let (i, reply) = result.unwrap();
        if i % 3 == 0 {
            assert_eq!(reply, emergency_reply());
        } else {
            assert!(!reply.starts_with("[URGENT]"));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reload_during_classification_is_atomic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intents.json");
    let original = INTENTS.to_string();
    let extended = intents_with_grief();
    fs::write(&path, &original).unwrap();

    let index = Arc::new(IntentIndex::load(&path).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let index = Arc::clone(&index);
        let done = Arc::clone(&done);
        let path = path.clone();
        tokio::task::spawn_blocking(move || {
            for round in 0..40 {
                let content = match round % 3 {
                    0 => extended.as_str(),
                    1 => "{ this is not json",
                    _ => original.as_str(),
                };
                fs::write(&path, content).unwrap();
                let reloaded = index.reload();
                assert_eq!(reloaded, round % 3 != 1);
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            let done = Arc::clone(&done);
            tokio::task::spawn_blocking(move || {
                let mut checks = 0;
                while !done.load(Ordering::SeqCst) || checks < 100 {
                    // Either the old set (9) or the new one (10), never anything else
                    let intents = index.intents();
                    assert!(intents.len() == 9 || intents.len() == 10);
                    let has_grief = intents.iter().any(|i| i.tag == "grief");
                    assert_eq!(has_grief, intents.len() == 10);

                    let result = index.classify("I keep having a panic attack");
                    assert_eq!(result.tag(), Some("anxiety"));
                    assert!(index.classify("I want to die").confidence == 1.0);
                    checks += 1;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in join_all(readers).await {
        reader.unwrap();
    }
    // Last round (39 % 3 == 0) wrote the extended set
    assert_eq!(index.len(), 10);
}

#[tokio::test]
async fn test_reload_keeps_last_good_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intents.json");
    fs::write(&path, INTENTS).unwrap();

    let config = EngineConfig {
        intents_path: path.clone(),
        model_dir: dir.path().join("models"),
        ..test_config()
    };
    let orchestrator = ChatOrchestrator::new(config);
    orchestrator.initialize().await.unwrap();

    fs::write(&path, r#"{"intents": []}"#).unwrap();
    assert!(!orchestrator.reload_intents().await.unwrap());
    assert_eq!(
        orchestrator.classify_intent("hello").unwrap().tag(),
        Some("greeting")
    );

    fs::write(&path, intents_with_grief()).unwrap();
    assert!(orchestrator.reload_intents().await.unwrap());
    assert_eq!(
        orchestrator.classify_intent("still grieving").unwrap().tag(),
        Some("grief")
    );
}

#[tokio::test]
async fn test_session_dropped_mid_conversation() {
    let orchestrator = Arc::new(ready_orchestrator(test_config()));
    orchestrator.get_response("hello", "u").await;

    let pending = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.get_response("I feel anxious", "u").await })
    };
    orchestrator.end_session("u");

    let reply = pending.await.unwrap();
    assert_ne!(reply, APOLOGY_REPLY);
    // A fresh session starts after the old one was dropped
    orchestrator.get_response("hello again", "u").await;
    assert!(orchestrator.history("u").await.unwrap().len() <= 2);
}

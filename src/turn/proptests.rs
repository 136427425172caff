//! Property-based tests for the turn controller
//!
//! Random sequences of user actions are replayed against a scripted
//! conversation and checked against a simple model of the transcript.

use super::*;
use crate::llm::LlmError;
use crate::session::Role;
use crate::testing::MockConversation;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Send(String),
    SendFailing(String),
    Blank(String),
    Clear,
    DismissError,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[a-zA-Z0-9 ?!]{0,20}[a-z]".prop_map(Op::Send),
        2 => "[a-z]{1,10}".prop_map(Op::SendFailing),
        2 => "[ \t\n]{0,5}".prop_map(Op::Blank),
        1 => Just(Op::Clear),
        1 => Just(Op::DismissError),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_successful_turns_grow_by_two(texts in prop::collection::vec("[a-z]{1,16}", 0..10)) {
        runtime().block_on(async {
            let mock = Arc::new(MockConversation::new("mock"));
            let controller = Arc::new(TurnController::new(mock.clone(), Duration::from_secs(5)));

            for (i, text) in texts.iter().enumerate() {
                mock.queue_reply(format!("reply {i}"));
                let before = controller.snapshot().await.messages.len();
                controller.submit(text.clone()).await.unwrap();
                let after = controller.snapshot().await.messages.len();
                prop_assert_eq!(after, before + 2);
            }

            let snapshot = controller.snapshot().await;
            for (i, message) in snapshot.messages.iter().enumerate() {
                let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
                prop_assert_eq!(message.role(), expected);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_transcript_matches_model(ops in prop::collection::vec(arb_op(), 0..25)) {
        runtime().block_on(async {
            let mock = Arc::new(MockConversation::new("mock"));
            let controller = Arc::new(TurnController::new(mock.clone(), Duration::from_secs(5)));

            let mut expected: Vec<(Role, String)> = Vec::new();
            let mut expect_error = false;
            let mut calls = 0usize;
            let mut conversation = controller.snapshot().await.conversation_id;

            for op in ops {
                match op {
                    Op::Send(text) => {
                        let reply = format!("re: {text}");
                        mock.queue_reply(reply.clone());
                        controller.submit(text.clone()).await.unwrap();
                        expected.push((Role::User, text));
                        expected.push((Role::Assistant, reply));
                        expect_error = false;
                        calls += 1;
                    }
                    Op::SendFailing(text) => {
                        mock.queue_error(LlmError::server_error("unavailable"));
                        controller.submit(text).await.unwrap();
                        expect_error = true;
                        calls += 1;
                    }
                    Op::Blank(text) => {
                        prop_assert_eq!(controller.submit(text).await.unwrap(), None);
                    }
                    Op::Clear => {
                        let snapshot = controller.clear().await.unwrap();
                        prop_assert_ne!(snapshot.conversation_id, conversation);
                        conversation = snapshot.conversation_id;
                        expected.clear();
                        expect_error = false;
                    }
                    Op::DismissError => {
                        controller.dismiss_error().await.unwrap();
                        expect_error = false;
                    }
                }

                let snapshot = controller.snapshot().await;
                let actual: Vec<(Role, String)> = snapshot
                    .messages
                    .iter()
                    .map(|m| (m.role(), m.content().to_string()))
                    .collect();
                prop_assert_eq!(&actual, &expected);
                prop_assert_eq!(snapshot.last_error.is_some(), expect_error);
                prop_assert_eq!(snapshot.state, TurnState::Idle);
                prop_assert!(snapshot.pending.is_none());
                prop_assert_eq!(snapshot.turns * 2, expected.len());
                prop_assert_eq!(mock.recorded_turns().len(), calls);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_each_call_sees_all_prior_successes(ops in prop::collection::vec(arb_op(), 0..25)) {
        runtime().block_on(async {
            let mock = Arc::new(MockConversation::new("mock"));
            let controller = Arc::new(TurnController::new(mock.clone(), Duration::from_secs(5)));

            let mut successes = 0usize;
            for op in ops {
                match op {
                    Op::Send(text) => {
                        mock.queue_reply("ok");
                        controller.submit(text).await.unwrap();
                        let call = mock.recorded_turns().pop().unwrap();
                        prop_assert_eq!(call.prior_turns, successes);
                        successes += 1;
                    }
                    Op::SendFailing(text) => {
                        mock.queue_error(LlmError::network("down"));
                        controller.submit(text).await.unwrap();
                        let call = mock.recorded_turns().pop().unwrap();
                        prop_assert_eq!(call.prior_turns, successes);
                    }
                    Op::Clear => {
                        controller.clear().await.unwrap();
                        successes = 0;
                    }
                    Op::Blank(_) | Op::DismissError => {}
                }
            }
            Ok(())
        })?;
    }
}

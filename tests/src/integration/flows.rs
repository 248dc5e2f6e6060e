//! # Streaming Flows
//!
//! ```text
//! Controller ──Request(id)──→ Executor
//!     ↑                          │
//!     └── Continuing* ─ Final ───┘   (or Failed)
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: ordered steps, then the terminal value
//! 2. **Interleaving**: two ids sharing one channel
//! 3. **Failure**: emitted values followed by an executor error
//! 4. **Control**: cancel and fire-and-forget

#[cfg(test)]
mod tests {
    use crate::fixtures::{scripted, STEP_TIMEOUT};
    use futures::future::join_all;
    use node_runtime::{builtin_registry, NodeConfig, NodeRuntime};
    use rand::Rng;
    use serde_json::{json, Value};
    use shared_types::{
        ControlMessage, FailureInfo, FailureKind, ProcessingId, ReplyMode, ResponseEnvelope,
    };
    use std::time::Duration;
    use sw_controller::{Resulter, StreamError};
    use tokio::time::{sleep, timeout};

    async fn collect(resulter: &mut Resulter) -> Vec<(Value, bool)> {
        let mut seen = Vec::new();
        loop {
            let item = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
            seen.push((item.value, item.done));
            if item.done {
                return seen;
            }
        }
    }

    #[tokio::test]
    async fn test_count_up_streams_in_order() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        let mut resulter = runtime
            .controller()
            .open("count_up", vec![json!(4)], Vec::new())
            .await
            .unwrap();

        assert_eq!(
            collect(&mut resulter).await,
            vec![
                (json!(1), false),
                (json!(2), false),
                (json!(3), false),
                (json!(4), true),
            ]
        );
        assert_eq!(resulter.next().await, Err(StreamError::AlreadyFinished));
        assert_eq!(runtime.controller().open_requests(), 0);

        drop(resulter);
        timeout(STEP_TIMEOUT, runtime.shutdown()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_interleaved_ids_keep_their_own_order() {
        let (controller, _reader, mut peer) = scripted();
        let mut ten = controller
            .open_as(ProcessingId::new(10), "gen", Vec::new(), Vec::new())
            .await
            .unwrap();
        let mut eleven = controller
            .open_as(ProcessingId::new(11), "gen", Vec::new(), Vec::new())
            .await
            .unwrap();
        assert_eq!(peer.next_request().await.processing_id, ProcessingId::new(10));
        assert_eq!(peer.next_request().await.processing_id, ProcessingId::new(11));

        peer.continuing(10, json!("10a")).await;
        peer.continuing(11, json!("11a")).await;
        peer.continuing(11, json!("11b")).await;
        peer.continuing(10, json!("10b")).await;
        peer.complete(10, json!("10c")).await;
        peer.complete(11, json!("11c")).await;

        // Read the later id first; neither stream waits on the other.
        assert_eq!(
            collect(&mut eleven).await,
            vec![(json!("11a"), false), (json!("11b"), false), (json!("11c"), true)]
        );
        assert_eq!(
            collect(&mut ten).await,
            vec![(json!("10a"), false), (json!("10b"), false), (json!("10c"), true)]
        );
        assert_eq!(controller.open_requests(), 0);
    }

    #[tokio::test]
    async fn test_emit_then_error() {
        let (controller, _reader, mut peer) = scripted();
        let mut resulter = controller.open("work", Vec::new(), Vec::new()).await.unwrap();
        let id = peer.next_request().await.processing_id;

        peer.continuing(id.as_u64(), json!(1)).await;
        peer.respond(ResponseEnvelope::failed(
            id,
            &FailureInfo::new(FailureKind::Execution, "boom"),
        ))
        .await;

        let first = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
        assert_eq!(first.value, json!(1));
        assert!(!first.done);

        let err = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap_err();
        assert_eq!(err, StreamError::Failed(FailureInfo::new(FailureKind::Execution, "boom")));
        assert!(!controller.registry().contains(id));
        assert_eq!(resulter.next().await, Err(StreamError::AlreadyFinished));
    }

    #[tokio::test]
    async fn test_response_after_terminal_discarded() {
        let (controller, _reader, mut peer) = scripted();
        let mut first = controller.open("a", Vec::new(), Vec::new()).await.unwrap();
        let first_id = peer.next_request().await.processing_id;

        peer.complete(first_id.as_u64(), json!("done")).await;
        peer.continuing(first_id.as_u64(), json!("late")).await;

        // A second request completing proves the late response was read.
        let mut second = controller.open("b", Vec::new(), Vec::new()).await.unwrap();
        let second_id = peer.next_request().await.processing_id;
        peer.complete(second_id.as_u64(), json!("ok")).await;
        assert_eq!(collect(&mut second).await, vec![(json!("ok"), true)]);

        assert_eq!(collect(&mut first).await, vec![(json!("done"), true)]);
        assert_eq!(controller.stats().discarded, 1);
        assert_eq!(controller.stats().completed, 2);
    }

    #[tokio::test]
    async fn test_unknown_command_fails_request() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        let mut resulter = runtime
            .controller()
            .open("no_such_command", Vec::new(), Vec::new())
            .await
            .unwrap();

        let err = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap_err();
        assert_eq!(err.failure().map(|f| f.kind), Some(FailureKind::UnknownCommand));
    }

    #[tokio::test]
    async fn test_cancel_stops_running_command() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        let mut resulter = runtime
            .controller()
            .open("sleep_steps", vec![json!(1000), json!(5)], Vec::new())
            .await
            .unwrap();

        let first = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
        assert_eq!(first.value, json!(1));
        resulter.cancel().await.unwrap();

        let err = timeout(STEP_TIMEOUT, resulter.drain()).await.unwrap().unwrap_err();
        assert_eq!(err.failure().map(|f| f.kind), Some(FailureKind::Cancelled));
        assert_eq!(runtime.dispatcher_metrics().cancelled, 1);

        drop(resulter);
        let report = timeout(STEP_TIMEOUT, runtime.shutdown()).await.unwrap().unwrap();
        assert_eq!(report.registry.failed, 1);
    }

    #[tokio::test]
    async fn test_fire_and_forget_sends_discard_request() {
        let (controller, _reader, mut peer) = scripted();
        let id = controller.fire("count_up", vec![json!(3)], Vec::new()).await.unwrap();

        match peer.next_control().await {
            ControlMessage::Request(request) => {
                assert_eq!(request.processing_id, id);
                assert_eq!(request.reply, ReplyMode::Discard);
            }
            other => panic!("unexpected control message {other:?}"),
        }
        assert_eq!(controller.open_requests(), 0);
    }

    #[tokio::test]
    async fn test_fire_and_forget_runs_to_completion() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        runtime
            .controller()
            .fire("count_up", vec![json!(3)], Vec::new())
            .await
            .unwrap();

        timeout(STEP_TIMEOUT, async {
            while runtime.dispatcher_metrics().completed < 1 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let report = timeout(STEP_TIMEOUT, runtime.shutdown()).await.unwrap().unwrap();
        assert_eq!(report.dispatcher.steps, 2);
        assert_eq!(report.registry.delivered, 0);
        assert_eq!(report.registry.discarded, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_streams() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        let mut rng = rand::thread_rng();
        let counts: Vec<u64> = (0..32).map(|_| rng.gen_range(1..=20)).collect();

        let mut resulters = Vec::new();
        for &n in &counts {
            resulters.push(
                runtime
                    .controller()
                    .open("count_up", vec![json!(n)], Vec::new())
                    .await
                    .unwrap(),
            );
        }

        let streams = join_all(resulters.iter_mut().map(collect)).await;
        for (n, seen) in counts.iter().zip(streams) {
            let expected: Vec<(Value, bool)> = (1..=*n).map(|i| (json!(i), i == *n)).collect();
            assert_eq!(seen, expected);
        }

        drop(resulters);
        let report = timeout(STEP_TIMEOUT, runtime.shutdown()).await.unwrap().unwrap();
        assert_eq!(report.dispatcher.completed, counts.len() as u64);
        assert_eq!(report.registry.open, 0);
    }
}

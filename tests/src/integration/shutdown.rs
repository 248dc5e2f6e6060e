//! # Shutdown
//!
//! When the channel ends, or the controller is told to stop, every request
//! still waiting for a result is rejected with the shutdown reason. Results
//! that already arrived stay readable.

#[cfg(test)]
mod tests {
    use crate::fixtures::{scripted, STEP_TIMEOUT};
    use serde_json::json;
    use sw_controller::{ControllerError, StreamError, DEFAULT_SHUTDOWN_REASON};
    use tokio::time::timeout;

    fn closed(reason: &str) -> StreamError {
        StreamError::TransportClosed {
            reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn test_forced_shutdown_rejects_open_requests() {
        let (controller, _reader, mut peer) = scripted();
        let mut first = controller.open("a", Vec::new(), Vec::new()).await.unwrap();
        let mut second = controller.open("b", Vec::new(), Vec::new()).await.unwrap();
        let first_id = peer.next_request().await.processing_id;
        peer.next_request().await;

        peer.continuing(first_id.as_u64(), json!("partial")).await;
        let partial = timeout(STEP_TIMEOUT, first.next()).await.unwrap().unwrap();
        assert_eq!(partial.value, json!("partial"));

        assert_eq!(controller.reject_all_pending("transport closed"), 2);
        assert_eq!(controller.open_requests(), 0);

        assert_eq!(first.next().await, Err(closed("transport closed")));
        assert_eq!(second.next().await, Err(closed("transport closed")));
        assert_eq!(first.next().await, Err(StreamError::AlreadyFinished));

        assert_eq!(controller.reject_all_pending("again"), 0);
        assert!(matches!(
            controller.open("c", Vec::new(), Vec::new()).await,
            Err(ControllerError::Closed(_))
        ));
        assert!(matches!(
            controller.fire("c", Vec::new(), Vec::new()).await,
            Err(ControllerError::Closed(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_end_rejects_pending() {
        let (controller, reader, mut peer) = scripted();
        let mut resulter = controller.open("a", Vec::new(), Vec::new()).await.unwrap();
        peer.next_request().await;

        let _control = peer.close_responses();
        timeout(STEP_TIMEOUT, reader).await.unwrap().unwrap();

        assert_eq!(resulter.next().await, Err(closed(DEFAULT_SHUTDOWN_REASON)));
        assert!(controller.registry().is_closed());
        assert_eq!(controller.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_delivered_terminal_survives_shutdown() {
        let (controller, reader, mut peer) = scripted();
        let mut done = controller.open("a", Vec::new(), Vec::new()).await.unwrap();
        let mut waiting = controller.open("b", Vec::new(), Vec::new()).await.unwrap();
        let done_id = peer.next_request().await.processing_id;
        peer.next_request().await;

        peer.continuing(done_id.as_u64(), json!(1)).await;
        peer.complete(done_id.as_u64(), json!(2)).await;
        let _control = peer.close_responses();
        timeout(STEP_TIMEOUT, reader).await.unwrap().unwrap();

        let first = done.next().await.unwrap();
        assert_eq!((first.value, first.done), (json!(1), false));
        let last = done.next().await.unwrap();
        assert_eq!((last.value, last.done), (json!(2), true));

        assert_eq!(waiting.next().await, Err(closed(DEFAULT_SHUTDOWN_REASON)));
        assert_eq!(controller.stats().rejected, 1);
    }
}

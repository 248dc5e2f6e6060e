//! # Buffer Transfer
//!
//! Buffers attached to a request or response change owner; the sender's
//! handle is left empty. In-memory channels move the allocation itself,
//! framed channels copy the bytes into the frame.

#[cfg(test)]
mod tests {
    use crate::fixtures::{scripted, STEP_TIMEOUT};
    use node_runtime::{builtin_registry, NodeConfig, NodeRuntime};
    use serde_json::json;
    use shared_bus::{framed_duplex, ChannelConfig};
    use shared_types::TransferBuffer;
    use sw_controller::{Controller, ControllerConfig};
    use sw_executor::{Dispatcher, ExecutorConfig};
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_request_buffer_moved_without_copy() {
        let (controller, _reader, mut peer) = scripted();
        let mut handles = [TransferBuffer::new(vec![1, 2, 3, 4])];
        let address = handles[0].as_slice().as_ptr();

        let _resulter = controller
            .open_with("consume", Vec::new(), &mut handles)
            .await
            .unwrap();
        assert!(handles[0].is_detached());

        let request = peer.next_request().await;
        assert_eq!(request.buffers.len(), 1);
        assert_eq!(request.buffers[0].as_slice(), &[1, 2, 3, 4]);
        assert_eq!(request.buffers[0].as_slice().as_ptr(), address);
    }

    #[tokio::test]
    async fn test_response_buffer_reaches_consumer() {
        let (controller, _reader, mut peer) = scripted();
        let mut resulter = controller.open("produce", Vec::new(), Vec::new()).await.unwrap();
        let id = peer.next_request().await.processing_id;

        let buffer = TransferBuffer::new(vec![7; 64]);
        let address = buffer.as_slice().as_ptr();
        peer.complete_with(id.as_u64(), json!({"len": 64}), vec![buffer]).await;

        let item = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
        assert!(item.done);
        assert_eq!(item.buffers.len(), 1);
        assert_eq!(item.buffers[0].as_slice().as_ptr(), address);
    }

    #[tokio::test]
    async fn test_echo_hands_buffers_back() {
        let runtime = NodeRuntime::start(&NodeConfig::default(), builtin_registry()).unwrap();
        let mut handles = [
            TransferBuffer::new(b"first".to_vec()),
            TransferBuffer::new(b"second".to_vec()),
        ];

        let mut resulter = runtime
            .controller()
            .open_with("echo", vec![json!("tag")], &mut handles)
            .await
            .unwrap();
        assert!(handles.iter().all(TransferBuffer::is_detached));

        let item = timeout(STEP_TIMEOUT, resulter.drain()).await.unwrap().unwrap();
        assert_eq!(item.value, json!(["tag"]));
        let returned: Vec<Vec<u8>> = item.buffers.into_iter().map(TransferBuffer::into_vec).collect();
        assert_eq!(returned, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[tokio::test]
    async fn test_digest_over_framed_channel() {
        let (controller_end, executor_end, injectors) = framed_duplex(&ChannelConfig::default());
        drop(injectors);

        let (response_tx, control_rx) = executor_end.split();
        let dispatcher =
            Dispatcher::new(builtin_registry(), response_tx, ExecutorConfig::default()).unwrap();
        let dispatcher = dispatcher.spawn(control_rx);

        let (control_tx, response_rx) = controller_end.split();
        let (controller, reader) =
            Controller::start(control_tx, response_rx, ControllerConfig::default()).unwrap();

        let mut handles = [TransferBuffer::new(b"abc".to_vec())];
        let mut resulter = controller
            .open_with("digest", Vec::new(), &mut handles)
            .await
            .unwrap();

        let step = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
        assert!(!step.done);
        assert_eq!(step.value["len"], json!(3));

        let last = timeout(STEP_TIMEOUT, resulter.next()).await.unwrap().unwrap();
        assert!(last.done);
        assert_eq!(
            last.value["sha256"],
            json!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(last.buffers[0].as_slice(), b"abc");

        drop(resulter);
        drop(controller);
        timeout(STEP_TIMEOUT, dispatcher).await.unwrap().unwrap();
        timeout(STEP_TIMEOUT, reader).await.unwrap().unwrap();
    }
}

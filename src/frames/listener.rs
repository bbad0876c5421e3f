//! Landmark frame listener
//!
//! Reads JSON-lines frames from a blocking reader (stdin or a capture file)
//! on a dedicated thread and forwards them to the controller loop.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::Frame;

/// Events sent from the frame listener to the controller loop
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// A parsed frame
    Frame(Frame),
    /// The input reached end of file
    EndOfInput,
}

/// Errors that can occur starting the frame listener
#[derive(Debug, thiserror::Error)]
pub enum FrameSourceError {
    #[error("frame listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Reads frames on its own thread
pub struct FrameListener {
    event_tx: mpsc::Sender<FrameEvent>,
    running: Arc<AtomicBool>,
}

impl FrameListener {
    pub fn new(event_tx: mpsc::Sender<FrameEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading `input` on a new thread
    ///
    /// The thread stops at end of input, when the receiving side is dropped,
    /// or before the next line once `stop()` has been called.
    pub fn start(&self, input: Box<dyn BufRead + Send>) -> Result<(), FrameSourceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(FrameSourceError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("frame-listener".to_string())
            .spawn(move || {
                info!("frame listener thread started");
                read_frames(input, &event_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!("frame listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                FrameSourceError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn read_frames(input: Box<dyn BufRead + Send>, event_tx: &mpsc::Sender<FrameEvent>, running: &AtomicBool) {
    for (index, line) in input.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(?e, "failed to read frame input");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let frame: Frame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping malformed frame");
                continue;
            }
        };

        if event_tx.blocking_send(FrameEvent::Frame(frame)).is_err() {
            debug!("frame channel closed");
            return;
        }
    }

    let _ = event_tx.blocking_send(FrameEvent::EndOfInput);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input(text: &str) -> Box<dyn BufRead + Send> {
        Box::new(Cursor::new(text.to_string().into_bytes()))
    }

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(8);
        let listener = FrameListener::new(tx);
        assert!(!listener.is_running());
    }

    #[test]
    fn test_forwards_frames_and_skips_garbage() {
        let (tx, mut rx) = mpsc::channel(8);
        let listener = FrameListener::new(tx);

        let text = concat!(
            "{\"landmarks\": null}\n",
            "not json\n",
            "\n",
            "{\"landmarks\": [{\"x\": 0.1, \"y\": 0.2}]}\n",
        );
        listener.start(input(text)).unwrap();

        let first = tokio_test::block_on(rx.recv()).unwrap();
        assert!(matches!(first, FrameEvent::Frame(ref f) if f.landmarks.is_none()));

        let second = tokio_test::block_on(rx.recv()).unwrap();
        match second {
            FrameEvent::Frame(frame) => {
                let lm = frame.landmarks.unwrap();
                assert_eq!(lm.len(), 1);
                assert_eq!(lm[0].y, 0.2);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let last = tokio_test::block_on(rx.recv()).unwrap();
        assert!(matches!(last, FrameEvent::EndOfInput));
    }

    #[test]
    fn test_double_start_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let listener = FrameListener::new(tx);
        listener.running.store(true, Ordering::SeqCst);

        let err = listener.start(input("")).unwrap_err();
        assert!(matches!(err, FrameSourceError::AlreadyRunning));
    }

    #[test]
    fn test_stop_ends_reader_between_lines() {
        let (tx, mut rx) = mpsc::channel(1);
        let listener = FrameListener::new(tx);

        let text = "{\"landmarks\": null}\n".repeat(10);
        listener.start(input(&text)).unwrap();

        let first = tokio_test::block_on(rx.recv()).unwrap();
        assert!(matches!(first, FrameEvent::Frame(_)));
        listener.stop();
        drop(listener);

        // At most the buffered frame and one send in flight follow
        let mut rest = Vec::new();
        while let Some(event) = tokio_test::block_on(rx.recv()) {
            rest.push(event);
        }
        assert!(rest.len() <= 2);
        assert!(rest.iter().all(|e| matches!(e, FrameEvent::Frame(_))));
    }
}

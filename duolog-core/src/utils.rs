use std::{
    ops::Deref,
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};

use crate::{
    config::DUOLOG_CONFIG,
    log_writer::{LogFile, LogStdout, LogWriter},
};

#[derive(Debug, Clone)]
pub enum LogMessage {
    /// A fully formatted line.
    Line(String),
    Shutdown,
}

/// Sending half of a writer thread. Dropping it shuts the thread down.
pub struct LogSender {
    sender: Sender<Arc<LogMessage>>,
    handler: Arc<Mutex<Option<JoinHandle<bool>>>>,
}

impl Deref for LogSender {
    type Target = Sender<Arc<LogMessage>>;
    fn deref(&self) -> &Self::Target {
        &self.sender
    }
}

impl Drop for LogSender {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl LogSender {
    pub fn new(sender: Sender<Arc<LogMessage>>, handler: JoinHandle<bool>) -> Self {
        Self {
            sender,
            handler: Arc::new(Mutex::new(Some(handler))),
        }
    }

    /// Stops the writer thread once it has written everything queued before the call.
    /// Returns `false` when the thread had stopped on a write error. Calling it twice is a no-op.
    pub fn shutdown(&self) -> bool {
        let mut guard = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handle) = guard.take() else {
            return true;
        };
        // The channel is closed already if the thread stopped on its own
        let _ = self.send(Arc::new(LogMessage::Shutdown));
        handle.join().unwrap_or(false)
    }
}

pub fn spawn_log_thread_stdout(mut writer: LogStdout) -> LogSender {
    let (sender, receiver) = unbounded::<Arc<LogMessage>>();
    let handler = std::thread::spawn(move || {
        // No batching for stdout - process messages immediately
        while let Ok(log_message) = receiver.recv() {
            match log_message.as_ref() {
                LogMessage::Line(line) => {
                    if writer.regular(line).is_err() {
                        return false;
                    }
                }
                LogMessage::Shutdown => break,
            }
        }
        writer.flush().is_ok()
    });
    LogSender::new(sender, handler)
}

pub fn spawn_log_thread_file(mut writer: LogFile) -> LogSender {
    let (sender, receiver) = unbounded::<Arc<LogMessage>>();
    let handler = std::thread::spawn(move || {
        let mut batch = Vec::with_capacity(32);
        let flush_interval = Duration::from_millis(DUOLOG_CONFIG.FLUSH_INTERVAL_MS);
        let mut last_flush = Instant::now();
        loop {
            let elapsed = last_flush.elapsed();
            let timeout = if elapsed >= flush_interval {
                Duration::from_millis(1)
            } else {
                flush_interval - elapsed
            };

            match receiver.recv_timeout(timeout) {
                Ok(msg) => {
                    batch.push(msg);
                    while let Ok(msg) = receiver.try_recv() {
                        batch.push(msg);
                        if batch.len() >= 32 {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_flush.elapsed() >= flush_interval {
                        if writer.flush().is_err() {
                            return false;
                        }
                        last_flush = Instant::now();
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let mut should_shutdown = false;
            for log_message in batch.drain(..) {
                match log_message.as_ref() {
                    LogMessage::Line(line) => {
                        if writer.regular(line).is_err() {
                            return false;
                        }
                    }
                    LogMessage::Shutdown => {
                        should_shutdown = true;
                        break;
                    }
                }
            }

            if should_shutdown || last_flush.elapsed() >= flush_interval {
                if writer.flush().is_err() {
                    return false;
                }
                last_flush = Instant::now();
            }

            if should_shutdown {
                break;
            }
        }
        writer.flush().is_ok()
    });
    LogSender::new(sender, handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_thread_flushes_on_shutdown() {
        let path = std::env::temp_dir().join("duolog_test_file_thread.log");
        std::fs::remove_file(&path).ok();
        let sender = spawn_log_thread_file(LogFile::new(&path).unwrap());
        for i in 0..40 {
            sender
                .send(Arc::new(LogMessage::Line(format!("line {i}"))))
                .unwrap();
        }
        assert!(sender.shutdown());
        assert!(sender.shutdown());
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 40);
        assert!(content.ends_with("line 39\n"));
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let sender = spawn_log_thread_stdout(LogStdout);
        sender.shutdown();
        assert!(sender.send(Arc::new(LogMessage::Line("late".into()))).is_err());
    }
}

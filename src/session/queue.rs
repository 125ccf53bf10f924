//! Serial execution queue.
//!
//! A single worker thread owns the target value and runs submitted jobs
//! against it one at a time, in submission order.

use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::errors::CaptureError;

type Job<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

enum Message<T> {
    Run(Job<T>),
    Shutdown,
}

/// Submission side of the queue; cheap to clone.
pub(crate) struct SerialQueue<T> {
    tx: Sender<Message<T>>,
}

impl<T> Clone for SerialQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Worker side of the queue, consumed by [`QueueWorker::spawn`].
pub(crate) struct QueueWorker<T> {
    rx: Receiver<Message<T>>,
}

pub(crate) fn serial_queue<T>() -> (SerialQueue<T>, QueueWorker<T>) {
    let (tx, rx) = unbounded();
    (SerialQueue { tx }, QueueWorker { rx })
}

impl<T: 'static> SerialQueue<T> {
    pub fn submit<F>(&self, job: F) -> Result<(), CaptureError>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.tx
            .send(Message::Run(Box::new(job)))
            .map_err(|_| CaptureError::SessionClosed)
    }

    /// Stop the worker after every job submitted so far has run.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

impl<T: Send + 'static> QueueWorker<T> {
    pub fn spawn(self, name: &str, mut target: T) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for message in self.rx.iter() {
                    match message {
                        Message::Run(job) => job(&mut target),
                        Message::Shutdown => break,
                    }
                }
                log::debug!("Serial queue worker exiting");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_jobs_run_in_submission_order() {
        let (queue, worker) = serial_queue::<Vec<u32>>();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        for i in 0..100 {
            queue.submit(move |v: &mut Vec<u32>| v.push(i)).unwrap();
        }
        queue
            .submit(move |v: &mut Vec<u32>| done_tx.send(v.clone()).unwrap())
            .unwrap();

        let handle = worker.spawn("test-queue", Vec::new()).unwrap();
        let seen = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());

        queue.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_submit_after_worker_exit_fails() {
        let (queue, worker) = serial_queue::<u32>();
        let handle = worker.spawn("test-queue", 0).unwrap();
        queue.shutdown();
        handle.join().unwrap();
        assert!(matches!(
            queue.submit(|n: &mut u32| *n += 1),
            Err(CaptureError::SessionClosed)
        ));
    }
}

use crossbeam::channel::{Receiver, Sender, TryRecvError};

use super::conversation::Conversation;
use super::memory::EntityMemory;
use super::vision::{self, ImageSource, LoadedImage};
use super::ChatModel;
use crate::error::Result;

pub enum Job {
    Reply {
        conversation: Conversation,
        memory: EntityMemory,
        utterance: String,
    },
    LoadImage(ImageSource),
    Caption {
        model: Box<dyn ChatModel>,
        image: LoadedImage,
        prompt: String,
        temperature: f32,
    },
}

pub enum Outcome {
    Reply {
        utterance: String,
        memory: EntityMemory,
        result: Result<String>,
    },
    Image(Result<LoadedImage>),
    Caption(Result<String>),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Reply { utterance, .. } => write!(f, "Reply({utterance:?})"),
            Outcome::Image(r) => write!(f, "Image(ok={})", r.is_ok()),
            Outcome::Caption(r) => write!(f, "Caption(ok={})", r.is_ok()),
        }
    }
}

fn run(job: Job) -> Outcome {
    match job {
        Job::Reply {
            conversation,
            mut memory,
            utterance,
        } => {
            let result = conversation.reply(&mut memory, &utterance);
            Outcome::Reply {
                utterance,
                memory,
                result,
            }
        }
        Job::LoadImage(source) => Outcome::Image(vision::load(source)),
        Job::Caption {
            model,
            image,
            prompt,
            temperature,
        } => Outcome::Caption(vision::caption(model.as_ref(), &image, &prompt, temperature)),
    }
}

/// Runs model requests off the UI thread, one at a time.
pub struct Worker {
    tx: Sender<Job>,
    rx: Receiver<Outcome>,
    pending: bool,
}

impl Worker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = crossbeam::channel::unbounded::<Job>();
        let (outcome_tx, outcome_rx) = crossbeam::channel::unbounded();

        std::thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                if outcome_tx.send(run(job)).is_err() {
                    break;
                }
            }
            log::debug!("worker thread stopped");
        });

        Self {
            tx: job_tx,
            rx: outcome_rx,
            pending: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Hands `job` to the worker. Refused while an earlier job is running.
    pub fn submit(&mut self, job: Job) -> bool {
        if self.pending {
            return false;
        }
        if self.tx.send(job).is_err() {
            log::error!("worker thread is gone");
            return false;
        }
        self.pending = true;
        true
    }

    pub fn try_recv(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => {
                self.pending = false;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = false;
                None
            }
        }
    }

    #[cfg(test)]
    pub fn recv_timeout(&mut self, timeout: std::time::Duration) -> Option<Outcome> {
        use crossbeam::channel::RecvTimeoutError;

        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.pending = false;
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.pending = false;
                None
            }
        }
    }
}

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::types::LessonId;

/// Delivered when a lesson has played for the full threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub lesson: LessonId,
    generation: u64,
}

struct Armed {
    lesson: LessonId,
    generation: u64,
    handle: JoinHandle<()>,
}

/// Cancellable countdown tied to one lesson.
///
/// Each arming gets a new generation number. A fire only counts if its
/// generation is still the armed one, so a countdown that finished just as
/// it was cancelled can never complete the wrong lesson.
pub struct CompletionTimer {
    threshold: Duration,
    generation: u64,
    armed: Option<Armed>,
    tx: mpsc::UnboundedSender<TimerFired>,
    rx: mpsc::UnboundedReceiver<TimerFired>,
}

impl CompletionTimer {
    pub fn new(threshold: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            threshold,
            generation: 0,
            armed: None,
            tx,
            rx,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn armed_lesson(&self) -> Option<&LessonId> {
        self.armed.as_ref().map(|a| &a.lesson)
    }

    /// Start counting for `lesson`. Already counting for the same lesson is
    /// left alone; counting for another lesson is replaced.
    pub fn arm(&mut self, lesson: LessonId) {
        if self.armed_lesson() == Some(&lesson) {
            return;
        }
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let deadline = Instant::now() + self.threshold;
        let tx = self.tx.clone();
        let fired = TimerFired {
            lesson: lesson.clone(),
            generation,
        };

        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(fired);
        });

        tracing::debug!(%lesson, generation, "completion timer armed");
        self.armed = Some(Armed {
            lesson,
            generation,
            handle,
        });
    }

    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
            tracing::debug!(lesson = %armed.lesson, generation = armed.generation, "completion timer cancelled");
        }
    }

    /// Consume a fire: true if it belongs to the current arming
    pub fn accept(&mut self, fired: &TimerFired) -> bool {
        let current = self
            .armed
            .as_ref()
            .is_some_and(|a| a.generation == fired.generation && a.lesson == fired.lesson);
        if current {
            self.armed = None;
        }
        current
    }

    /// Wait for the next fire. Cancel-safe; pending forever while nothing
    /// is armed.
    pub async fn fired(&mut self) -> TimerFired {
        match self.rx.recv().await {
            Some(fired) => fired,
            // unreachable while `self.tx` is alive
            None => std::future::pending().await,
        }
    }
}

impl Drop for CompletionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
impl TimerFired {
    pub(crate) fn forged(lesson: &str, generation: u64) -> Self {
        Self {
            lesson: LessonId::from(lesson),
            generation,
        }
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Start { total: usize },
    Advance { done: usize, fraction: f32 },
    Finish { cancelled: bool },
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

pub fn report(sink: Option<&ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        (sink)(event);
    }
}

/// Shared flag a long-running job polls between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

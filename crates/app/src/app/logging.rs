use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const CONSOLE_CAPACITY: usize = 500;

/// Index in this table is the value kept in [`SharedLevel`].
const LEVELS: [LevelFilter; 6] = [
    LevelFilter::OFF,
    LevelFilter::ERROR,
    LevelFilter::WARN,
    LevelFilter::INFO,
    LevelFilter::DEBUG,
    LevelFilter::TRACE,
];

/// Targets that log below WARN; everything else (wgpu, winit, ...) is
/// held at WARN.
const VERBOSE_TARGETS: [&str; 2] = ["deltaview", "render"];

#[derive(Default)]
struct ConsoleLines {
    lines: VecDeque<String>,
    dropped: usize,
}

/// Ring buffer behind the in-app console. Cloning shares the buffer, and
/// each clone is also the writer the fmt layer formats into.
#[derive(Clone, Default)]
pub(crate) struct ConsoleBuffer {
    inner: Arc<Mutex<ConsoleLines>>,
}

impl ConsoleBuffer {
    fn push_text(&self, text: &str) {
        let mut console = self.inner.lock().expect("console buffer lock");
        for line in text.lines().filter(|line| !line.is_empty()) {
            console.lines.push_back(line.to_string());
        }
        let excess = console.lines.len().saturating_sub(CONSOLE_CAPACITY);
        console.lines.drain(..excess);
        console.dropped += excess;
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        let console = self.inner.lock().expect("console buffer lock");
        console.lines.iter().cloned().collect()
    }

    /// Lines pushed out of the buffer since the last clear.
    pub(crate) fn dropped(&self) -> usize {
        self.inner.lock().expect("console buffer lock").dropped
    }

    pub(crate) fn clear(&self) {
        *self.inner.lock().expect("console buffer lock") = ConsoleLines::default();
    }
}

impl io::Write for ConsoleBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_text(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Log level the UI can change while the subscriber is installed.
#[derive(Clone)]
pub(crate) struct SharedLevel(Arc<AtomicU8>);

impl SharedLevel {
    fn new(level: LevelFilter) -> Self {
        let shared = Self(Arc::new(AtomicU8::new(0)));
        shared.set(level);
        shared
    }

    pub(crate) fn get(&self) -> LevelFilter {
        LEVELS
            .get(self.0.load(Ordering::Relaxed) as usize)
            .copied()
            .unwrap_or(LevelFilter::TRACE)
    }

    pub(crate) fn set(&self, level: LevelFilter) {
        let index = LEVELS.iter().position(|l| *l == level).unwrap_or(0);
        self.0.store(index as u8, Ordering::Relaxed);
    }

    fn allows(&self, metadata: &tracing::Metadata<'_>) -> bool {
        let level = self.get();
        if level == LevelFilter::OFF {
            return false;
        }
        let target = metadata.target();
        let verbose = VERBOSE_TARGETS.iter().any(|prefix| target.starts_with(prefix));
        let ceiling = if verbose { level } else { LevelFilter::WARN };
        *metadata.level() <= ceiling
    }
}

/// Installs the global subscriber: one fmt layer teeing into the console
/// buffer and stdout, gated by the shared level.
pub(crate) fn setup_tracing() -> (ConsoleBuffer, SharedLevel) {
    let console = ConsoleBuffer::default();
    let level = SharedLevel::new(LevelFilter::INFO);

    let gate = level.clone();
    let console_writer = {
        let console = console.clone();
        move || console.clone()
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(console_writer.and(io::stdout))
        .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
            gate.allows(metadata)
        }));

    tracing_subscriber::registry().with(fmt_layer).init();

    (console, level)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn console_keeps_the_newest_lines() {
        let console = ConsoleBuffer::default();
        for i in 0..(CONSOLE_CAPACITY + 20) {
            console.push_text(&format!("line {}\n", i));
        }
        let lines = console.snapshot();
        assert_eq!(lines.len(), CONSOLE_CAPACITY);
        assert_eq!(lines[0], "line 20");
        assert_eq!(console.dropped(), 20);

        console.clear();
        assert!(console.snapshot().is_empty());
        assert_eq!(console.dropped(), 0);
    }

    #[test]
    fn clones_write_into_the_same_buffer() {
        let console = ConsoleBuffer::default();
        let mut writer = console.clone();
        writer.write_all(b"first\n\nsecond\n").unwrap();
        assert_eq!(console.snapshot(), vec!["first", "second"]);
    }

    #[test]
    fn shared_level_round_trips_every_filter() {
        let shared = SharedLevel::new(LevelFilter::INFO);
        assert_eq!(shared.get(), LevelFilter::INFO);
        for level in LEVELS {
            shared.clone().set(level);
            assert_eq!(shared.get(), level);
        }
    }
}

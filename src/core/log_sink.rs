//! Statistics log output.
//!
//! One record per monitor window or per schedule transition. The format is
//! for humans; only the cadence and the monotonic elapsed time are stable.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::api::stats::AllocStats;
use crate::api::tier::Tier;

/// Where statistics records go.
pub(crate) enum LogSink {
    Stderr,
    File(BufWriter<File>),
    #[cfg(test)]
    Memory(Vec<u8>),
}

impl LogSink {
    /// Open `path` for appending, or stderr when no path is configured.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        match path {
            None => Ok(LogSink::Stderr),
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(LogSink::File(BufWriter::new(file)))
            }
        }
    }

    /// A monitor window closed.
    pub fn window(&mut self, elapsed: Duration, closed: &AllocStats) {
        self.line(format_args!(
            "[{:>12.6}s] allocated {} bytes, {} objects alive",
            elapsed.as_secs_f64(),
            closed.bytes_in_window,
            closed.live_objects
        ));
    }

    /// The schedule moved to a new segment.
    pub fn transition(&mut self, elapsed: Duration, from: Tier, to: Tier, closed: &AllocStats) {
        self.line(format_args!(
            "[{:>12.6}s] allocated {} bytes on {}, switching to {} ({} objects alive)",
            elapsed.as_secs_f64(),
            closed.bytes_in_window,
            from,
            to,
            closed.live_objects
        ));
    }

    /// The final segment of the schedule completed.
    pub fn completed(&mut self, elapsed: Duration, tier: Tier, closed: &AllocStats) {
        self.line(format_args!(
            "[{:>12.6}s] allocated {} bytes on {}, schedule complete, staying on {} \
             ({} objects alive)",
            elapsed.as_secs_f64(),
            closed.bytes_in_window,
            tier,
            tier,
            closed.live_objects
        ));
    }

    pub fn flush(&mut self) {
        let _ = match self {
            LogSink::Stderr => io::stderr().flush(),
            LogSink::File(w) => w.flush(),
            #[cfg(test)]
            LogSink::Memory(_) => Ok(()),
        };
    }

    #[cfg(test)]
    pub fn contents(&self) -> String {
        match self {
            LogSink::Memory(buf) => String::from_utf8_lossy(buf).into_owned(),
            _ => String::new(),
        }
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = match self {
            LogSink::Stderr => writeln!(io::stderr().lock(), "{}", args),
            LogSink::File(w) => writeln!(w, "{}", args),
            #[cfg(test)]
            LogSink::Memory(buf) => writeln!(buf, "{}", args),
        };
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_one_line_each() {
        let mut sink = LogSink::Memory(Vec::new());
        let stats = AllocStats {
            bytes_in_window: 4096,
            live_objects: 3,
            ..AllocStats::default()
        };
        sink.window(Duration::from_millis(250), &stats);
        sink.transition(Duration::from_millis(500), Tier::Durable, Tier::Volatile, &stats);

        let out = sink.contents();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("0.250000s"));
        assert!(lines[0].contains("4096 bytes"));
        assert!(lines[1].contains("durable, switching to volatile"));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.log");
        std::fs::write(&path, "existing\n").unwrap();
        {
            let mut sink = LogSink::open(Some(&path)).unwrap();
            sink.window(Duration::from_secs(1), &AllocStats::default());
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("existing\n"));
        assert_eq!(text.lines().count(), 2);
    }
}

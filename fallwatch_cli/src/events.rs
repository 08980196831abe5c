//! JSON-lines delivery of confirmed falls.
//!
//! One object per line: `{"device_id":"...","ts":<unix secs>,"severe":bool}`.
//! Runs on the `QueuedSink` worker thread, so blocking on the writer is fine.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use fallwatch_traits::{EventSink, FallEvent, PublishError};
use serde_json::json;

pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Stdout, or the file at `path` opened for append.
pub fn open_output(path: Option<&str>) -> eyre::Result<Box<dyn Write + Send>> {
    match path {
        None => Ok(Box::new(io::stdout())),
        Some(p) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(Path::new(p))
                .map_err(|e| eyre::eyre!("open event output {p:?}: {e}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

pub fn event_json(event: &FallEvent) -> serde_json::Value {
    json!({
        "device_id": event.device_id,
        "ts": event.unix_secs(),
        "severe": event.severe,
    })
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn publish(&mut self, event: FallEvent) -> Result<(), PublishError> {
        let line = event_json(&event).to_string();
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|e| PublishError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn event(severe: bool) -> FallEvent {
        FallEvent {
            device_id: "bed-3".into(),
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            severe,
        }
    }

    #[test]
    fn writes_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(event(true)).unwrap();
        sink.publish(event(false)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["device_id"], "bed-3");
        assert_eq!(lines[0]["ts"], 1_700_000_000u64);
        assert_eq!(lines[0]["severe"], true);
        assert_eq!(lines[1]["severe"], false);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_a_delivery_error() {
        let mut sink = JsonLinesSink::new(Broken);
        let err = sink.publish(event(true)).unwrap_err();
        assert!(matches!(err, PublishError::Delivery(msg) if msg.contains("reader went away")));
    }

    #[test]
    fn file_output_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let p = path.to_str().unwrap();
        for severe in [true, false] {
            let mut sink = JsonLinesSink::new(open_output(Some(p)).unwrap());
            sink.publish(event(severe)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}

//! Result records and where they go.
//!
//! The pipeline emits one [`GroupRecord`] per identifier group, one
//! [`FrameRecord`] per encoded frame, and a final [`RunSummary`]. A [`Sink`]
//! receives them in that order.
//!
//! # JSON Lines Output
//!
//! [`JsonLinesSink`] writes one object per line, tagged by kind:
//!
//! ```json
//! {"kind":"group","group_id":1,"prefix":"E280116060000200000030","prefix_bytes":11,...}
//! {"kind":"frame","group_id":1,"packet_id":0,"payload_hex":"0002...","verification_ok":true,...}
//! {"kind":"summary","groups":1,"frames":1,...}
//! ```

use crate::epc::Identifier;
use crate::lora::TransmissionPlan;
use serde::Serialize;
use std::io::{self, Write};

/// Size figures for one identifier group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub group_id: usize,
    pub prefix: String,
    pub prefix_bytes: usize,
    pub suffix_bytes: usize,
    pub member_count: usize,
    pub total_payload_bytes: usize,
    pub compression_percent: f64,
    /// Members that would fit in one frame sending the prefix once.
    pub suffixes_per_frame: usize,
}

/// One encoded frame with its airtime and verification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub group_id: usize,
    pub packet_id: u8,
    pub prefix: String,
    pub member_count: usize,
    pub original_identifiers: Vec<Identifier>,
    pub payload_hex: String,
    pub payload_bytes: usize,
    pub frame_duration_ms: f64,
    pub symbol_duration_ms: f64,
    pub payload_symbol_count: u32,
    pub decoded_identifiers: Vec<Identifier>,
    pub verification_ok: bool,
    /// Transport outcome, `None` when the run had no transport.
    pub sent: Option<bool>,
}

/// Totals for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub groups: usize,
    /// Groups with more than one member.
    pub compressed_groups: usize,
    pub mean_compression_percent: f64,
    pub identifiers: usize,
    pub frames: usize,
    pub total_payload_bytes: usize,
    pub mean_frame_duration_ms: f64,
    pub failed_verifications: usize,
    /// Frames the transport accepted.
    pub frames_sent: usize,
    /// Frames the transport refused.
    pub send_failures: usize,
    pub plan: TransmissionPlan,
}

/// Any record the pipeline produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Group(GroupRecord),
    Frame(FrameRecord),
    Summary(RunSummary),
}

/// Destination for result records.
pub trait Sink {
    fn write(&mut self, record: &Record) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        (**self).write(record)
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Record>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Group(g) => Some(g),
            _ => None,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Frame(f) => Some(f),
            _ => None,
        })
    }
}

impl Sink for MemorySink {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes records as JSON, one per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_record() -> GroupRecord {
        GroupRecord {
            group_id: 1,
            prefix: "E280116060000200000030".to_string(),
            prefix_bytes: 11,
            suffix_bytes: 1,
            member_count: 2,
            total_payload_bytes: 13,
            compression_percent: 45.8,
            suffixes_per_frame: 36,
        }
    }

    #[test]
    fn test_json_lines_tagged() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write(&Record::Group(group_record())).unwrap();
        sink.write(&Record::Group(group_record())).unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["kind"], "group");
        assert_eq!(value["prefix_bytes"], 11);
        assert_eq!(value["prefix"], "E280116060000200000030");
    }

    #[test]
    fn test_frame_record_identifiers_as_hex() {
        let id: Identifier = "E28011606000020000003039".parse().unwrap();
        let record = FrameRecord {
            group_id: 1,
            packet_id: 0,
            prefix: id.to_string(),
            member_count: 1,
            original_identifiers: vec![id],
            payload_hex: "00".to_string(),
            payload_bytes: 16,
            frame_duration_ms: 1155.072,
            symbol_duration_ms: 32.768,
            payload_symbol_count: 23,
            decoded_identifiers: vec![id],
            verification_ok: true,
            sent: None,
        };

        let value = serde_json::to_value(Record::Frame(record)).unwrap();
        assert_eq!(value["kind"], "frame");
        assert_eq!(value["decoded_identifiers"][0], "E28011606000020000003039");
        assert_eq!(value["verification_ok"], true);
        assert!(value["sent"].is_null());
    }

    #[test]
    fn test_memory_sink_filters() {
        let mut sink = MemorySink::new();
        sink.write(&Record::Group(group_record())).unwrap();
        assert_eq!(sink.groups().count(), 1);
        assert_eq!(sink.frames().count(), 0);
    }
}

//! End-to-end batch processing.
//!
//! A [`Pipeline`] takes a list of identifiers through every stage:
//! prefix grouping, frame encoding, airtime calculation, decode verification,
//! and duty cycle planning. Records go to a [`Sink`]; frame bytes optionally
//! go to a [`Transport`]. A frame the transport refuses is logged and counted,
//! and the run carries on with the next one.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::frame::FixedClock;
//! use epc_lora_framer::lora::{DutyCyclePlanner, RadioConfig};
//! use epc_lora_framer::sink::MemorySink;
//! use epc_lora_framer::Pipeline;
//!
//! let config = RadioConfig::new(12, 125, 1).unwrap();
//! let pipeline = Pipeline::with_clock(config, DutyCyclePlanner::default(), FixedClock(0));
//!
//! let ids = vec![
//!     "E28011606000020000003039".parse().unwrap(),
//!     "E28011606000020000003040".parse().unwrap(),
//! ];
//! let mut sink = MemorySink::new();
//! let summary = pipeline.run(&ids, &mut sink, None).unwrap();
//!
//! assert_eq!(summary.groups, 1);
//! assert_eq!(summary.frames, 1);
//! assert_eq!(summary.failed_verifications, 0);
//! ```

use crate::epc::{optimize, Group, Identifier};
use crate::error::Error;
use crate::frame::{Clock, Frame, FrameCodec, SystemClock};
use crate::lora::{AirtimeParameters, DutyCyclePlanner, RadioConfig};
use crate::sink::{FrameRecord, GroupRecord, Record, RunSummary, Sink};
use crate::transport::Transport;
use log::{debug, info, warn};

/// Runs identifier batches through grouping, framing and planning.
#[derive(Debug, Clone)]
pub struct Pipeline<C = SystemClock> {
    config: RadioConfig,
    planner: DutyCyclePlanner,
    codec: FrameCodec<C>,
}

impl Pipeline<SystemClock> {
    pub fn new(config: RadioConfig, planner: DutyCyclePlanner) -> Self {
        Self::with_clock(config, planner, SystemClock)
    }
}

impl<C: Clock> Pipeline<C> {
    /// Create a pipeline whose frames are stamped by `clock`.
    pub fn with_clock(config: RadioConfig, planner: DutyCyclePlanner, clock: C) -> Self {
        let codec = FrameCodec::with_clock(&config, clock);
        Self {
            config,
            planner,
            codec,
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Process `ids` and return run totals.
    ///
    /// Groups larger than one frame are split over consecutive frames. Packet
    /// ids count up across the whole run, wrapping at 256. Transport errors are
    /// not retried; they are counted in [`RunSummary::send_failures`]. Only
    /// planning, encoding and sink errors end the run.
    pub fn run(
        &self,
        ids: &[Identifier],
        sink: &mut dyn Sink,
        mut transport: Option<&mut dyn Transport>,
    ) -> Result<RunSummary, Error> {
        // Plan first so a zero-capacity configuration fails before any output
        let plan = self.planner.plan(ids.len(), &self.config)?;

        info!("Processing {} identifiers with {}", ids.len(), self.config);
        let groups = optimize(ids);

        let mut next_packet_id: u32 = 0;
        let mut frames = 0usize;
        let mut total_payload_bytes = 0usize;
        let mut total_frame_ms = 0.0;
        let mut failed_verifications = 0usize;
        let mut frames_sent = 0usize;
        let mut send_failures = 0usize;
        let mut compression_sum = 0.0;
        let available_bytes = self
            .config
            .max_payload_bytes()
            .saturating_sub(self.config.header_bytes());

        for (index, group) in groups.iter().enumerate() {
            let group_id = index + 1;
            let group_record = group_record(group_id, group, available_bytes);
            compression_sum += group_record.compression_percent;
            sink.write(&Record::Group(group_record))?;

            for frame in self.codec.encode_batch(group.members(), next_packet_id)? {
                next_packet_id = next_packet_id.wrapping_add(1);
                let mut record = self.frame_record(group_id, group, &frame)?;

                frames += 1;
                total_payload_bytes += record.payload_bytes;
                total_frame_ms += record.frame_duration_ms;
                if !record.verification_ok {
                    failed_verifications += 1;
                    warn!(
                        "Group {}: frame {} failed verification",
                        group_id, record.packet_id
                    );
                }

                if let Some(t) = transport.as_mut() {
                    let sent = send_frame(&mut **t, group_id, &frame);
                    if sent {
                        frames_sent += 1;
                    } else {
                        send_failures += 1;
                    }
                    record.sent = Some(sent);
                }

                debug!(
                    "Group {}: frame {} ({} bytes, {:.2} ms)",
                    group_id, record.packet_id, record.payload_bytes, record.frame_duration_ms
                );
                sink.write(&Record::Frame(record))?;
            }
        }

        let summary = RunSummary {
            groups: groups.len(),
            compressed_groups: groups.iter().filter(|g| !g.is_singleton()).count(),
            mean_compression_percent: mean(compression_sum, groups.len()),
            identifiers: ids.len(),
            frames,
            total_payload_bytes,
            mean_frame_duration_ms: mean(total_frame_ms, frames),
            failed_verifications,
            frames_sent,
            send_failures,
            plan,
        };

        info!(
            "{} groups ({} compressed, mean compression {:.1}%), {} frames, {} payload bytes",
            summary.groups,
            summary.compressed_groups,
            summary.mean_compression_percent,
            summary.frames,
            summary.total_payload_bytes
        );
        if send_failures > 0 {
            warn!(
                "{} of {} frames were not sent",
                send_failures,
                frames_sent + send_failures
            );
        }
        info!(
            "Batch airtime {:.2} s, {} batches/day, {} identifiers/day",
            plan.batch_duration_s(),
            plan.max_batches_per_day,
            plan.max_identifiers_per_day
        );

        sink.write(&Record::Summary(summary.clone()))?;
        Ok(summary)
    }

    fn frame_record(
        &self,
        group_id: usize,
        group: &Group,
        frame: &Frame,
    ) -> Result<FrameRecord, Error> {
        let bytes = frame.to_bytes();
        let airtime = AirtimeParameters::calculate(&self.config, bytes.len());
        let decoded = Frame::from_bytes(&bytes)?;

        Ok(FrameRecord {
            group_id,
            packet_id: frame.packet_id,
            prefix: group.prefix().to_string(),
            member_count: group.member_count(),
            original_identifiers: frame.identifiers.clone(),
            payload_hex: hex::encode_upper(&bytes),
            payload_bytes: bytes.len(),
            frame_duration_ms: airtime.frame_duration_ms,
            symbol_duration_ms: airtime.symbol_duration_ms,
            payload_symbol_count: airtime.payload_symbol_count,
            verification_ok: decoded.is_complete() && decoded.identifiers == frame.identifiers,
            decoded_identifiers: decoded.identifiers,
            sent: None,
        })
    }
}

fn send_frame(transport: &mut dyn Transport, group_id: usize, frame: &Frame) -> bool {
    match transport.send(&frame.to_bytes()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Group {}: frame {} not sent: {}", group_id, frame.packet_id, e);
            false
        }
    }
}

fn group_record(group_id: usize, group: &Group, available_bytes: usize) -> GroupRecord {
    let m = group.metrics();
    GroupRecord {
        group_id,
        prefix: group.prefix().to_string(),
        prefix_bytes: m.prefix_bytes,
        suffix_bytes: m.suffix_bytes,
        member_count: m.member_count,
        total_payload_bytes: m.total_payload_bytes,
        compression_percent: m.compression_percent,
        suffixes_per_frame: m.suffixes_per_frame(available_bytes),
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FixedClock;
    use crate::lora::PlanError;
    use crate::sink::MemorySink;
    use crate::transport::{MemoryTransport, TransportError};

    fn ids(strs: &[&str]) -> Vec<Identifier> {
        strs.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn pipeline(sf: u8) -> Pipeline<FixedClock> {
        let config = RadioConfig::new(sf, 125, 1).unwrap();
        Pipeline::with_clock(config, DutyCyclePlanner::default(), FixedClock(0))
    }

    #[test]
    fn test_records_in_order() {
        let input = ids(&[
            "E28011606000020000003039",
            "E28011606000020000003040",
            "AAAAAA000000000000000001",
        ]);
        let mut sink = MemorySink::new();
        pipeline(12).run(&input, &mut sink, None).unwrap();

        let kinds: Vec<&str> = sink
            .records
            .iter()
            .map(|r| match r {
                Record::Group(_) => "group",
                Record::Frame(_) => "frame",
                Record::Summary(_) => "summary",
            })
            .collect();
        assert_eq!(kinds, vec!["group", "frame", "group", "frame", "summary"]);
    }

    #[test]
    fn test_large_group_split_across_frames() {
        // 7 identifiers sharing a prefix, 3 per frame at SF12
        let input: Vec<Identifier> = (0..7)
            .map(|i| format!("E2801160600002000000300{}", i).parse().unwrap())
            .collect();
        let mut sink = MemorySink::new();
        let summary = pipeline(12).run(&input, &mut sink, None).unwrap();

        assert_eq!(summary.groups, 1);
        assert_eq!(summary.frames, 3);
        let packet_ids: Vec<u8> = sink.frames().map(|f| f.packet_id).collect();
        assert_eq!(packet_ids, vec![0, 1, 2]);
        assert!(sink.frames().all(|f| f.verification_ok));
        assert!(sink.frames().all(|f| f.group_id == 1));
    }

    #[test]
    fn test_transport_receives_frames_in_order() {
        let input: Vec<Identifier> = (0..5)
            .map(|i| format!("AAAAAA00000000000000000{}", i).parse().unwrap())
            .collect();
        let mut sink = MemorySink::new();
        let mut transport = MemoryTransport::new();
        pipeline(12)
            .run(&input, &mut sink, Some(&mut transport))
            .unwrap();

        assert_eq!(transport.sent().len(), 2);
        let payloads: Vec<String> = sink.frames().map(|f| f.payload_hex.clone()).collect();
        let sent: Vec<String> = transport.sent().iter().map(hex::encode_upper).collect();
        assert_eq!(payloads, sent);
    }

    /// Refuses the n-th frame (0-based), accepts the rest.
    struct FailingTransport {
        fail_at: usize,
        calls: usize,
        inner: MemoryTransport,
    }

    impl Transport for FailingTransport {
        fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            let call = self.calls;
            self.calls += 1;
            if call == self.fail_at {
                return Err(TransportError::Rejected("channel busy".to_string()));
            }
            self.inner.send(frame)
        }
    }

    #[test]
    fn test_closed_transport_counts_failures() {
        let input = ids(&["AAAAAA000000000000000001"]);
        let mut sink = MemorySink::new();
        let mut transport = MemoryTransport::new();
        transport.close();

        let summary = pipeline(12)
            .run(&input, &mut sink, Some(&mut transport))
            .unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.send_failures, 1);
        assert!(sink.frames().all(|f| f.sent == Some(false)));
        assert!(matches!(sink.records.last(), Some(Record::Summary(_))));
    }

    #[test]
    fn test_failed_send_does_not_stop_run() {
        // 9 identifiers at SF12, 3 per frame: the middle frame is refused
        let input: Vec<Identifier> = (0..9)
            .map(|i| format!("E2801160600002000000300{}", i).parse().unwrap())
            .collect();
        let mut sink = MemorySink::new();
        let mut transport = FailingTransport {
            fail_at: 1,
            calls: 0,
            inner: MemoryTransport::new(),
        };

        let summary = pipeline(12)
            .run(&input, &mut sink, Some(&mut transport))
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.frames_sent, 2);
        assert_eq!(summary.send_failures, 1);
        assert_eq!(transport.inner.sent().len(), 2);

        let outcomes: Vec<Option<bool>> = sink.frames().map(|f| f.sent).collect();
        assert_eq!(outcomes, vec![Some(true), Some(false), Some(true)]);
        match sink.records.last() {
            Some(Record::Summary(s)) => assert_eq!(s.send_failures, 1),
            other => panic!("expected summary last, got {:?}", other),
        }
    }

    #[test]
    fn test_no_transport_leaves_sent_unset() {
        let input = ids(&["AAAAAA000000000000000001"]);
        let mut sink = MemorySink::new();
        let summary = pipeline(12).run(&input, &mut sink, None).unwrap();
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.send_failures, 0);
        assert!(sink.frames().all(|f| f.sent.is_none()));
    }

    #[test]
    fn test_group_record_suffix_capacity() {
        let input = ids(&["E28011606000020000003039", "E28011606000020000003040"]);
        let mut sink = MemorySink::new();
        pipeline(12).run(&input, &mut sink, None).unwrap();

        // 51-byte EU868 SF12 payload: 47 after the header, 11-byte prefix
        let group = sink.groups().next().unwrap();
        assert_eq!(group.suffixes_per_frame, 36);
    }

    #[test]
    fn test_zero_capacity_fails_before_output() {
        let config = RadioConfig::builder().max_payload_override(8).build().unwrap();
        let pipeline = Pipeline::with_clock(config, DutyCyclePlanner::default(), FixedClock(0));
        let mut sink = MemorySink::new();

        let result = pipeline.run(&ids(&["AAAAAA000000000000000001"]), &mut sink, None);
        assert!(matches!(result, Err(Error::Plan(PlanError::ZeroCapacity { .. }))));
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_summary_figures() {
        let input = ids(&["E28011606000020000003039", "E28011606000020000003040"]);
        let mut sink = MemorySink::new();
        let summary = pipeline(12).run(&input, &mut sink, None).unwrap();

        assert_eq!(summary.identifiers, 2);
        assert_eq!(summary.compressed_groups, 1);
        assert!((summary.mean_compression_percent - 45.833).abs() < 0.01);
        assert_eq!(summary.total_payload_bytes, 4 + 2 * 12);
        assert_eq!(summary.plan.frames_needed, 1);
        assert!(summary.mean_frame_duration_ms > 0.0);
    }

    #[test]
    fn test_empty_input() {
        let mut sink = MemorySink::new();
        let summary = pipeline(7).run(&[], &mut sink, None).unwrap();
        assert_eq!(summary.groups, 0);
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.mean_frame_duration_ms, 0.0);
        assert_eq!(sink.records.len(), 1);
    }
}

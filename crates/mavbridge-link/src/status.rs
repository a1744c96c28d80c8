use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use serde::Serialize;

/// Point-in-time snapshot of a link's counters.
///
/// Counters only grow, except across an explicit [`StatusCounters::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    /// Packets decoded and delivered.
    pub rx_success: u32,
    /// Packets inferred lost from sequence gaps.
    pub rx_drop: u32,
    /// Decode failures (desync, bad checksum).
    pub parse_error: u32,
    /// Receive buffers that were truncated.
    pub buffer_overrun: u32,
    /// Sequence number of the last received packet.
    pub current_rx_seq: u8,
    /// Sequence number the next sent packet will carry.
    pub current_tx_seq: u8,
}

/// Counter increases between two [`LinkStatus`] snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDelta {
    pub rx_success: u32,
    pub rx_drop: u32,
    pub parse_error: u32,
    pub buffer_overrun: u32,
}

impl LinkStatus {
    /// Increase of each counter since `earlier`.
    ///
    /// A counter that went backwards can only come from a reset, so its
    /// current value is the whole increase.
    pub fn delta_since(&self, earlier: &LinkStatus) -> StatusDelta {
        fn grown(now: u32, then: u32) -> u32 {
            if now >= then {
                now - then
            } else {
                now
            }
        }

        StatusDelta {
            rx_success: grown(self.rx_success, earlier.rx_success),
            rx_drop: grown(self.rx_drop, earlier.rx_drop),
            parse_error: grown(self.parse_error, earlier.parse_error),
            buffer_overrun: grown(self.buffer_overrun, earlier.buffer_overrun),
        }
    }
}

/// Live counters written by the owning link, readable from any thread.
#[derive(Debug, Default)]
pub struct StatusCounters {
    rx_success: AtomicU32,
    rx_drop: AtomicU32,
    parse_error: AtomicU32,
    buffer_overrun: AtomicU32,
    current_rx_seq: AtomicU8,
    current_tx_seq: AtomicU8,
    rx_seen: AtomicBool,
}

impl StatusCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one decoded packet with sequence `seq`.
    ///
    /// The gap to the previous sequence (8-bit wrapping) counts as drops.
    pub fn record_received(&self, seq: u8) {
        if self.rx_seen.swap(true, Ordering::AcqRel) {
            let expected = self.current_rx_seq.load(Ordering::Acquire).wrapping_add(1);
            let gap = seq.wrapping_sub(expected);
            if gap != 0 {
                self.rx_drop.fetch_add(u32::from(gap), Ordering::Relaxed);
            }
        }
        self.current_rx_seq.store(seq, Ordering::Release);
        self.rx_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffer_overrun(&self) {
        self.buffer_overrun.fetch_add(1, Ordering::Relaxed);
    }

    /// Claim the next transmit sequence number.
    pub fn next_tx_seq(&self) -> u8 {
        self.current_tx_seq.fetch_add(1, Ordering::AcqRel)
    }

    /// Zero every counter and forget the receive sequence.
    pub fn reset(&self) {
        self.rx_success.store(0, Ordering::Relaxed);
        self.rx_drop.store(0, Ordering::Relaxed);
        self.parse_error.store(0, Ordering::Relaxed);
        self.buffer_overrun.store(0, Ordering::Relaxed);
        self.current_rx_seq.store(0, Ordering::Relaxed);
        self.current_tx_seq.store(0, Ordering::Relaxed);
        self.rx_seen.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> LinkStatus {
        LinkStatus {
            rx_success: self.rx_success.load(Ordering::Relaxed),
            rx_drop: self.rx_drop.load(Ordering::Relaxed),
            parse_error: self.parse_error.load(Ordering::Relaxed),
            buffer_overrun: self.buffer_overrun.load(Ordering::Relaxed),
            current_rx_seq: self.current_rx_seq.load(Ordering::Acquire),
            current_tx_seq: self.current_tx_seq.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_reports_new_successes_and_no_new_drops() {
        let earlier = LinkStatus {
            rx_success: 10,
            rx_drop: 2,
            ..LinkStatus::default()
        };
        let later = LinkStatus {
            rx_success: 15,
            rx_drop: 2,
            ..LinkStatus::default()
        };

        let delta = later.delta_since(&earlier);
        assert_eq!(delta.rx_success, 5);
        assert_eq!(delta.rx_drop, 0);
    }

    #[test]
    fn delta_after_reset_counts_from_zero() {
        let earlier = LinkStatus {
            rx_success: 100,
            parse_error: 4,
            ..LinkStatus::default()
        };
        let later = LinkStatus {
            rx_success: 3,
            parse_error: 1,
            ..LinkStatus::default()
        };

        let delta = later.delta_since(&earlier);
        assert_eq!(delta.rx_success, 3);
        assert_eq!(delta.parse_error, 1);
    }

    #[test]
    fn contiguous_sequences_count_no_drops() {
        let counters = StatusCounters::new();
        for seq in 0..=5u8 {
            counters.record_received(seq);
        }
        let status = counters.snapshot();
        assert_eq!(status.rx_success, 6);
        assert_eq!(status.rx_drop, 0);
        assert_eq!(status.current_rx_seq, 5);
    }

    #[test]
    fn sequence_gap_counts_drops_across_wraparound() {
        let counters = StatusCounters::new();
        counters.record_received(250);
        counters.record_received(254);
        counters.record_received(1);

        let status = counters.snapshot();
        assert_eq!(status.rx_success, 3);
        // 251..=253 and 255, 0 are missing.
        assert_eq!(status.rx_drop, 5);
        assert_eq!(status.current_rx_seq, 1);
    }

    #[test]
    fn first_packet_never_counts_as_drop() {
        let counters = StatusCounters::new();
        counters.record_received(77);
        assert_eq!(counters.snapshot().rx_drop, 0);
    }

    #[test]
    fn tx_sequence_wraps() {
        let counters = StatusCounters::new();
        for expected in 0..=255u8 {
            assert_eq!(counters.next_tx_seq(), expected);
        }
        assert_eq!(counters.next_tx_seq(), 0);
        assert_eq!(counters.snapshot().current_tx_seq, 1);
    }

    #[test]
    fn reset_zeroes_counters() {
        let counters = StatusCounters::new();
        counters.record_received(1);
        counters.record_received(9);
        counters.record_parse_error();
        counters.record_buffer_overrun();
        let _ = counters.next_tx_seq();

        counters.reset();
        assert_eq!(counters.snapshot(), LinkStatus::default());

        counters.record_received(40);
        assert_eq!(counters.snapshot().rx_drop, 0);
    }

    #[test]
    fn status_serializes_counter_names() {
        let json = serde_json::to_value(LinkStatus::default()).unwrap();
        for key in [
            "rx_success",
            "rx_drop",
            "parse_error",
            "buffer_overrun",
            "current_rx_seq",
            "current_tx_seq",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}

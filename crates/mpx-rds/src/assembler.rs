//! RDS group assembler (bit producer)
//!
//! Runs on the control core. Each call to [`RdsAssembler::emit_next_group`]
//! snapshots the configuration record, builds one 104-bit group (4 blocks ×
//! 26 bits) and pushes the bits into the cross-core FIFO, oldest-first
//! MSB-first. The cyclic schedule `[0A, 0A, 2A]` sends the PS name and
//! flags twice as often as RadioText; a 4A clock-time group preempts a slot
//! at most once per minute when enabled.
//!
//! The RadioText rotation list advances on dwell expiry against the
//! caller-supplied monotonic clock, which also drives 4A pacing. Timing is
//! never taken from the wall clock.

use std::sync::Arc;

use mpx_rt::BitFifo;

use crate::config::{RdsSnapshot, SharedRdsConfig, AF_FILLER, RT_MAX};
use crate::crc::{block_bits, OFFSET_A, OFFSET_B, OFFSET_C, OFFSET_D};

/// Minimum spacing between 4A clock-time groups
const CT_MIN_INTERVAL_US: u64 = 60_000_000;

/// What a scheduler step emitted (observable for tests and logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    Basic0A,
    RadioText2A,
    ClockTime4A,
}

pub struct RdsAssembler {
    cfg: Arc<SharedRdsConfig>,
    fifo: Arc<BitFifo>,
    /// Position in the cyclic schedule
    slot: usize,
    /// PS segment 0..3
    ps_index: u8,
    /// RT segment 0..15
    rt_segment: u8,
    /// Pair cursor into the AF sequence (header + codes)
    af_cursor: usize,
    /// A/B flag seen in the last snapshot; a change restarts RT segments
    last_rt_ab: Option<bool>,
    /// Rotation dwell deadline
    rotation_next_us: Option<u64>,
    rotation_index: usize,
    last_ct_us: Option<u64>,
}

impl RdsAssembler {
    pub fn new(cfg: Arc<SharedRdsConfig>, fifo: Arc<BitFifo>) -> Self {
        Self {
            cfg,
            fifo,
            slot: 0,
            ps_index: 0,
            rt_segment: 0,
            af_cursor: 0,
            last_rt_ab: None,
            rotation_next_us: None,
            rotation_index: 0,
            last_ct_us: None,
        }
    }

    /// Build and enqueue one group. `now_us` is a monotonic microsecond
    /// clock; it paces RT rotation and 4A groups only. Bit timing itself
    /// is phase-locked to the audio sample clock downstream.
    pub fn emit_next_group(&mut self, now_us: u64) -> GroupType {
        self.advance_rotation(now_us);

        let snap = self.cfg.snapshot();

        // Any RT mutation toggled the A/B flag: restart segment addressing.
        if self.last_rt_ab != Some(snap.rt_ab) {
            self.last_rt_ab = Some(snap.rt_ab);
            self.rt_segment = 0;
        }

        let ct_due = snap.ct_enabled
            && self
                .last_ct_us
                .map_or(true, |t| now_us.saturating_sub(t) >= CT_MIN_INTERVAL_US);
        if ct_due {
            self.last_ct_us = Some(now_us);
            self.emit_4a(&snap);
            return GroupType::ClockTime4A;
        }

        let group = match self.slot {
            0 | 1 => {
                self.emit_0a(&snap);
                GroupType::Basic0A
            }
            _ => {
                self.emit_2a(&snap);
                GroupType::RadioText2A
            }
        };
        self.slot = (self.slot + 1) % 3;
        group
    }

    fn advance_rotation(&mut self, now_us: u64) {
        let list_len = self.cfg.rt_list_len();
        let period_s = self.cfg.rt_period();
        if list_len == 0 || period_s == 0 {
            // Empty list disables rotation and holds the last set RT.
            self.rotation_next_us = None;
            return;
        }
        match self.rotation_next_us {
            None => {
                // Rotation armed: first switch after one full dwell.
                self.rotation_next_us = Some(now_us + period_s as u64 * 1_000_000);
                self.rotation_index = 0;
            }
            Some(deadline) if now_us >= deadline => {
                if let Some(text) = self.cfg.rt_list_get(self.rotation_index % list_len) {
                    // set_rt toggles the A/B flag; the snapshot check above
                    // then resets the segment counter.
                    let _ = self.cfg.set_rt(&text);
                }
                self.rotation_index = (self.rotation_index + 1) % list_len;
                self.rotation_next_us = Some(deadline + period_s as u64 * 1_000_000);
            }
            Some(_) => {}
        }
    }

    fn push_block(&self, info: u16, offset: u16) {
        for bit in block_bits(info, offset) {
            self.fifo.push(bit);
        }
    }

    /// Group 0A: PI, flags, AF pair, two PS characters.
    fn emit_0a(&mut self, snap: &RdsSnapshot) {
        let seg = self.ps_index as u16;
        // Decoder-information bit d0 (stereo) travels with segment 3.
        let di = u16::from(self.ps_index == 3);

        let block_b = (0u16 << 12)
            | (u16::from(snap.tp) << 10)
            | ((snap.pty as u16 & 0x1F) << 5)
            | (u16::from(snap.ta) << 4)
            | (u16::from(snap.ms_music) << 3)
            | (di << 2)
            | (seg & 0x3);
        let block_c = self.next_af_pair(snap);
        let block_d = ((snap.ps[seg as usize * 2] as u16) << 8)
            | snap.ps[seg as usize * 2 + 1] as u16;

        self.push_block(snap.pi, OFFSET_A);
        self.push_block(block_b, OFFSET_B);
        self.push_block(block_c, OFFSET_C);
        self.push_block(block_d, OFFSET_D);

        self.ps_index = (self.ps_index + 1) & 0x3;
    }

    /// Group 2A: PI, flags + A/B + segment, four RT characters.
    fn emit_2a(&mut self, snap: &RdsSnapshot) {
        let padded = padded_rt_len(snap.rt_len);
        let segments = (padded / 4) as u8;
        if self.rt_segment >= segments {
            self.rt_segment = 0;
        }
        let seg = self.rt_segment as usize;

        let block_b = (2u16 << 12)
            | (u16::from(snap.tp) << 10)
            | ((snap.pty as u16 & 0x1F) << 5)
            | (u16::from(snap.rt_ab) << 4)
            | (seg as u16 & 0xF);
        let c0 = rt_char(snap, seg * 4);
        let c1 = rt_char(snap, seg * 4 + 1);
        let c2 = rt_char(snap, seg * 4 + 2);
        let c3 = rt_char(snap, seg * 4 + 3);

        self.push_block(snap.pi, OFFSET_A);
        self.push_block(block_b, OFFSET_B);
        self.push_block(((c0 as u16) << 8) | c1 as u16, OFFSET_C);
        self.push_block(((c2 as u16) << 8) | c3 as u16, OFFSET_D);

        self.rt_segment = (self.rt_segment + 1) % segments;
    }

    /// Group 4A: MJD straddles blocks B/C, hour straddles C/D.
    fn emit_4a(&mut self, snap: &RdsSnapshot) {
        let ct = snap.ct;
        let block_b = (4u16 << 12)
            | (u16::from(snap.tp) << 10)
            | ((snap.pty as u16 & 0x1F) << 5)
            | ((ct.mjd >> 15) & 0x3) as u16;
        let block_c = (((ct.mjd & 0x7FFF) << 1) as u16) | u16::from(ct.hour >> 4);
        let sign = u16::from(ct.offset_half_hours < 0);
        let magnitude = ct.offset_half_hours.unsigned_abs() as u16 & 0x1F;
        let block_d = ((ct.hour as u16 & 0xF) << 12)
            | ((ct.minute as u16 & 0x3F) << 6)
            | (sign << 5)
            | magnitude;

        self.push_block(snap.pi, OFFSET_A);
        self.push_block(block_b, OFFSET_B);
        self.push_block(block_c, OFFSET_C);
        self.push_block(block_d, OFFSET_D);
    }

    /// Next two codes of the AF sequence `[0xE0+count, code0, code1, …]`,
    /// filler-padded. An empty list still transmits a well-formed pair.
    fn next_af_pair(&mut self, snap: &RdsSnapshot) -> u16 {
        let count = snap.af_count as usize;
        let total = count + 1;
        let pairs = total.div_ceil(2);

        let code_at = |i: usize| -> u8 {
            if i == 0 {
                0xE0 + snap.af_count
            } else if i <= count {
                snap.af[i - 1]
            } else {
                AF_FILLER
            }
        };

        let base = self.af_cursor * 2;
        let pair = ((code_at(base) as u16) << 8) | code_at(base + 1) as u16;
        self.af_cursor = (self.af_cursor + 1) % pairs;
        pair
    }
}

/// RT length padded with spaces to the next multiple of 4 (min one segment).
fn padded_rt_len(rt_len: u8) -> u16 {
    let len = (rt_len as u16).clamp(1, RT_MAX as u16);
    len.div_ceil(4) * 4
}

fn rt_char(snap: &RdsSnapshot, index: usize) -> u8 {
    if index < RT_MAX {
        snap.rt[index]
    } else {
        b' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::checkword;

    /// Pull one 26-bit block off the FIFO, verify its checkword against the
    /// claimed offset, and return the information word.
    fn take_block(fifo: &BitFifo, offset: u16) -> u16 {
        let mut info = 0u16;
        let mut cw = 0u16;
        for i in 0..26 {
            let bit = fifo.pop().expect("bit stream exhausted") as u16;
            if i < 16 {
                info = (info << 1) | bit;
            } else {
                cw = (cw << 1) | bit;
            }
        }
        assert_eq!(cw, checkword(info, offset), "checkword mismatch");
        info
    }

    fn setup() -> (Arc<SharedRdsConfig>, Arc<BitFifo>, RdsAssembler) {
        let cfg = SharedRdsConfig::new();
        let fifo = Arc::new(BitFifo::new(4096));
        let asm = RdsAssembler::new(Arc::clone(&cfg), Arc::clone(&fifo));
        (cfg, fifo, asm)
    }

    #[test]
    fn test_schedule_interleaves_0a_0a_2a() {
        let (_cfg, _fifo, mut asm) = setup();
        let kinds: Vec<GroupType> = (0..6).map(|_| asm.emit_next_group(0)).collect();
        assert_eq!(
            kinds,
            vec![
                GroupType::Basic0A,
                GroupType::Basic0A,
                GroupType::RadioText2A,
                GroupType::Basic0A,
                GroupType::Basic0A,
                GroupType::RadioText2A,
            ]
        );
    }

    #[test]
    fn test_ps_transmitted_in_segment_order() {
        let (cfg, fifo, mut asm) = setup();
        cfg.set_pi(0x52A1);
        cfg.set_ps("TEST1234").unwrap();

        let mut ps_chars = Vec::new();
        let mut emitted_0a: u16 = 0;
        while emitted_0a < 4 {
            if asm.emit_next_group(0) != GroupType::Basic0A {
                // Skip the 2A group's bits.
                for _ in 0..104 {
                    fifo.pop();
                }
                continue;
            }
            emitted_0a += 1;
            let a = take_block(&fifo, OFFSET_A);
            assert_eq!(a, 0x52A1);
            let b = take_block(&fifo, OFFSET_B);
            assert_eq!(b >> 12, 0, "group type 0A");
            let seg = b & 0x3;
            let _c = take_block(&fifo, OFFSET_C);
            let d = take_block(&fifo, OFFSET_D);
            assert_eq!(seg, (emitted_0a - 1) % 4);
            ps_chars.push((d >> 8) as u8 as char);
            ps_chars.push((d & 0xFF) as u8 as char);
        }
        let ps: String = ps_chars.into_iter().collect();
        assert_eq!(ps, "TEST1234");
        // The A/B flag never toggles from 0A traffic.
        assert!(!cfg.rt_ab());
    }

    #[test]
    fn test_rt_segments_cover_padded_text() {
        let (cfg, fifo, mut asm) = setup();
        cfg.set_rt("HELLO WORLD").unwrap(); // 11 chars → 12 padded → 3 segments

        let mut collected = vec![b' '; 12];
        let mut seen_segments = Vec::new();
        for _ in 0..9 {
            if asm.emit_next_group(0) != GroupType::RadioText2A {
                for _ in 0..104 {
                    fifo.pop();
                }
                continue;
            }
            let _a = take_block(&fifo, OFFSET_A);
            let b = take_block(&fifo, OFFSET_B);
            assert_eq!(b >> 12, 2, "group type 2A");
            assert_eq!((b >> 4) & 1, 1, "A/B flag set after one set_rt");
            let seg = (b & 0xF) as usize;
            seen_segments.push(seg);
            let c = take_block(&fifo, OFFSET_C);
            let d = take_block(&fifo, OFFSET_D);
            collected[seg * 4] = (c >> 8) as u8;
            collected[seg * 4 + 1] = (c & 0xFF) as u8;
            collected[seg * 4 + 2] = (d >> 8) as u8;
            collected[seg * 4 + 3] = (d & 0xFF) as u8;
        }
        assert_eq!(seen_segments, vec![0, 1, 2]);
        assert_eq!(&collected, b"HELLO WORLD ");
    }

    #[test]
    fn test_af_sequence_header_then_pairs() {
        let (cfg, fifo, mut asm) = setup();
        cfg.set_af_mhz(&[98.5, 101.1, 106.3]).unwrap();

        let mut c_blocks = Vec::new();
        while c_blocks.len() < 4 {
            if asm.emit_next_group(0) != GroupType::Basic0A {
                for _ in 0..104 {
                    fifo.pop();
                }
                continue;
            }
            let _a = take_block(&fifo, OFFSET_A);
            let _b = take_block(&fifo, OFFSET_B);
            c_blocks.push(take_block(&fifo, OFFSET_C));
            let _d = take_block(&fifo, OFFSET_D);
        }
        // Sequence: (0xE0+3, 110), (136, 188), wrap, (0xE0+3, 110), ...
        assert_eq!(c_blocks[0], ((0xE0u16 + 3) << 8) | 110);
        assert_eq!(c_blocks[1], (136u16 << 8) | 188);
        assert_eq!(c_blocks[2], c_blocks[0]);
        assert_eq!(c_blocks[3], c_blocks[1]);
    }

    #[test]
    fn test_af_empty_list_transmits_header_and_filler() {
        let (_cfg, fifo, mut asm) = setup();
        let _ = asm.emit_next_group(0);
        let _a = take_block(&fifo, OFFSET_A);
        let _b = take_block(&fifo, OFFSET_B);
        let c = take_block(&fifo, OFFSET_C);
        assert_eq!(c, (0xE0u16 << 8) | AF_FILLER as u16);
    }

    #[test]
    fn test_rotation_toggles_ab_once_per_dwell() {
        let (cfg, _fifo, mut asm) = setup();
        cfg.set_rt("HELLO WORLD").unwrap();
        let ab_start = cfg.rt_ab();
        cfg.rt_list_add("A").unwrap();
        cfg.rt_list_add("B").unwrap();
        cfg.set_rt_period(1);

        // t = 0: rotation armed, no switch yet.
        asm.emit_next_group(0);
        assert_eq!(cfg.rt_ab(), ab_start);
        assert_eq!(cfg.rt_string(), "HELLO WORLD");

        // Just before the dwell expires: still holding.
        asm.emit_next_group(900_000);
        assert_eq!(cfg.rt_ab(), ab_start);

        // Dwell expired: exactly one toggle, RT is now "A".
        asm.emit_next_group(1_000_000);
        assert_eq!(cfg.rt_ab(), !ab_start);
        assert_eq!(cfg.rt_string(), "A");

        // Second dwell: switches to "B".
        asm.emit_next_group(2_000_000);
        assert_eq!(cfg.rt_ab(), ab_start);
        assert_eq!(cfg.rt_string(), "B");
    }

    #[test]
    fn test_ct_emitted_at_most_once_per_minute() {
        let (cfg, fifo, mut asm) = setup();
        cfg.set_clock(2026, 8, 1, 7, 45, -2).unwrap();

        assert_eq!(asm.emit_next_group(0), GroupType::ClockTime4A);
        let _a = take_block(&fifo, OFFSET_A);
        let b = take_block(&fifo, OFFSET_B);
        assert_eq!(b >> 12, 4);
        let c = take_block(&fifo, OFFSET_C);
        let d = take_block(&fifo, OFFSET_D);

        let mjd = (((b as u32) & 0x3) << 15) | ((c as u32) >> 1);
        assert_eq!(mjd, 61_253);
        let hour = (((c & 1) << 4) | (d >> 12)) as u8;
        assert_eq!(hour, 7);
        let minute = ((d >> 6) & 0x3F) as u8;
        assert_eq!(minute, 45);
        assert_eq!((d >> 5) & 1, 1, "negative offset sign");
        assert_eq!(d & 0x1F, 2);

        // Within the same minute: back to the normal schedule.
        assert_eq!(asm.emit_next_group(1_000_000), GroupType::Basic0A);
        // After 60 s: 4A again.
        assert_eq!(asm.emit_next_group(61_000_000), GroupType::ClockTime4A);
    }

    #[test]
    fn test_4a_disabled_by_default() {
        let (_cfg, _fifo, mut asm) = setup();
        for _ in 0..12 {
            assert_ne!(asm.emit_next_group(0), GroupType::ClockTime4A);
        }
    }

    #[test]
    fn test_console_rt_set_restarts_segments() {
        let (cfg, fifo, mut asm) = setup();
        cfg.set_rt("ABCDEFGHIJKL").unwrap(); // 3 segments
        // Consume one 2A (segment 0 goes out, counter now at 1).
        loop {
            let kind = asm.emit_next_group(0);
            for _ in 0..104 {
                fifo.pop();
            }
            if kind == GroupType::RadioText2A {
                break;
            }
        }
        // New RT arrives: next 2A must restart at segment 0.
        cfg.set_rt("XYZ").unwrap();
        loop {
            if asm.emit_next_group(0) != GroupType::RadioText2A {
                for _ in 0..104 {
                    fifo.pop();
                }
                continue;
            }
            let _a = take_block(&fifo, OFFSET_A);
            let b = take_block(&fifo, OFFSET_B);
            assert_eq!(b & 0xF, 0, "segment restarted");
            break;
        }
    }
}

//! RDS configuration record
//!
//! The assembler owns the canonical copy of the station data. External
//! mutators (the console) write through this single-writer interface; every
//! multi-field update happens inside one short critical section, and the
//! assembler snapshots the whole record between groups so it never sees a
//! torn PS name or RT string.
//!
//! Out-of-range values are rejected here, at the mutator boundary, with
//! typed errors; nothing invalid ever reaches the bitstream.

use std::sync::Arc;

use mpx_core::{EngineError, EngineResult};
use parking_lot::Mutex;

use crate::clock::mjd_from_ymd;

/// Program Service name length (fixed, space padded)
pub const PS_LEN: usize = 8;
/// RadioText capacity
pub const RT_MAX: usize = 64;
/// Maximum Alternative Frequency codes (method A)
pub const AF_MAX: usize = 25;
/// AF filler code
pub const AF_FILLER: u8 = 0xCD;

/// Clock-time fields for 4A groups (local time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    pub mjd: u32,
    pub hour: u8,
    pub minute: u8,
    /// Local offset from UTC in half-hour steps, signed
    pub offset_half_hours: i8,
}

/// Plain-data copy of the record, taken by the assembler between groups.
#[derive(Debug, Clone, Copy)]
pub struct RdsSnapshot {
    pub pi: u16,
    pub pty: u8,
    pub tp: bool,
    pub ta: bool,
    /// true = music, false = speech
    pub ms_music: bool,
    pub ps: [u8; PS_LEN],
    pub rt: [u8; RT_MAX],
    pub rt_len: u8,
    pub rt_ab: bool,
    pub af: [u8; AF_MAX],
    pub af_count: u8,
    pub ct_enabled: bool,
    pub ct: ClockTime,
    /// Bumped on every mutation
    pub version: u32,
}

#[derive(Debug)]
struct Inner {
    snap: RdsSnapshot,
    rt_list: Vec<String>,
    rt_period_s: u32,
}

/// Shared record: console writes, assembler snapshots.
#[derive(Debug)]
pub struct SharedRdsConfig {
    inner: Mutex<Inner>,
}

impl SharedRdsConfig {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                snap: RdsSnapshot {
                    pi: 0xFFFF,
                    pty: 0,
                    tp: false,
                    ta: false,
                    ms_music: true,
                    ps: *b"        ",
                    rt: [b' '; RT_MAX],
                    rt_len: 0,
                    rt_ab: false,
                    af: [AF_FILLER; AF_MAX],
                    af_count: 0,
                    ct_enabled: false,
                    ct: ClockTime::default(),
                    version: 0,
                },
                rt_list: Vec::new(),
                rt_period_s: 30,
            }),
        })
    }

    /// Copy the record for group construction. Cheap: plain-data fields
    /// only, the rotation list stays behind the lock.
    pub fn snapshot(&self) -> RdsSnapshot {
        self.inner.lock().snap
    }

    // ------------------------------------------------------------------
    // Mutators (console-serialized single writer)
    // ------------------------------------------------------------------

    pub fn set_pi(&self, pi: u16) {
        let mut inner = self.inner.lock();
        inner.snap.pi = pi;
        inner.snap.version += 1;
    }

    pub fn set_pty(&self, pty: u8) -> EngineResult<()> {
        if pty > 31 {
            return Err(EngineError::InvalidParam(format!("PTY {pty} out of 0..31")));
        }
        let mut inner = self.inner.lock();
        inner.snap.pty = pty;
        inner.snap.version += 1;
        Ok(())
    }

    pub fn set_tp(&self, tp: bool) {
        let mut inner = self.inner.lock();
        inner.snap.tp = tp;
        inner.snap.version += 1;
    }

    pub fn set_ta(&self, ta: bool) {
        let mut inner = self.inner.lock();
        inner.snap.ta = ta;
        inner.snap.version += 1;
    }

    pub fn set_ms(&self, music: bool) {
        let mut inner = self.inner.lock();
        inner.snap.ms_music = music;
        inner.snap.version += 1;
    }

    /// Set the Program Service name (1..=8 chars, space padded).
    pub fn set_ps(&self, ps: &str) -> EngineResult<()> {
        if ps.is_empty() || ps.len() > PS_LEN || !ps.is_ascii() {
            return Err(EngineError::InvalidParam(format!(
                "PS must be 1..{PS_LEN} ASCII chars"
            )));
        }
        let mut inner = self.inner.lock();
        inner.snap.ps = *b"        ";
        inner.snap.ps[..ps.len()].copy_from_slice(ps.as_bytes());
        inner.snap.version += 1;
        Ok(())
    }

    /// Set the current RadioText (1..=64 chars). The A/B flag toggles on
    /// every call, including one that writes the identical text, which
    /// forces receivers to discard and redraw.
    pub fn set_rt(&self, rt: &str) -> EngineResult<()> {
        if rt.is_empty() || rt.len() > RT_MAX || !rt.is_ascii() {
            return Err(EngineError::InvalidParam(format!(
                "RT must be 1..{RT_MAX} ASCII chars"
            )));
        }
        let mut inner = self.inner.lock();
        inner.snap.rt = [b' '; RT_MAX];
        inner.snap.rt[..rt.len()].copy_from_slice(rt.as_bytes());
        inner.snap.rt_len = rt.len() as u8;
        inner.snap.rt_ab = !inner.snap.rt_ab;
        inner.snap.version += 1;
        Ok(())
    }

    pub fn rt_list_add(&self, text: &str) -> EngineResult<()> {
        if text.is_empty() || text.len() > RT_MAX || !text.is_ascii() {
            return Err(EngineError::InvalidParam(format!(
                "RT must be 1..{RT_MAX} ASCII chars"
            )));
        }
        let mut inner = self.inner.lock();
        inner.rt_list.push(text.to_string());
        inner.snap.version += 1;
        Ok(())
    }

    pub fn rt_list_del(&self, index: usize) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        if index >= inner.rt_list.len() {
            return Err(EngineError::InvalidParam(format!(
                "RT list index {index} out of range"
            )));
        }
        inner.rt_list.remove(index);
        inner.snap.version += 1;
        Ok(())
    }

    pub fn rt_list_clear(&self) {
        let mut inner = self.inner.lock();
        inner.rt_list.clear();
        inner.snap.version += 1;
    }

    pub fn rt_list(&self) -> Vec<String> {
        self.inner.lock().rt_list.clone()
    }

    pub fn rt_list_get(&self, index: usize) -> Option<String> {
        self.inner.lock().rt_list.get(index).cloned()
    }

    pub fn rt_list_len(&self) -> usize {
        self.inner.lock().rt_list.len()
    }

    pub fn set_rt_period(&self, seconds: u32) {
        let mut inner = self.inner.lock();
        inner.rt_period_s = seconds;
        inner.snap.version += 1;
    }

    pub fn rt_period(&self) -> u32 {
        self.inner.lock().rt_period_s
    }

    /// Set the AF list from frequencies in MHz (VHF FM method A). Each must
    /// land on the 100 kHz grid within 87.6..=107.9 MHz.
    pub fn set_af_mhz(&self, freqs_mhz: &[f32]) -> EngineResult<()> {
        if freqs_mhz.len() > AF_MAX {
            return Err(EngineError::InvalidParam(format!(
                "AF list limited to {AF_MAX} entries"
            )));
        }
        let mut codes = [AF_FILLER; AF_MAX];
        for (i, &f) in freqs_mhz.iter().enumerate() {
            codes[i] = af_code_from_mhz(f)?;
        }
        let mut inner = self.inner.lock();
        inner.snap.af = codes;
        inner.snap.af_count = freqs_mhz.len() as u8;
        inner.snap.version += 1;
        Ok(())
    }

    pub fn af_mhz(&self) -> Vec<f32> {
        let inner = self.inner.lock();
        inner.snap.af[..inner.snap.af_count as usize]
            .iter()
            .map(|&c| af_mhz_from_code(c))
            .collect()
    }

    pub fn af_codes(&self) -> Vec<u8> {
        let inner = self.inner.lock();
        inner.snap.af[..inner.snap.af_count as usize].to_vec()
    }

    /// Restore AF directly from persisted codes.
    pub fn set_af_codes(&self, codes: &[u8]) -> EngineResult<()> {
        if codes.len() > AF_MAX {
            return Err(EngineError::InvalidParam(format!(
                "AF list limited to {AF_MAX} entries"
            )));
        }
        for &c in codes {
            if c == 0 || c > 204 {
                return Err(EngineError::InvalidParam(format!("AF code {c} invalid")));
            }
        }
        let mut inner = self.inner.lock();
        inner.snap.af = [AF_FILLER; AF_MAX];
        inner.snap.af[..codes.len()].copy_from_slice(codes);
        inner.snap.af_count = codes.len() as u8;
        inner.snap.version += 1;
        Ok(())
    }

    /// Set local clock-time and enable 4A groups.
    pub fn set_clock(
        &self,
        year: i32,
        month: u32,
        day: u32,
        hour: u8,
        minute: u8,
        offset_half_hours: i8,
    ) -> EngineResult<()> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(EngineError::InvalidParam(format!(
                "invalid date {year}-{month:02}-{day:02}"
            )));
        }
        if hour > 23 || minute > 59 || offset_half_hours.abs() > 31 {
            return Err(EngineError::InvalidParam("invalid time".into()));
        }
        let mut inner = self.inner.lock();
        inner.snap.ct = ClockTime {
            mjd: mjd_from_ymd(year, month, day),
            hour,
            minute,
            offset_half_hours,
        };
        inner.snap.ct_enabled = true;
        inner.snap.version += 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Query accessors (console read path)
    // ------------------------------------------------------------------

    pub fn pi(&self) -> u16 {
        self.inner.lock().snap.pi
    }

    pub fn pty(&self) -> u8 {
        self.inner.lock().snap.pty
    }

    pub fn tp(&self) -> bool {
        self.inner.lock().snap.tp
    }

    pub fn ta(&self) -> bool {
        self.inner.lock().snap.ta
    }

    pub fn ms_music(&self) -> bool {
        self.inner.lock().snap.ms_music
    }

    pub fn rt_ab(&self) -> bool {
        self.inner.lock().snap.rt_ab
    }

    pub fn ps_string(&self) -> String {
        let inner = self.inner.lock();
        String::from_utf8_lossy(&inner.snap.ps).trim_end().to_string()
    }

    pub fn rt_string(&self) -> String {
        let inner = self.inner.lock();
        let len = inner.snap.rt_len as usize;
        String::from_utf8_lossy(&inner.snap.rt[..len]).to_string()
    }
}

/// Map an FM frequency in MHz to its method-A AF code.
pub fn af_code_from_mhz(f: f32) -> EngineResult<u8> {
    let code = ((f - 87.5) / 0.1).round();
    if !(1.0..=204.0).contains(&code) {
        return Err(EngineError::InvalidParam(format!(
            "AF {f:.1} MHz outside 87.6..107.9"
        )));
    }
    Ok(code as u8)
}

/// Inverse mapping for queries.
pub fn af_mhz_from_code(code: u8) -> f32 {
    87.5 + 0.1 * code as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ps_padded_to_eight() {
        let cfg = SharedRdsConfig::new();
        cfg.set_ps("KEXP").unwrap();
        assert_eq!(&cfg.snapshot().ps, b"KEXP    ");
        assert_eq!(cfg.ps_string(), "KEXP");
    }

    #[test]
    fn test_ps_rejects_out_of_range() {
        let cfg = SharedRdsConfig::new();
        assert!(cfg.set_ps("").is_err());
        assert!(cfg.set_ps("NINECHARS").is_err());
    }

    #[test]
    fn test_rt_ab_toggles_on_every_set() {
        let cfg = SharedRdsConfig::new();
        assert!(!cfg.rt_ab());
        cfg.set_rt("HELLO WORLD").unwrap();
        assert!(cfg.rt_ab());
        // Identical text still toggles.
        cfg.set_rt("HELLO WORLD").unwrap();
        assert!(!cfg.rt_ab());
    }

    #[test]
    fn test_af_code_mapping() {
        assert_eq!(af_code_from_mhz(87.6).unwrap(), 1);
        assert_eq!(af_code_from_mhz(101.1).unwrap(), 136);
        assert_eq!(af_code_from_mhz(107.9).unwrap(), 204);
        assert!(af_code_from_mhz(87.5).is_err());
        assert!(af_code_from_mhz(108.0).is_err());
        assert!((af_mhz_from_code(136) - 101.1).abs() < 1e-4);
    }

    #[test]
    fn test_af_list_round_trip() {
        let cfg = SharedRdsConfig::new();
        cfg.set_af_mhz(&[98.5, 101.1]).unwrap();
        let snap = cfg.snapshot();
        assert_eq!(snap.af_count, 2);
        assert_eq!(snap.af[0], 110);
        assert_eq!(snap.af[1], 136);
        let back = cfg.af_mhz();
        assert!((back[0] - 98.5).abs() < 1e-4);
    }

    #[test]
    fn test_rt_list_editing() {
        let cfg = SharedRdsConfig::new();
        cfg.rt_list_add("ONE").unwrap();
        cfg.rt_list_add("TWO").unwrap();
        assert_eq!(cfg.rt_list_len(), 2);
        cfg.rt_list_del(0).unwrap();
        assert_eq!(cfg.rt_list(), vec!["TWO".to_string()]);
        assert!(cfg.rt_list_del(5).is_err());
        cfg.rt_list_clear();
        assert_eq!(cfg.rt_list_len(), 0);
    }

    #[test]
    fn test_clock_enables_ct() {
        let cfg = SharedRdsConfig::new();
        assert!(!cfg.snapshot().ct_enabled);
        cfg.set_clock(2026, 8, 1, 12, 30, 4).unwrap();
        let snap = cfg.snapshot();
        assert!(snap.ct_enabled);
        assert_eq!(snap.ct.mjd, 61_253);
        assert_eq!(snap.ct.offset_half_hours, 4);
        assert!(cfg.set_clock(2026, 13, 1, 0, 0, 0).is_err());
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let cfg = SharedRdsConfig::new();
        let v0 = cfg.snapshot().version;
        cfg.set_pi(0x1234);
        cfg.set_ta(true);
        assert_eq!(cfg.snapshot().version, v0 + 2);
    }
}

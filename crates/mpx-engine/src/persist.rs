//! Persisted configuration blob
//!
//! One keyed JSON document under well-known keys, written by
//! `SYST:CONF:SAVE` and loaded at startup before the assembler starts. The
//! storage backend (filesystem here, NVS on the target hardware) only needs
//! get/set of this single blob.

use std::path::Path;
use std::sync::Arc;

use mpx_core::{AudioParams, EngineError, EngineResult, PreemphasisMode};
use mpx_rds::SharedRdsConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConfig {
    #[serde(rename = "rds.pi")]
    pub pi: u16,
    #[serde(rename = "rds.pty")]
    pub pty: u8,
    #[serde(rename = "rds.tp")]
    pub tp: bool,
    #[serde(rename = "rds.ta")]
    pub ta: bool,
    #[serde(rename = "rds.ms")]
    pub ms_music: bool,
    #[serde(rename = "rds.ps")]
    pub ps: String,
    #[serde(rename = "rds.rt")]
    pub rt: String,
    #[serde(rename = "rds.af")]
    pub af: Vec<u8>,
    #[serde(rename = "rds.rt_list")]
    pub rt_list: Vec<String>,
    #[serde(rename = "rds.rt_period")]
    pub rt_period: u32,
    #[serde(rename = "audio.preemph")]
    pub preemph: String,
    #[serde(rename = "audio.pilot")]
    pub pilot: f32,
    #[serde(rename = "audio.rds_amp")]
    pub rds_amp: f32,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            pi: 0xFFFF,
            pty: 0,
            tp: false,
            ta: false,
            ms_music: true,
            ps: String::new(),
            rt: String::new(),
            af: Vec::new(),
            rt_list: Vec::new(),
            rt_period: 30,
            preemph: "50US".to_string(),
            pilot: mpx_core::PILOT_AMP_DEFAULT,
            rds_amp: mpx_core::RDS_AMP_DEFAULT,
        }
    }
}

impl PersistedConfig {
    /// Snapshot the live configuration into a persistable record.
    pub fn capture(rds: &Arc<SharedRdsConfig>, params: &Arc<AudioParams>) -> Self {
        Self {
            pi: rds.pi(),
            pty: rds.pty(),
            tp: rds.tp(),
            ta: rds.ta(),
            ms_music: rds.ms_music(),
            ps: rds.ps_string(),
            rt: rds.rt_string(),
            af: rds.af_codes(),
            rt_list: rds.rt_list(),
            rt_period: rds.rt_period(),
            preemph: params.preemphasis().as_str().to_string(),
            pilot: params.pilot_amp(),
            rds_amp: params.rds_amp(),
        }
    }

    /// Push the record into the live configuration. Invalid persisted
    /// fields are rejected the same way console input would be.
    pub fn apply(
        &self,
        rds: &Arc<SharedRdsConfig>,
        params: &Arc<AudioParams>,
    ) -> EngineResult<()> {
        rds.set_pi(self.pi);
        rds.set_pty(self.pty)?;
        rds.set_tp(self.tp);
        rds.set_ta(self.ta);
        rds.set_ms(self.ms_music);
        if !self.ps.is_empty() {
            rds.set_ps(&self.ps)?;
        }
        if !self.rt.is_empty() {
            rds.set_rt(&self.rt)?;
        }
        rds.set_af_codes(&self.af)?;
        rds.rt_list_clear();
        for text in &self.rt_list {
            rds.rt_list_add(text)?;
        }
        rds.set_rt_period(self.rt_period);

        let mode = PreemphasisMode::parse(&self.preemph)
            .ok_or_else(|| EngineError::InvalidParam(format!("preemph '{}'", self.preemph)))?;
        params.set_preemphasis(mode);
        if !(0.0..=0.2).contains(&self.pilot) || !(0.0..=0.2).contains(&self.rds_amp) {
            return Err(EngineError::InvalidParam("level outside 0..0.2".into()));
        }
        params.set_pilot_amp(self.pilot);
        params.set_rds_amp(self.rds_amp);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Io(format!("serialize config: {e}")))?;
        std::fs::write(path, json).map_err(|e| EngineError::Io(format!("write {}: {e}", path.display())))
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Io(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&json).map_err(|e| EngineError::Io(format!("parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let rds = SharedRdsConfig::new();
        let params = Arc::new(AudioParams::new());
        rds.set_pi(0x52A1);
        rds.set_ps("KEXP").unwrap();
        rds.set_rt("NOW PLAYING").unwrap();
        rds.set_af_mhz(&[98.5]).unwrap();
        rds.rt_list_add("ALPHA").unwrap();
        rds.set_rt_period(12);
        params.set_pilot_amp(0.08);
        params.set_preemphasis(PreemphasisMode::Us75);

        PersistedConfig::capture(&rds, &params).save(&path).unwrap();

        let rds2 = SharedRdsConfig::new();
        let params2 = Arc::new(AudioParams::new());
        PersistedConfig::load(&path)
            .unwrap()
            .apply(&rds2, &params2)
            .unwrap();

        assert_eq!(rds2.pi(), 0x52A1);
        assert_eq!(rds2.ps_string(), "KEXP");
        assert_eq!(rds2.rt_string(), "NOW PLAYING");
        assert_eq!(rds2.af_codes(), vec![110]);
        assert_eq!(rds2.rt_list(), vec!["ALPHA".to_string()]);
        assert_eq!(rds2.rt_period(), 12);
        assert_eq!(params2.pilot_amp(), 0.08);
        assert_eq!(params2.preemphasis(), PreemphasisMode::Us75);
    }

    #[test]
    fn test_keys_use_dotted_names() {
        let json = serde_json::to_value(PersistedConfig::default()).unwrap();
        assert!(json.get("rds.pi").is_some());
        assert!(json.get("audio.preemph").is_some());
        assert!(json.get("rds.rt_period").is_some());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = PersistedConfig::load(Path::new("/nonexistent/mpxforge.json")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_apply_rejects_bad_levels() {
        let rds = SharedRdsConfig::new();
        let params = Arc::new(AudioParams::new());
        let cfg = PersistedConfig {
            pilot: 0.5,
            ..Default::default()
        };
        assert!(cfg.apply(&rds, &params).is_err());
    }
}

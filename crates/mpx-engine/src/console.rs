//! SCPI-style control console
//!
//! Line protocol `GROUP:ITEM <value>` / `GROUP:ITEM?`, case-insensitive and
//! whitespace-tolerant. Writes mutate the RDS configuration record (picked
//! up by the assembler between groups) or the atomic audio parameter block;
//! they never touch audio-task state directly. Responses are single lines:
//! `OK key=value …` / `ERR CODE message`, or one-line JSON when selected.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use mpx_core::{AudioParams, EngineError, PreemphasisMode};
use mpx_rds::{pty, SharedRdsConfig};
use mpx_rt::{LogControl, Mailbox};

use crate::persist::PersistedConfig;
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

struct CmdError {
    code: &'static str,
    message: String,
}

impl CmdError {
    fn syntax(message: impl Into<String>) -> Self {
        Self {
            code: "SYNTAX",
            message: message.into(),
        }
    }

    fn range(message: impl Into<String>) -> Self {
        Self {
            code: "RANGE",
            message: message.into(),
        }
    }

    fn unknown(head: &str) -> Self {
        Self {
            code: "UNKNOWN",
            message: format!("unrecognized command {head}"),
        }
    }
}

impl From<EngineError> for CmdError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidParam(message) => Self {
                code: "RANGE",
                message,
            },
            other => Self {
                code: "IO",
                message: other.to_string(),
            },
        }
    }
}

type KeyValues = Vec<(&'static str, String)>;
type CmdResult = Result<KeyValues, CmdError>;

pub struct Console {
    rds: Arc<SharedRdsConfig>,
    params: Arc<AudioParams>,
    log_control: Arc<LogControl>,
    stats_mail: Arc<Mailbox<StatsSnapshot>>,
    format: ResponseFormat,
    persist_path: PathBuf,
}

impl Console {
    pub fn new(
        rds: Arc<SharedRdsConfig>,
        params: Arc<AudioParams>,
        log_control: Arc<LogControl>,
        stats_mail: Arc<Mailbox<StatsSnapshot>>,
        persist_path: PathBuf,
    ) -> Self {
        Self {
            rds,
            params,
            log_control,
            stats_mail,
            format: ResponseFormat::Text,
            persist_path,
        }
    }

    /// Parse and execute one input line. Returns `None` for blank lines.
    pub fn execute_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, args) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let mut head = head.to_ascii_uppercase();
        let query = head.ends_with('?');
        if query {
            head.pop();
        }

        let result = self.dispatch(&head, args, query);
        Some(self.render(result))
    }

    fn render(&self, result: CmdResult) -> String {
        match (result, self.format) {
            (Ok(kvs), ResponseFormat::Text) => {
                let mut out = String::from("OK");
                for (k, v) in kvs {
                    out.push(' ');
                    out.push_str(k);
                    out.push('=');
                    out.push_str(&v);
                }
                out
            }
            (Ok(kvs), ResponseFormat::Json) => {
                let data: serde_json::Map<String, serde_json::Value> = kvs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                    .collect();
                serde_json::json!({ "ok": true, "data": data }).to_string()
            }
            (Err(e), ResponseFormat::Text) => format!("ERR {} {}", e.code, e.message),
            (Err(e), ResponseFormat::Json) => serde_json::json!({
                "ok": false,
                "error": { "code": e.code, "message": e.message }
            })
            .to_string(),
        }
    }

    fn dispatch(&mut self, head: &str, args: &str, query: bool) -> CmdResult {
        let segments: Vec<&str> = head.split(':').collect();
        match segments.as_slice() {
            ["RDS", "PI"] => self.cmd_pi(args, query),
            ["RDS", "PTY"] => self.cmd_pty(args, query),
            ["RDS", "TP"] => self.cmd_flag(args, query, "tp"),
            ["RDS", "TA"] => self.cmd_flag(args, query, "ta"),
            ["RDS", "MS"] => self.cmd_ms(args, query),
            ["RDS", "PS"] => self.cmd_ps(args, query),
            ["RDS", "RT"] => self.cmd_rt(args, query),
            ["RDS", "RT", "ADD"] => self.cmd_rt_add(args),
            ["RDS", "RT", "DEL"] => self.cmd_rt_del(args),
            ["RDS", "RT", "CLEAR"] => self.cmd_rt_clear(),
            ["RDS", "RT", "LIST"] if query => self.cmd_rt_list(),
            ["RDS", "RT", "PERIOD"] => self.cmd_rt_period(args, query),
            ["RDS", "AF"] => self.cmd_af(args, query),
            ["RDS", "CT"] => self.cmd_ct(args),
            ["AUDIO", "PREEMPH"] => self.cmd_preemph(args, query),
            ["AUDIO", "PILOT"] => self.cmd_level(args, query, "pilot"),
            ["AUDIO", "RDS", "AMP"] => self.cmd_level(args, query, "rds_amp"),
            ["SYST", "LOG", "LEVEL"] => self.cmd_log_level(args, query),
            ["SYST", "FORMAT"] => self.cmd_format(args, query),
            ["SYST", "STATS"] if query => self.cmd_stats(),
            ["SYST", "CONF", "SAVE"] => self.cmd_save(),
            ["SYST", "CONF", "LOAD"] => self.cmd_load(),
            _ => Err(CmdError::unknown(head)),
        }
    }

    // ------------------------------------------------------------------
    // RDS group
    // ------------------------------------------------------------------

    fn cmd_pi(&self, args: &str, query: bool) -> CmdResult {
        if query {
            return Ok(vec![("pi", format!("0x{:04X}", self.rds.pi()))]);
        }
        let raw = args.trim_start_matches("0x").trim_start_matches("0X");
        let pi = u16::from_str_radix(raw, 16)
            .map_err(|_| CmdError::syntax(format!("bad PI value '{args}'")))?;
        self.rds.set_pi(pi);
        Ok(vec![("pi", format!("0x{pi:04X}"))])
    }

    fn cmd_pty(&self, args: &str, query: bool) -> CmdResult {
        if query {
            let code = self.rds.pty();
            let name = pty::find_by_code(code).map_or("?", |e| e.long_name);
            return Ok(vec![("pty", code.to_string()), ("name", name.to_string())]);
        }
        let code = if let Ok(n) = args.parse::<u8>() {
            n
        } else {
            pty::find_by_name(args)
                .ok_or_else(|| CmdError::range(format!("unknown PTY '{args}'")))?
                .code
        };
        self.rds.set_pty(code)?;
        Ok(vec![("pty", code.to_string())])
    }

    fn cmd_flag(&self, args: &str, query: bool, key: &'static str) -> CmdResult {
        let current = match key {
            "tp" => self.rds.tp(),
            _ => self.rds.ta(),
        };
        if query {
            return Ok(vec![(key, u8::from(current).to_string())]);
        }
        let value = parse_bool(args)?;
        match key {
            "tp" => self.rds.set_tp(value),
            _ => self.rds.set_ta(value),
        }
        Ok(vec![(key, u8::from(value).to_string())])
    }

    fn cmd_ms(&self, args: &str, query: bool) -> CmdResult {
        if query {
            let v = if self.rds.ms_music() { "M" } else { "S" };
            return Ok(vec![("ms", v.to_string())]);
        }
        let music = match args.to_ascii_uppercase().as_str() {
            "M" => true,
            "S" => false,
            _ => return Err(CmdError::syntax("MS expects M or S")),
        };
        self.rds.set_ms(music);
        Ok(vec![("ms", if music { "M" } else { "S" }.to_string())])
    }

    fn cmd_ps(&self, args: &str, query: bool) -> CmdResult {
        if query {
            return Ok(vec![("ps", self.rds.ps_string())]);
        }
        self.rds.set_ps(args)?;
        Ok(vec![("ps", args.to_string())])
    }

    fn cmd_rt(&self, args: &str, query: bool) -> CmdResult {
        if query {
            return Ok(vec![
                ("rt", self.rds.rt_string()),
                ("ab", u8::from(self.rds.rt_ab()).to_string()),
            ]);
        }
        self.rds.set_rt(args)?;
        Ok(vec![("rt", args.to_string())])
    }

    fn cmd_rt_add(&self, args: &str) -> CmdResult {
        self.rds.rt_list_add(args)?;
        Ok(vec![("count", self.rds.rt_list_len().to_string())])
    }

    fn cmd_rt_del(&self, args: &str) -> CmdResult {
        let index: usize = args
            .parse()
            .map_err(|_| CmdError::syntax(format!("bad index '{args}'")))?;
        self.rds.rt_list_del(index)?;
        Ok(vec![("count", self.rds.rt_list_len().to_string())])
    }

    fn cmd_rt_clear(&self) -> CmdResult {
        self.rds.rt_list_clear();
        Ok(vec![("count", "0".to_string())])
    }

    fn cmd_rt_list(&self) -> CmdResult {
        let list = self.rds.rt_list();
        Ok(vec![
            ("count", list.len().to_string()),
            ("list", list.join("|")),
        ])
    }

    fn cmd_rt_period(&self, args: &str, query: bool) -> CmdResult {
        if query {
            return Ok(vec![("period", self.rds.rt_period().to_string())]);
        }
        let seconds: u32 = args
            .parse()
            .map_err(|_| CmdError::syntax(format!("bad period '{args}'")))?;
        self.rds.set_rt_period(seconds);
        Ok(vec![("period", seconds.to_string())])
    }

    fn cmd_af(&self, args: &str, query: bool) -> CmdResult {
        if query {
            let list: Vec<String> = self
                .rds
                .af_mhz()
                .iter()
                .map(|f| format!("{f:.1}"))
                .collect();
            return Ok(vec![
                ("count", list.len().to_string()),
                ("af", list.join(",")),
            ]);
        }
        let mut freqs = Vec::new();
        for token in args.split_whitespace() {
            let f: f32 = token
                .parse()
                .map_err(|_| CmdError::syntax(format!("bad frequency '{token}'")))?;
            freqs.push(f);
        }
        self.rds.set_af_mhz(&freqs)?;
        Ok(vec![("count", freqs.len().to_string())])
    }

    /// `RDS:CT <YYYY-MM-DD hh:mm ±hh:mm>`, local time plus UTC offset.
    fn cmd_ct(&self, args: &str) -> CmdResult {
        let parts: Vec<&str> = args.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(CmdError::syntax("CT expects <YYYY-MM-DD hh:mm +hh:mm>"));
        }
        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d")
            .map_err(|_| CmdError::syntax(format!("bad date '{}'", parts[0])))?;
        let time = NaiveTime::parse_from_str(parts[1], "%H:%M")
            .map_err(|_| CmdError::syntax(format!("bad time '{}'", parts[1])))?;
        let offset_half_hours = parse_utc_offset(parts[2])?;
        self.rds.set_clock(
            date.year(),
            date.month(),
            date.day(),
            time.hour() as u8,
            time.minute() as u8,
            offset_half_hours,
        )?;
        Ok(vec![
            ("mjd", self.rds.snapshot().ct.mjd.to_string()),
            ("offset_hh", offset_half_hours.to_string()),
        ])
    }

    // ------------------------------------------------------------------
    // AUDIO group
    // ------------------------------------------------------------------

    fn cmd_preemph(&self, args: &str, query: bool) -> CmdResult {
        if query {
            return Ok(vec![("preemph", self.params.preemphasis().as_str().to_string())]);
        }
        let mode = PreemphasisMode::parse(args)
            .ok_or_else(|| CmdError::range(format!("PREEMPH expects 50US|75US|OFF, got '{args}'")))?;
        self.params.set_preemphasis(mode);
        Ok(vec![("preemph", mode.as_str().to_string())])
    }

    fn cmd_level(&self, args: &str, query: bool, key: &'static str) -> CmdResult {
        let current = match key {
            "pilot" => self.params.pilot_amp(),
            _ => self.params.rds_amp(),
        };
        if query {
            return Ok(vec![(key, format!("{current:.3}"))]);
        }
        let value: f32 = args
            .parse()
            .map_err(|_| CmdError::syntax(format!("bad level '{args}'")))?;
        if !(0.0..=0.2).contains(&value) {
            return Err(CmdError::range(format!("{key} must be within 0..0.2")));
        }
        match key {
            "pilot" => self.params.set_pilot_amp(value),
            _ => self.params.set_rds_amp(value),
        }
        Ok(vec![(key, format!("{value:.3}"))])
    }

    // ------------------------------------------------------------------
    // SYST group
    // ------------------------------------------------------------------

    fn cmd_log_level(&self, args: &str, query: bool) -> CmdResult {
        if query {
            let level = self
                .log_control
                .level()
                .map_or("OFF".to_string(), |l| l.to_string().to_ascii_uppercase());
            return Ok(vec![("level", level)]);
        }
        match args.to_ascii_uppercase().as_str() {
            "OFF" => self.log_control.set_off(),
            "ERROR" => self.log_control.set_level(log::Level::Error),
            "WARN" => self.log_control.set_level(log::Level::Warn),
            "INFO" => self.log_control.set_level(log::Level::Info),
            "DEBUG" => self.log_control.set_level(log::Level::Debug),
            other => {
                return Err(CmdError::range(format!("unknown log level '{other}'")));
            }
        }
        Ok(vec![("level", args.to_ascii_uppercase())])
    }

    fn cmd_format(&mut self, args: &str, query: bool) -> CmdResult {
        if query {
            let v = match self.format {
                ResponseFormat::Text => "TEXT",
                ResponseFormat::Json => "JSON",
            };
            return Ok(vec![("format", v.to_string())]);
        }
        self.format = match args.to_ascii_uppercase().as_str() {
            "TEXT" => ResponseFormat::Text,
            "JSON" => ResponseFormat::Json,
            other => return Err(CmdError::range(format!("unknown format '{other}'"))),
        };
        Ok(vec![("format", args.to_ascii_uppercase())])
    }

    fn cmd_stats(&self) -> CmdResult {
        let snap = self.stats_mail.latest().ok_or(CmdError {
            code: "NODATA",
            message: "no stats snapshot yet".to_string(),
        })?;
        Ok(vec![
            ("cpu", format!("{:.1}", snap.cpu_usage)),
            ("headroom", format!("{:.1}", snap.cpu_headroom)),
            ("total_us", snap.total_us_cur.to_string()),
            ("total_us_max", snap.total_us_max.to_string()),
            ("loops", snap.loops_completed.to_string()),
            ("errors", snap.errors.to_string()),
            ("underruns", snap.underruns.to_string()),
            ("uptime_s", snap.uptime_s.to_string()),
            ("log_dropped", snap.log_dropped.to_string()),
            ("bit_overflow", snap.bit_overflow.to_string()),
        ])
    }

    fn cmd_save(&self) -> CmdResult {
        let cfg = PersistedConfig::capture(&self.rds, &self.params);
        cfg.save(&self.persist_path)?;
        Ok(vec![("file", self.persist_path.display().to_string())])
    }

    fn cmd_load(&self) -> CmdResult {
        let cfg = PersistedConfig::load(&self.persist_path)?;
        cfg.apply(&self.rds, &self.params)?;
        Ok(vec![("file", self.persist_path.display().to_string())])
    }
}

fn parse_bool(args: &str) -> Result<bool, CmdError> {
    match args {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(CmdError::syntax(format!("expected 0 or 1, got '{args}'"))),
    }
}

/// Parse `±hh:mm` into signed half-hour steps.
fn parse_utc_offset(s: &str) -> Result<i8, CmdError> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1i32, &s[1..]),
        Some(b'-') => (-1i32, &s[1..]),
        _ => return Err(CmdError::syntax(format!("offset '{s}' must start with + or -"))),
    };
    let (hh, mm) = rest
        .split_once(':')
        .ok_or_else(|| CmdError::syntax(format!("bad offset '{s}'")))?;
    let hours: i32 = hh
        .parse()
        .map_err(|_| CmdError::syntax(format!("bad offset hours '{hh}'")))?;
    let minutes: i32 = mm
        .parse()
        .map_err(|_| CmdError::syntax(format!("bad offset minutes '{mm}'")))?;
    if !(0..=15).contains(&hours) || (minutes != 0 && minutes != 30) {
        return Err(CmdError::range(format!("offset '{s}' out of range")));
    }
    let half = sign * (hours * 2 + minutes / 30);
    Ok(half as i8)
}

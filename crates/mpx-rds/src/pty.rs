//! Program Type (PTY) code mapping
//!
//! RBDS program-type table shared by the console (long names) and any
//! display surface (short labels). Codes without an entry are still legal
//! on air; they just have no name on the control surface.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtyEntry {
    pub code: u8,
    /// Control-surface name
    pub long_name: &'static str,
    /// Display label
    pub short_label: &'static str,
}

pub const PTY_MAP: &[PtyEntry] = &[
    PtyEntry { code: 0, long_name: "NONE", short_label: "NONE" },
    PtyEntry { code: 1, long_name: "NEWS", short_label: "NEWS" },
    PtyEntry { code: 2, long_name: "INFORMATION", short_label: "INFO" },
    PtyEntry { code: 3, long_name: "SPORT", short_label: "SPORT" },
    PtyEntry { code: 4, long_name: "TALK", short_label: "TALK" },
    PtyEntry { code: 5, long_name: "ROCK", short_label: "ROCK" },
    PtyEntry { code: 6, long_name: "CLASSIC_ROCK", short_label: "CROCK" },
    PtyEntry { code: 7, long_name: "ADULT_HITS", short_label: "HITS" },
    PtyEntry { code: 8, long_name: "SOFT_ROCK", short_label: "SROCK" },
    PtyEntry { code: 10, long_name: "TOP_40", short_label: "TOP40" },
    PtyEntry { code: 11, long_name: "COUNTRY", short_label: "CNTRY" },
    PtyEntry { code: 13, long_name: "OLDIES", short_label: "OLDIES" },
    PtyEntry { code: 14, long_name: "SOFT", short_label: "SOFT" },
    PtyEntry { code: 15, long_name: "JAZZ", short_label: "JAZZ" },
    PtyEntry { code: 16, long_name: "CLASSICAL", short_label: "CLASS" },
    PtyEntry { code: 17, long_name: "RNB", short_label: "RNB" },
    PtyEntry { code: 18, long_name: "SOFT_RNB", short_label: "SRNB" },
    PtyEntry { code: 19, long_name: "LANGUAGE", short_label: "LANG" },
    PtyEntry { code: 20, long_name: "RELIGIOUS_MUSIC", short_label: "RELM" },
    PtyEntry { code: 21, long_name: "RELIGIOUS_TALK", short_label: "RELT" },
    PtyEntry { code: 22, long_name: "PERSONALITY", short_label: "PERS" },
    PtyEntry { code: 24, long_name: "PUBLIC", short_label: "PUBLIC" },
    PtyEntry { code: 27, long_name: "COLLEGE", short_label: "COLL" },
];

pub fn find_by_code(code: u8) -> Option<&'static PtyEntry> {
    PTY_MAP.iter().find(|e| e.code == code)
}

pub fn find_by_name(name: &str) -> Option<&'static PtyEntry> {
    PTY_MAP.iter().find(|e| e.long_name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_code_and_name() {
        assert_eq!(find_by_code(15).unwrap().long_name, "JAZZ");
        assert_eq!(find_by_name("jazz").unwrap().code, 15);
        assert_eq!(find_by_name("Classic_Rock").unwrap().code, 6);
        assert!(find_by_code(12).is_none());
        assert!(find_by_name("POLKA").is_none());
    }

    #[test]
    fn test_codes_within_field_width() {
        for entry in PTY_MAP {
            assert!(entry.code < 32, "PTY is a 5-bit field");
        }
    }
}

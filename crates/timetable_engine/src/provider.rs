use std::collections::HashMap;

use chrono::NaiveTime;

use crate::cipher::{AesEcbHexCipher, CredentialCipher};

/// A supported institution portal: fixed base address, credential cipher,
/// and period-code time table. Resolved once at startup by id; no runtime
/// reflection.
pub struct Provider {
    pub id: &'static str,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub cipher: &'static dyn CredentialCipher,
    class_times: &'static [(&'static str, &'static str, &'static str)],
}

/// GDUT teaching-affairs portal class periods (jxfw.gdut.edu.cn).
static GDUT_CLASS_TIMES: &[(&str, &str, &str)] = &[
    ("01", "08:30", "09:15"),
    ("02", "09:20", "10:05"),
    ("03", "10:25", "11:10"),
    ("04", "11:15", "12:00"),
    ("05", "13:50", "14:35"),
    ("06", "14:40", "15:25"),
    ("07", "15:30", "16:15"),
    ("08", "16:30", "17:15"),
    ("09", "17:20", "18:05"),
    ("10", "18:30", "20:15"),
    ("11", "20:20", "21:05"),
];

static PROVIDERS: &[Provider] = &[Provider {
    id: "gdut",
    display_name: "广东工业大学",
    base_url: "https://jxfw.gdut.edu.cn",
    cipher: &AesEcbHexCipher,
    class_times: GDUT_CLASS_TIMES,
}];

pub fn find_provider(id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

pub fn provider_ids() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.id).collect()
}

impl Provider {
    /// Period code -> (start, end) wall-clock times for the exporter.
    pub fn time_table(&self) -> HashMap<String, (NaiveTime, NaiveTime)> {
        let mut table = HashMap::new();
        for (code, start, end) in self.class_times {
            let (Ok(start), Ok(end)) = (
                NaiveTime::parse_from_str(start, "%H:%M"),
                NaiveTime::parse_from_str(end, "%H:%M"),
            ) else {
                continue;
            };
            table.insert((*code).to_string(), (start, end));
        }
        table
    }
}

//! Configuration access port trait.

use crate::domain::session::hm_to_min;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Non-empty trimmed string value.
    fn get_nonempty(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Time of day as `HH:MM`, `HHMM` or plain minutes since midnight.
    /// `None` when present but unparseable; `Some(default)` when absent.
    fn get_time_of_day(&self, section: &str, key: &str, default: u32) -> Option<u32> {
        match self.get_nonempty(section, key) {
            None => Some(default),
            Some(v) if v.contains(':') || v.len() == 4 => hm_to_min(&v),
            Some(v) => v.parse().ok(),
        }
    }
}

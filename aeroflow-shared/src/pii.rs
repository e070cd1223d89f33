use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for passenger PII (passport numbers, email addresses).
///
/// `Debug` and `Display` only reveal the last two characters so the value can
/// be correlated in logs without leaking it. Serialization writes the real
/// value, since API responses and outbound notifications need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    fn redacted(&self) -> String {
        let raw = self.0.as_ref();
        let shown = if raw.chars().count() > 4 { 2 } else { 0 };
        let visible: String = raw
            .chars()
            .rev()
            .take(shown)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let hidden = raw.chars().count().saturating_sub(shown).max(4);
        format!("{}{}", "*".repeat(hidden), visible)
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

//! Serde helper for patch fields that tell "absent" apart from `null`

use serde::{Deserialize, Deserializer};

/// `deserialize_with` target for `Option<Option<T>>` patch fields.
///
/// Paired with `#[serde(default)]`: a missing key stays `None`, `null`
/// becomes `Some(None)` (clear the column) and a value becomes `Some(Some(v))`.
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

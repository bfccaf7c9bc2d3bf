//! Serde adapters for the field encodings older daemons wrote.
//!
//! Records persisted by earlier versions contain `null` wherever a list or
//! map was empty, the zero time `0001-01-01T00:00:00Z` wherever a timestamp
//! was unset, and presence-only sets encoded as maps to `{}`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, IgnoredAny};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Deserializes `null` as the type's default value.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Used with `skip_serializing_if` for optional summary fields.
pub(crate) fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Map whose values may individually be `null`, read back as empty values.
pub(crate) mod nullable_values {
    use super::{BTreeMap, Deserialize, Deserializer};

    pub(crate) fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Ord + Deserialize<'de>,
        V: Default + Deserialize<'de>,
    {
        let raw = Option::<BTreeMap<K, Option<V>>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect())
    }
}

/// A set stored on the wire as a map from member to an empty object.
///
/// The values carry no information; anything found there on read is ignored.
pub(crate) mod marker_set {
    use super::{
        BTreeMap, BTreeSet, Deserialize, Deserializer, IgnoredAny, Serialize, SerializeMap,
        Serializer,
    };

    #[derive(Serialize)]
    struct Marker {}

    pub(crate) fn serialize<S, T>(set: &BTreeSet<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut map = serializer.serialize_map(Some(set.len()))?;
        for member in set {
            map.serialize_entry(member, &Marker {})?;
        }
        map.end()
    }

    pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Ord + Deserialize<'de>,
    {
        let raw = Option::<BTreeMap<T, IgnoredAny>>::deserialize(deserializer)?;
        Ok(raw.map(|m| m.into_keys().collect()).unwrap_or_default())
    }
}

/// Optional timestamps encoded as RFC 3339, with the zero time meaning unset.
pub(crate) mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, SecondsFormat, Serializer, Utc, de};

    pub(crate) const ZERO_TIME: &str = "0001-01-01T00:00:00Z";
    const ZERO_UNIX_SECONDS: i64 = -62_135_596_800;

    #[allow(clippy::ref_option)]
    pub(crate) fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(ZERO_TIME),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let at = DateTime::parse_from_rfc3339(&raw)
            .map_err(de::Error::custom)?
            .with_timezone(&Utc);
        let is_zero = at.timestamp() == ZERO_UNIX_SECONDS && at.timestamp_subsec_nanos() == 0;
        Ok((!is_zero).then_some(at))
    }
}

//! Closed status enums mirrored from the backend.
//!
//! Every enum carries an `Unknown` fallback: a value the client does not
//! recognise (or a missing/null one) decodes to `Unknown` instead of failing
//! the whole response.

use std::fmt;
use std::str::FromStr;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub enum $name {
            $($variant,)+
            #[default]
            Unknown,
        }

        impl $name {
            /// Every recognised value, in declaration order
            pub const KNOWN: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown => "unknown",
                }
            }

            /// Lenient decode used for wire values
            pub fn from_wire(value: &str) -> Self {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($wire => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Unknown)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        /// Strict parse for operator input; unrecognised values are rejected.
        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match Self::from_wire(s) {
                    Self::Unknown => Err(format!(
                        "invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        s,
                        [$($wire),+].join(", ")
                    )),
                    value => Ok(value),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(LenientVisitor(Self::from_wire))
            }
        }
    };
}

/// Accepts any JSON scalar; only strings can map to a known variant.
struct LenientVisitor<T>(fn(&str) -> T);

impl<'de, T: Default> serde::de::Visitor<'de> for LenientVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a status string")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<T, E> {
        Ok((self.0)(v))
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_bool<E: serde::de::Error>(self, _: bool) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_i64<E: serde::de::Error>(self, _: i64) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_u64<E: serde::de::Error>(self, _: u64) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_f64<E: serde::de::Error>(self, _: f64) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<T, A::Error> {
        while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
        Ok(T::default())
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
        while map
            .next_entry::<serde::de::IgnoredAny, serde::de::IgnoredAny>()?
            .is_some()
        {}
        Ok(T::default())
    }
}

wire_enum! {
    /// Backup job status
    BackupStatus {
        Completed => "completed",
        InProgress => "in_progress",
        Failed => "failed",
    }
}

wire_enum! {
    /// Backup strategy
    BackupType {
        Full => "full",
        Incremental => "incremental",
        Differential => "differential",
    }
}

wire_enum! {
    /// Schema migration status
    MigrationStatus {
        Pending => "pending",
        Applied => "applied",
        Failed => "failed",
    }
}

wire_enum! {
    /// Tenant lifecycle status
    TenantStatus {
        Active => "active",
        Suspended => "suspended",
        Inactive => "inactive",
    }
}

wire_enum! {
    /// Outcome recorded on an audit log entry
    AuditStatus {
        Success => "success",
        Failure => "failure",
        Warning => "warning",
    }
}

wire_enum! {
    /// Overall health reported by the stats endpoint
    SystemHealth {
        Healthy => "healthy",
        Warning => "warning",
        Critical => "critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognised_status_decodes_as_unknown() {
        let status: BackupStatus = serde_json::from_str("\"exploded\"").unwrap();
        assert_eq!(status, BackupStatus::Unknown);
        assert_eq!(status.to_string(), "unknown");
    }

    #[test]
    fn test_null_and_non_string_statuses_decode_as_unknown() {
        let status: TenantStatus = serde_json::from_str("null").unwrap();
        assert_eq!(status, TenantStatus::Unknown);

        let status: AuditStatus = serde_json::from_str("42").unwrap();
        assert_eq!(status, AuditStatus::Unknown);
    }

    #[test]
    fn test_known_status_is_case_insensitive() {
        let status: BackupStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, BackupStatus::InProgress);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"in_progress\"");
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        assert_eq!("incremental".parse::<BackupType>(), Ok(BackupType::Incremental));
        let err = "weekly".parse::<BackupType>().unwrap_err();
        assert!(err.contains("full, incremental, differential"));
    }

    #[test]
    fn test_known_lists_exclude_unknown() {
        assert_eq!(MigrationStatus::KNOWN.len(), 3);
        assert!(MigrationStatus::KNOWN.iter().all(|s| s.is_known()));
    }
}

//! Identity types for boxes and channels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate common ID type implementations
macro_rules! impl_id_type {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::new(s)
            }
        }
    };
}

/// Unique identifier of a set-top box, e.g. `3C36E4-EOSSTB-003656579806`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl_id_type!(DeviceId);

/// Unique identifier of a linear channel, e.g. `NL_000001_019401`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl_id_type!(ChannelId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_conversions() {
        let id = DeviceId::from("3C36E4-EOSSTB-1");
        assert_eq!(id.as_str(), "3C36E4-EOSSTB-1");
        assert_eq!(id.to_string(), "3C36E4-EOSSTB-1");
        assert_eq!(id, DeviceId::new(String::from("3C36E4-EOSSTB-1")));
    }

    #[test]
    fn test_channel_id_display() {
        assert_eq!(format!("{}", ChannelId::new("NL_1")), "NL_1");
    }
}

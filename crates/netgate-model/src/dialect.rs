//! Configuration dialects
//!
//! A dialect names the syntax family a checker interprets. Host dialects are
//! handled by the pure validator; device dialects (platforms) go through
//! static analysis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration syntax family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Declarative netplan YAML
    Netplan,
    /// Debian `/etc/network/interfaces`
    Interfaces,
    /// Cisco IOS / IOS-XE
    CiscoIos,
    /// Juniper Junos
    Junos,
    /// Arista EOS
    AristaEos,
}

impl Dialect {
    /// All dialects, in declaration order
    pub const ALL: [Dialect; 5] = [
        Dialect::Netplan,
        Dialect::Interfaces,
        Dialect::CiscoIos,
        Dialect::Junos,
        Dialect::AristaEos,
    ];

    /// Canonical name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::Netplan => "netplan",
            Dialect::Interfaces => "interfaces",
            Dialect::CiscoIos => "cisco_ios",
            Dialect::Junos => "junos",
            Dialect::AristaEos => "arista_eos",
        }
    }

    /// Host-level dialect checked by the pure validator
    #[must_use]
    pub const fn is_host(self) -> bool {
        matches!(self, Dialect::Netplan | Dialect::Interfaces)
    }

    /// Device platform, if this is a device dialect
    #[must_use]
    pub const fn platform(self) -> Option<Platform> {
        match self {
            Dialect::CiscoIos => Some(Platform::CiscoIos),
            Dialect::Junos => Some(Platform::Junos),
            Dialect::AristaEos => Some(Platform::AristaEos),
            Dialect::Netplan | Dialect::Interfaces => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "netplan" => Ok(Dialect::Netplan),
            "interfaces" | "debian" => Ok(Dialect::Interfaces),
            "cisco_ios" | "cisco" | "ios" => Ok(Dialect::CiscoIos),
            "junos" | "juniper" => Ok(Dialect::Junos),
            "arista_eos" | "arista" | "eos" => Ok(Dialect::AristaEos),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Device platform accepted by static analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Cisco IOS / IOS-XE
    CiscoIos,
    /// Juniper Junos
    Junos,
    /// Arista EOS
    AristaEos,
}

impl Platform {
    /// Dialect used for snapshots of this platform
    #[must_use]
    pub const fn dialect(self) -> Dialect {
        match self {
            Platform::CiscoIos => Dialect::CiscoIos,
            Platform::Junos => Dialect::Junos,
            Platform::AristaEos => Dialect::AristaEos,
        }
    }

    /// File extension used when staging a config for analysis
    #[must_use]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Platform::Junos => "conf",
            Platform::CiscoIos | Platform::AristaEos => "cfg",
        }
    }

    /// Whether the platform speaks IOS-style syntax
    #[must_use]
    pub const fn is_ios_like(self) -> bool {
        matches!(self, Platform::CiscoIos | Platform::AristaEos)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.dialect(), f)
    }
}

impl FromStr for Platform {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dialect: Dialect = s.parse()?;
        dialect.platform().ok_or_else(|| UnknownDialect(s.to_string()))
    }
}

/// A dialect or platform name that is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect '{0}' (expected one of: netplan, interfaces, cisco_ios, junos, arista_eos)")]
pub struct UnknownDialect(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve() {
        assert_eq!("debian".parse::<Dialect>().unwrap(), Dialect::Interfaces);
        assert_eq!("Cisco".parse::<Dialect>().unwrap(), Dialect::CiscoIos);
        assert_eq!("juniper".parse::<Platform>().unwrap(), Platform::Junos);
    }

    #[test]
    fn host_dialect_is_not_a_platform() {
        assert!(Dialect::Netplan.is_host());
        assert!("netplan".parse::<Platform>().is_err());
    }

    #[test]
    fn unknown_dialect_lists_accepted_values() {
        let err = "yang".parse::<Dialect>().unwrap_err();
        assert!(err.to_string().contains("netplan"));
    }

    #[test]
    fn junos_uses_conf_extension() {
        assert_eq!(Platform::Junos.file_extension(), "conf");
        assert_eq!(Platform::CiscoIos.file_extension(), "cfg");
    }
}

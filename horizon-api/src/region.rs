//! Static per-region deployment settings
//!
//! Each supported operator deployment has its own API gateway, catalog
//! language and sign-in flow. Hardware names for the box platform types
//! are only published for some regions.

/// How a region issues sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Username and password posted to the authorization service
    Password,
    /// Long-lived refresh token exchanged for a session
    RefreshToken,
    /// Browser-style single sign-on; the application must supply an authenticator
    ExternalSso,
}

/// Hardware description for a box platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hardware {
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Settings for one operator deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSettings {
    /// Region code, e.g. `nl` or `be-nl`
    pub code: &'static str,
    /// Base URL of the API gateway
    pub api_url: &'static str,
    /// Catalog language used in metadata lookups
    pub language: &'static str,
    pub auth_flow: AuthFlow,
    platform_types: &'static [(&'static str, Hardware)],
}

const ARRIS_DCX960: Hardware = Hardware { manufacturer: "Arris", model: "DCX960" };
const ARRIS_VIP5002W: Hardware = Hardware { manufacturer: "Arris", model: "VIP5002W" };
const HUMAX_2008C: Hardware = Hardware { manufacturer: "HUMAX", model: "2008C-STB-TN" };

const TELENET_PLATFORMS: &[(&str, Hardware)] = &[
    ("EOS", ARRIS_DCX960),
    ("HORIZON", ARRIS_DCX960),
    ("EOS2", HUMAX_2008C),
];

const REGIONS: &[RegionSettings] = &[
    RegionSettings {
        code: "nl",
        api_url: "https://spark-prod-nl.gnp.cloud.ziggogo.tv",
        language: "nl",
        auth_flow: AuthFlow::Password,
        platform_types: &[("EOS", ARRIS_DCX960), ("APOLLO", ARRIS_VIP5002W)],
    },
    RegionSettings {
        code: "ch",
        api_url: "https://spark-prod-ch.gnp.cloud.sunrisetv.ch",
        language: "de",
        auth_flow: AuthFlow::Password,
        platform_types: &[],
    },
    RegionSettings {
        code: "be-nl",
        api_url: "https://spark-prod-be.gnp.cloud.telenet.tv",
        language: "nl",
        auth_flow: AuthFlow::ExternalSso,
        platform_types: TELENET_PLATFORMS,
    },
    RegionSettings {
        code: "be-nl-preprod",
        api_url: "https://spark-preprod-be.gnp.cloud.telenet.tv",
        language: "nl",
        auth_flow: AuthFlow::ExternalSso,
        platform_types: TELENET_PLATFORMS,
    },
    RegionSettings {
        code: "gb",
        api_url: "https://spark-prod-gb.gnp.cloud.virgintvgo.virginmedia.com",
        language: "en",
        auth_flow: AuthFlow::RefreshToken,
        platform_types: &[],
    },
    RegionSettings {
        code: "ie",
        api_url: "https://spark-prod-ie.gnp.cloud.virginmediatv.ie",
        language: "en",
        auth_flow: AuthFlow::Password,
        platform_types: &[],
    },
    RegionSettings {
        code: "pl",
        api_url: "https://spark-prod-pl.gnp.cloud.upctv.pl",
        language: "pl",
        auth_flow: AuthFlow::Password,
        platform_types: &[("EOS", ARRIS_DCX960), ("APOLLO", ARRIS_VIP5002W)],
    },
];

/// Box platform types the state engine knows how to drive
pub const SUPPORTED_PLATFORMS: &[&str] = &["EOS", "EOS2", "HORIZON", "APOLLO"];

impl RegionSettings {
    /// Look up a region by code
    pub fn lookup(code: &str) -> Option<&'static RegionSettings> {
        REGIONS.iter().find(|region| region.code == code)
    }

    /// All known regions
    pub fn all() -> &'static [RegionSettings] {
        REGIONS
    }

    /// Two-letter country prefix of the region code
    pub fn country_code(&self) -> &'static str {
        self.code.get(..2).unwrap_or(self.code)
    }

    /// Hardware for a platform type, when the region publishes it
    pub fn hardware(&self, platform_type: &str) -> Option<Hardware> {
        self.platform_types
            .iter()
            .find(|(name, _)| *name == platform_type)
            .map(|(_, hardware)| *hardware)
    }

    /// URL of the service discovery document
    pub fn backoffice_url(&self) -> String {
        format!(
            "{}/{}/en/config-service/conf/web/backoffice.json",
            self.api_url,
            self.country_code()
        )
    }
}

/// Whether the state engine supports a box platform type
pub fn is_supported_platform(platform_type: &str) -> bool {
    SUPPORTED_PLATFORMS.contains(&platform_type)
}

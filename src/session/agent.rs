//! User-agent parsing behind a replaceable seam.
//!
//! Session records label devices from the request's `User-Agent` header.
//! The built-in parser covers the common families with substring checks;
//! deployments that want full fidelity can plug a real UA database behind
//! [`AgentParser`] without touching the session code.

/// Family value for anything the parser does not recognize.
pub const OTHER: &str = "Other";

/// OS families treated as desktops by the device fallback. Includes the
/// `Mac OS X` spelling some UA databases report for macOS.
pub const DESKTOP_OS: [&str; 6] = [
    "Windows",
    "macOS",
    "Mac OS X",
    "Linux",
    "Chrome OS",
    "Ubuntu",
];

/// Parsed user-agent families. Unknown fields carry [`OTHER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    /// Browser family, e.g. `Firefox`.
    pub family: String,
    /// OS family, e.g. `Linux`.
    pub os_family: String,
    /// Device family, e.g. `iPhone`. Usually [`OTHER`] for desktops.
    pub device_family: String,
}

impl AgentInfo {
    /// All fields unknown.
    #[must_use]
    pub fn other() -> Self {
        Self {
            family: OTHER.to_owned(),
            os_family: OTHER.to_owned(),
            device_family: OTHER.to_owned(),
        }
    }
}

/// Extracts browser/OS/device families from a raw `User-Agent` value.
pub trait AgentParser: Send + Sync {
    fn parse(&self, user_agent: &str) -> AgentInfo;
}

/// Substring-based parser covering the major browser and OS families.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAgentParser;

impl AgentParser for BuiltinAgentParser {
    fn parse(&self, user_agent: &str) -> AgentInfo {
        if user_agent.is_empty() {
            return AgentInfo::other();
        }

        // Order matters: Edge and Opera embed "Chrome", Chrome embeds
        // "Safari", Android embeds "Linux", iOS embeds "Mac OS X".
        let family = if user_agent.contains("Firefox") {
            "Firefox"
        } else if user_agent.contains("Edg/") {
            "Edge"
        } else if user_agent.contains("OPR/") {
            "Opera"
        } else if user_agent.contains("Chrome") {
            "Chrome"
        } else if user_agent.contains("Safari") {
            "Safari"
        } else if user_agent.contains("curl") {
            "curl"
        } else {
            OTHER
        };

        let os_family = if user_agent.contains("Windows") {
            "Windows"
        } else if user_agent.contains("iPhone")
            || user_agent.contains("iPad")
            || user_agent.contains("iPod")
        {
            "iOS"
        } else if user_agent.contains("Android") {
            "Android"
        } else if user_agent.contains("CrOS") {
            "Chrome OS"
        } else if user_agent.contains("Mac OS X") || user_agent.contains("Macintosh") {
            "macOS"
        } else if user_agent.contains("Ubuntu") {
            "Ubuntu"
        } else if user_agent.contains("Linux") {
            "Linux"
        } else {
            OTHER
        };

        let device_family = if user_agent.contains("iPhone") {
            "iPhone"
        } else if user_agent.contains("iPad") {
            "iPad"
        } else {
            OTHER
        };

        AgentInfo {
            family: family.to_owned(),
            os_family: os_family.to_owned(),
            device_family: device_family.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ua: &str) -> AgentInfo {
        BuiltinAgentParser.parse(ua)
    }

    #[test]
    fn test_firefox_on_linux() {
        let info =
            parse("Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0");
        assert_eq!(info.family, "Firefox");
        assert_eq!(info.os_family, "Linux");
        assert_eq!(info.device_family, OTHER);
    }

    #[test]
    fn test_chrome_on_windows() {
        let info = parse(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        assert_eq!(info.family, "Chrome");
        assert_eq!(info.os_family, "Windows");
    }

    #[test]
    fn test_edge_not_misread_as_chrome() {
        let info = parse(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
        );
        assert_eq!(info.family, "Edge");
    }

    #[test]
    fn test_safari_on_iphone() {
        let info = parse(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(info.family, "Safari");
        assert_eq!(info.os_family, "iOS");
        assert_eq!(info.device_family, "iPhone");
    }

    #[test]
    fn test_android_not_misread_as_linux() {
        let info = parse(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
        );
        assert_eq!(info.os_family, "Android");
    }

    #[test]
    fn test_macos_desktop() {
        let info = parse(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        );
        assert_eq!(info.family, "Safari");
        assert_eq!(info.os_family, "macOS");
    }

    #[test]
    fn test_chromeos() {
        let info = parse(
            "Mozilla/5.0 (X11; CrOS x86_64 14541.0.0) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        assert_eq!(info.os_family, "Chrome OS");
    }

    #[test]
    fn test_curl() {
        let info = parse("curl/8.4.0");
        assert_eq!(info.family, "curl");
        assert_eq!(info.os_family, OTHER);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(parse(""), AgentInfo::other());
        assert_eq!(parse("definitely-not-a-browser"), AgentInfo::other());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Container/codec combination requested for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    /// WebM container, VP9 video
    #[serde(rename = "webm-vp9")]
    WebmVp9,

    /// WebM container, VP8 video
    #[serde(rename = "webm-vp8")]
    WebmVp8,

    /// MP4 container
    #[default]
    #[serde(rename = "mp4")]
    Mp4,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::WebmVp9, Format::WebmVp8, Format::Mp4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::WebmVp9 => "webm-vp9",
            Format::WebmVp8 => "webm-vp8",
            Format::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_string()))
    }
}

/// Recording quality, mapped to a target video bitrate per format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::High, Quality::Medium, Quality::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownQuality(s.to_string()))
    }
}

/// Encoder settings resolved from a (format, quality) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingProfile {
    /// Content type handed to the encoder and stamped on the artifact
    pub mime_type: &'static str,

    /// File extension of the downloaded artifact
    pub extension: &'static str,

    /// Requested video bitrate in bits per second
    pub video_bits_per_second: u32,
}

impl EncodingProfile {
    /// Look up the profile for a (format, quality) pair. The table is total.
    pub fn lookup(format: Format, quality: Quality) -> Self {
        let (mime_type, extension) = match format {
            Format::WebmVp9 => ("video/webm;codecs=vp9", "webm"),
            Format::WebmVp8 => ("video/webm;codecs=vp8", "webm"),
            Format::Mp4 => ("video/mp4", "mp4"),
        };

        let video_bits_per_second = match (format, quality) {
            (Format::WebmVp9 | Format::Mp4, Quality::High) => 8_000_000,
            (Format::WebmVp9 | Format::Mp4, Quality::Medium) => 5_000_000,
            (Format::WebmVp9 | Format::Mp4, Quality::Low) => 2_500_000,
            (Format::WebmVp8, Quality::High) => 6_000_000,
            (Format::WebmVp8, Quality::Medium) => 4_000_000,
            (Format::WebmVp8, Quality::Low) => 2_000_000,
        };

        Self {
            mime_type,
            extension,
            video_bits_per_second,
        }
    }
}

/// Outcome of format negotiation against the encoder's capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedProfile {
    pub requested: Format,
    pub format: Format,
    pub quality: Quality,
    pub profile: EncodingProfile,

    /// False when the last-resort VP8 profile was applied without the
    /// encoder confirming support for it
    pub verified: bool,
}

impl NegotiatedProfile {
    pub fn fell_back(&self) -> bool {
        self.requested != self.format
    }
}

/// Resolve the profile to record with.
///
/// Fallback order: MP4 -> VP9 -> VP8 -> VP8 (unverified). VP9 and VP8
/// requests skip straight to VP8. Quality is never downgraded.
pub fn negotiate<F>(requested: Format, quality: Quality, is_supported: F) -> NegotiatedProfile
where
    F: Fn(&str) -> bool,
{
    let resolve = |format: Format, verified: bool| NegotiatedProfile {
        requested,
        format,
        quality,
        profile: EncodingProfile::lookup(format, quality),
        verified,
    };

    let supports = |format: Format| is_supported(EncodingProfile::lookup(format, quality).mime_type);

    if supports(requested) {
        return resolve(requested, true);
    }
    if requested == Format::Mp4 && supports(Format::WebmVp9) {
        return resolve(Format::WebmVp9, true);
    }
    if supports(Format::WebmVp8) {
        return resolve(Format::WebmVp8, true);
    }
    resolve(Format::WebmVp8, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(supported: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |mime: &str| supported.iter().any(|s| *s == mime)
    }

    #[test]
    fn test_lookup_is_total() {
        for format in Format::ALL {
            for quality in Quality::ALL {
                let profile = EncodingProfile::lookup(format, quality);
                assert!(!profile.mime_type.is_empty());
                assert!(!profile.extension.is_empty());
                assert!(profile.video_bits_per_second > 0);
            }
        }
    }

    #[test]
    fn test_lookup_values() {
        let mp4_high = EncodingProfile::lookup(Format::Mp4, Quality::High);
        assert_eq!(mp4_high.mime_type, "video/mp4");
        assert_eq!(mp4_high.extension, "mp4");
        assert_eq!(mp4_high.video_bits_per_second, 8_000_000);

        let vp8_low = EncodingProfile::lookup(Format::WebmVp8, Quality::Low);
        assert_eq!(vp8_low.mime_type, "video/webm;codecs=vp8");
        assert_eq!(vp8_low.extension, "webm");
        assert_eq!(vp8_low.video_bits_per_second, 2_000_000);

        let vp9_medium = EncodingProfile::lookup(Format::WebmVp9, Quality::Medium);
        assert_eq!(vp9_medium.video_bits_per_second, 5_000_000);
    }

    #[test]
    fn test_negotiate_keeps_supported_format() {
        let negotiated = negotiate(Format::Mp4, Quality::High, |_| true);
        assert_eq!(negotiated.format, Format::Mp4);
        assert!(negotiated.verified);
        assert!(!negotiated.fell_back());
    }

    #[test]
    fn test_negotiate_mp4_falls_back_to_vp9() {
        let negotiated = negotiate(
            Format::Mp4,
            Quality::Medium,
            only(&["video/webm;codecs=vp9", "video/webm;codecs=vp8"]),
        );
        assert_eq!(negotiated.format, Format::WebmVp9);
        assert_eq!(negotiated.profile.video_bits_per_second, 5_000_000);
        assert!(negotiated.fell_back());
    }

    #[test]
    fn test_negotiate_only_vp8_supported() {
        let vp8_only = only(&["video/webm;codecs=vp8"]);
        for requested in Format::ALL {
            let negotiated = negotiate(requested, Quality::High, &vp8_only);
            assert_eq!(negotiated.format, Format::WebmVp8);
            assert!(negotiated.verified);
            assert_eq!(negotiated.quality, Quality::High);
            assert_eq!(negotiated.profile.video_bits_per_second, 6_000_000);
        }
    }

    #[test]
    fn test_negotiate_vp9_skips_to_vp8() {
        // VP9 requests never consider MP4 or re-check VP9
        let negotiated = negotiate(
            Format::WebmVp9,
            Quality::Low,
            only(&["video/mp4", "video/webm;codecs=vp8"]),
        );
        assert_eq!(negotiated.format, Format::WebmVp8);
    }

    #[test]
    fn test_negotiate_last_resort_is_unverified_vp8() {
        for requested in Format::ALL {
            let negotiated = negotiate(requested, Quality::Low, |_| false);
            assert_eq!(negotiated.format, Format::WebmVp8);
            assert!(!negotiated.verified);
            assert_eq!(negotiated.profile.video_bits_per_second, 2_000_000);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("webm-vp9".parse::<Format>().unwrap(), Format::WebmVp9);
        assert_eq!("mp4".parse::<Format>().unwrap(), Format::Mp4);
        assert_eq!("medium".parse::<Quality>().unwrap(), Quality::Medium);
        assert!("avi".parse::<Format>().is_err());
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for format in Format::ALL {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
        for quality in Quality::ALL {
            let json = serde_json::to_string(&quality).unwrap();
            assert_eq!(json, format!("\"{}\"", quality));
        }
    }
}

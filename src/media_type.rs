//! Parsing of versioned vendor media types.
//!
//! Versioned representations are named by media types of the form
//! `application/vnd.<vendor>.<resource>.v<n>+json`. Tokens may also be given
//! as the bare subtype (`vnd.<vendor>.<resource>.v<n>`) or in short form
//! (`<resource>.v<n>`).

use crate::version::VersionDescriptor;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "[a-z0-9][a-z0-9_-]*";
const RESOURCE: &str = "[a-z0-9][a-z0-9_.-]*";

// Subtypes are lowercased before matching
static VENDOR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^vnd\.({VENDOR})\.({RESOURCE}?)\.v([1-9][0-9]*)$"))
        .expect("vendor token pattern is valid")
});

static SHORT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({RESOURCE}?)\.v([1-9][0-9]*)$")).expect("short token pattern is valid")
});

static VENDOR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{VENDOR}$")).expect("vendor name pattern is valid")
});

static RESOURCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{RESOURCE}$")).expect("resource name pattern is valid")
});

static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.v[0-9]+$").expect("version suffix pattern is valid")
});

/// Whether `vendor` can appear as the vendor tree segment of a media type.
pub fn is_valid_vendor(vendor: &str) -> bool {
    VENDOR_NAME.is_match(vendor)
}

/// Whether a media type rendered for `resource` parses back to it.
pub fn is_valid_resource_name(resource: &str) -> bool {
    RESOURCE_NAME.is_match(resource) && !VERSION_SUFFIX.is_match(resource)
}

/// A `(resource, version)` pair parsed from a media type.
///
/// Everything is lowercased, as media types compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    /// Top-level type, absent for bare subtypes and short-form tokens
    pub top_level: Option<String>,
    /// Vendor tree segment, absent for short-form tokens
    pub vendor: Option<String>,
    pub resource: String,
    pub version: u32,
    /// Structured syntax suffix, e.g. `json`
    pub suffix: Option<String>,
}

impl VersionToken {
    /// Parse a media range or token. Returns `None` for anything malformed.
    pub fn parse(input: &str) -> Option<Self> {
        let (top_level, subtype, suffix) = split_media_type(input)?;
        let subtype = subtype.to_ascii_lowercase();
        let top_level = top_level.map(str::to_ascii_lowercase);
        let suffix = suffix.map(str::to_ascii_lowercase);

        if let Some(caps) = VENDOR_TOKEN.captures(&subtype) {
            return Some(Self {
                top_level,
                vendor: Some(caps[1].to_string()),
                resource: caps[2].to_string(),
                version: caps[3].parse().ok()?,
                suffix,
            });
        }

        if subtype.starts_with("vnd.") {
            return None;
        }

        let caps = SHORT_TOKEN.captures(&subtype)?;
        Some(Self {
            top_level,
            vendor: None,
            resource: caps[1].to_string(),
            version: caps[2].parse().ok()?,
            suffix,
        })
    }
}

/// Split a media range into top-level type, subtype and structured-syntax
/// suffix, dropping parameters: `application/vnd.x.y.v1+json; q=0.9` becomes
/// `(Some("application"), "vnd.x.y.v1", Some("json"))`.
fn split_media_type(input: &str) -> Option<(Option<&str>, &str, Option<&str>)> {
    let essence = input.split(';').next()?.trim();
    let (top_level, subtype) = match essence.split_once('/') {
        Some((top_level, subtype)) => (Some(top_level.trim()), subtype.trim()),
        None => (None, essence),
    };
    let (subtype, suffix) = match subtype.split_once('+') {
        Some((subtype, suffix)) => (subtype.trim(), Some(suffix.trim())),
        None => (subtype, None),
    };
    if subtype.is_empty() || subtype.contains('*') {
        return None;
    }
    Some((top_level, subtype, suffix))
}

/// Quality weight of a media range, `1.0` when absent or unparseable.
fn quality(range: &str) -> f32 {
    range
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .map(|q| q.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

/// Split an `Accept` header into media ranges in preference order.
///
/// Ranges are ordered by quality weight, highest first; ranges with equal
/// weight keep the order the client sent them in. `q=0` ranges are dropped.
pub fn parse_accept(header: &str) -> Vec<String> {
    let mut ranges: Vec<(f32, &str)> = header
        .split(',')
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .map(|range| (quality(range), range))
        .filter(|(q, _)| *q > 0.0)
        .collect();

    // sort_by is stable, so equal weights keep client order
    ranges.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranges.into_iter().map(|(_, range)| range.to_string()).collect()
}

/// Renders the canonical media type of a registered version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypeFormat {
    pub top_level: String,
    pub vendor: String,
    /// Structured syntax suffix, e.g. `json`
    pub suffix: Option<String>,
}

impl MediaTypeFormat {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            top_level: "application".to_string(),
            vendor: vendor.into().to_ascii_lowercase(),
            suffix: Some("json".to_string()),
        }
    }

    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix;
        self
    }

    /// Media type for `version` of `resource`.
    pub fn render(&self, resource: &str, version: u32) -> String {
        let mut media_type = format!(
            "{}/vnd.{}.{}.v{}",
            self.top_level, self.vendor, resource, version
        );
        if let Some(suffix) = &self.suffix {
            media_type.push('+');
            media_type.push_str(suffix);
        }
        media_type
    }

    pub fn for_descriptor(&self, descriptor: &VersionDescriptor) -> String {
        self.render(&descriptor.resource, descriptor.version)
    }

    /// Whether a token belongs to our media types: vendor, top-level type
    /// and suffix must match wherever the token names them.
    pub fn accepts(&self, token: &VersionToken) -> bool {
        let vendor = token
            .vendor
            .as_deref()
            .map_or(true, |vendor| vendor == self.vendor);
        let top_level = token
            .top_level
            .as_deref()
            .map_or(true, |top_level| top_level.eq_ignore_ascii_case(&self.top_level));
        let suffix = match (token.suffix.as_deref(), self.suffix.as_deref()) {
            (Some(theirs), Some(ours)) => theirs.eq_ignore_ascii_case(ours),
            (Some(_), None) => false,
            (None, _) => true,
        };
        vendor && top_level && suffix
    }
}

//! Chat reference recognition and normalization.
//!
//! Operators identify a chat in one of six shapes. [`validate`] and
//! [`normalize`] are the raw building blocks; [`ResourceReference::parse`]
//! is what the session uses, since it classifies the raw shape *before*
//! normalizing and so keeps join-chat tokens tagged as invites.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::error::{MAX_REFERENCE_LENGTH, ValidationError};

/// Prefix of Telegram web-client deep links.
pub const WEB_CLIENT_PREFIX: &str = "https://web.telegram.org/k/#";

/// Marker that identifies legacy invite links.
const JOINCHAT_MARKER: &str = "joinchat";

/// Shape patterns in classification order.
///
/// The invite and join-chat shapes must be checked before the generic
/// channel link, which would otherwise never see a `+` or a `/` anyway.
#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Vec<(ReferenceKind, Regex)>> = LazyLock::new(|| {
    [
        (ReferenceKind::InviteLink, r"^https://t\.me/\+\w+$"),
        (ReferenceKind::JoinChatLink, r"^https://t\.me/joinchat/\w+$"),
        (ReferenceKind::ChannelLink, r"^https://t\.me/\w+$"),
        (
            ReferenceKind::WebClientLink,
            r"^https://web\.telegram\.org/k/#-?\d+$",
        ),
        (ReferenceKind::Username, r"^@\w+$"),
        (ReferenceKind::NumericId, r"^-?\d+$"),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        (
            kind,
            Regex::new(pattern).expect("reference regex is valid"), // Static pattern, safe to panic
        )
    })
    .collect()
});

/// Which accepted shape a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `https://t.me/+<hash>`
    InviteLink,
    /// `https://t.me/joinchat/<hash>`
    JoinChatLink,
    /// `https://t.me/<name>`
    ChannelLink,
    /// `https://web.telegram.org/k/#<id>`
    WebClientLink,
    /// `@<name>`
    Username,
    /// `<id>`, optionally negative
    NumericId,
}

impl ReferenceKind {
    /// Stable label used on the wire and in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InviteLink => "invite_link",
            Self::JoinChatLink => "joinchat_link",
            Self::ChannelLink => "channel_link",
            Self::WebClientLink => "web_client_link",
            Self::Username => "username",
            Self::NumericId => "numeric_id",
        }
    }

    /// Returns true for the shapes that must be exchanged as invites.
    #[must_use]
    pub fn is_invite(self) -> bool {
        matches!(self, Self::InviteLink | Self::JoinChatLink)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `raw` is exactly one of the accepted reference shapes.
///
/// No trimming is applied; callers pass already-trimmed input.
///
/// # Examples
///
/// ```
/// use tgmedia_core::parser::validate;
///
/// assert!(validate("@rustlang"));
/// assert!(validate("-1001234567890"));
/// assert!(!validate("https://example.com/rustlang"));
/// ```
#[must_use]
pub fn validate(raw: &str) -> bool {
    classify(raw).is_some()
}

/// Strips web-client and join-chat prefixes, leaving other input untouched.
///
/// - `https://web.telegram.org/k/#-100123` → `-100123`
/// - anything containing `joinchat` → its last `/` segment
///
/// # Examples
///
/// ```
/// use tgmedia_core::parser::normalize;
///
/// assert_eq!(normalize("https://web.telegram.org/k/#-42"), "-42");
/// assert_eq!(normalize("https://t.me/joinchat/AbCd"), "AbCd");
/// assert_eq!(normalize("@rustlang"), "@rustlang");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    if raw.starts_with(WEB_CLIENT_PREFIX) {
        return raw.rsplit('#').next().unwrap_or(raw).to_string();
    }
    if raw.contains(JOINCHAT_MARKER) {
        return raw.rsplit('/').next().unwrap_or(raw).to_string();
    }
    raw.to_string()
}

fn classify(raw: &str) -> Option<ReferenceKind> {
    PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(raw))
        .map(|(kind, _)| *kind)
}

/// A validated, normalized chat reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceReference {
    raw: String,
    value: String,
    kind: ReferenceKind,
}

impl ResourceReference {
    /// Parses operator input into a reference.
    ///
    /// Surrounding whitespace is trimmed. The raw shape is classified first
    /// and the value normalized afterwards:
    ///
    /// | kind | value |
    /// |------|-------|
    /// | invite link | hash after `+` |
    /// | join-chat link | hash after `joinchat/` |
    /// | web-client link | trailing id |
    /// | channel link, username, id | input as typed |
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the input is empty, too long, or
    /// matches none of the accepted shapes.
    #[tracing::instrument(level = "debug", skip(raw), fields(input_len = raw.len()))]
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty());
        }
        if trimmed.chars().count() > MAX_REFERENCE_LENGTH {
            return Err(ValidationError::too_long(trimmed));
        }

        let Some(kind) = classify(trimmed) else {
            debug!(input = %trimmed, "reference matched no accepted shape");
            return Err(ValidationError::unrecognized(trimmed));
        };

        let value = match kind {
            ReferenceKind::InviteLink => trimmed
                .rsplit_once('+')
                .map_or(trimmed, |(_, hash)| hash)
                .to_string(),
            ReferenceKind::JoinChatLink | ReferenceKind::WebClientLink => normalize(trimmed),
            ReferenceKind::ChannelLink | ReferenceKind::Username | ReferenceKind::NumericId => {
                trimmed.to_string()
            }
        };
        trace!(%kind, %value, "reference recognized");

        Ok(Self {
            raw: trimmed.to_string(),
            value,
            kind,
        })
    }

    /// The normalized value handed to the remote service.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The trimmed input as the operator typed it.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The recognized shape.
    #[must_use]
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// The invite hash, for invite and join-chat links.
    #[must_use]
    pub fn invite_token(&self) -> Option<&str> {
        self.kind.is_invite().then_some(self.value.as_str())
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::str::FromStr for ResourceReference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_every_shape() {
        for input in [
            "https://t.me/+AbCdEf123",
            "https://t.me/joinchat/AbCdEf123",
            "https://t.me/rustlang",
            "https://web.telegram.org/k/#-1001234",
            "https://web.telegram.org/k/#777",
            "@rust_lang",
            "123456",
            "-1001234567890",
        ] {
            assert!(validate(input), "should accept {input}");
        }
    }

    #[test]
    fn test_validate_rejects_other_shapes() {
        for input in [
            "",
            "rustlang",
            "http://t.me/rustlang",
            "https://t.me/",
            "https://t.me/a/b",
            "https://t.me/+",
            "https://web.telegram.org/k/#abc",
            "https://web.telegram.org/a/#123",
            "@",
            "@bad name",
            "--5",
            "12a",
            " @padded",
        ] {
            assert!(!validate(input), "should reject {input:?}");
        }
    }

    #[test]
    fn test_normalize_strips_web_client_prefix() {
        assert_eq!(normalize("https://web.telegram.org/k/#-1001234"), "-1001234");
    }

    #[test]
    fn test_normalize_keeps_last_joinchat_segment() {
        assert_eq!(normalize("https://t.me/joinchat/XyZ_9"), "XyZ_9");
    }

    #[test]
    fn test_normalize_passes_other_input_through() {
        for input in ["https://t.me/+hash", "https://t.me/name", "@name", "-5"] {
            assert_eq!(normalize(input), input);
        }
    }

    #[test]
    fn test_validate_after_normalize_for_non_joinchat_shapes() {
        for input in [
            "https://t.me/+AbCdEf123",
            "https://t.me/rustlang",
            "https://web.telegram.org/k/#-1001234",
            "@rust_lang",
            "42",
        ] {
            assert!(validate(&normalize(input)), "round trip failed for {input}");
        }
    }

    #[test]
    fn test_parse_invite_link_keeps_hash() {
        let reference = ResourceReference::parse("https://t.me/+AbC123").unwrap();
        assert_eq!(reference.kind(), ReferenceKind::InviteLink);
        assert_eq!(reference.as_str(), "AbC123");
        assert_eq!(reference.invite_token(), Some("AbC123"));
    }

    #[test]
    fn test_parse_joinchat_link_is_tagged_as_invite() {
        let reference = ResourceReference::parse("https://t.me/joinchat/AbC123").unwrap();
        assert_eq!(reference.kind(), ReferenceKind::JoinChatLink);
        assert_eq!(reference.invite_token(), Some("AbC123"));
        assert_eq!(reference.raw(), "https://t.me/joinchat/AbC123");
    }

    #[test]
    fn test_parse_web_client_link_yields_id() {
        let reference = ResourceReference::parse("https://web.telegram.org/k/#-100999").unwrap();
        assert_eq!(reference.kind(), ReferenceKind::WebClientLink);
        assert_eq!(reference.as_str(), "-100999");
        assert_eq!(reference.invite_token(), None);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let reference = ResourceReference::parse("  @rustlang \n").unwrap();
        assert_eq!(reference.kind(), ReferenceKind::Username);
        assert_eq!(reference.as_str(), "@rustlang");
    }

    #[test]
    fn test_parse_channel_link_passes_through() {
        let reference: ResourceReference = "https://t.me/rustlang".parse().unwrap();
        assert_eq!(reference.kind(), ReferenceKind::ChannelLink);
        assert_eq!(reference.to_string(), "https://t.me/rustlang");
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(matches!(
            ResourceReference::parse("   "),
            Err(ValidationError::Empty { .. })
        ));
        assert!(matches!(
            ResourceReference::parse("not a chat"),
            Err(ValidationError::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_overlong_input() {
        let long = "@".to_string() + &"a".repeat(MAX_REFERENCE_LENGTH);
        assert!(matches!(
            ResourceReference::parse(&long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_reference_kind_labels() {
        assert_eq!(ReferenceKind::JoinChatLink.to_string(), "joinchat_link");
        assert!(ReferenceKind::InviteLink.is_invite());
        assert!(!ReferenceKind::NumericId.is_invite());
    }
}

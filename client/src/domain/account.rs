//! Account identifiers and the validated profile fields keyed by them.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Validation errors raised by account and profile value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    EmptyAccountId,
    InvalidAccountId,
    EmptyDisplayName,
    DisplayNameTooShort { min: usize },
    DisplayNameTooLong { max: usize },
    DisplayNameInvalidCharacters,
    EmptyAvatarRef,
    InvalidAvatarRef,
    UnsupportedAvatarScheme { scheme: String },
    EmptyPatch,
}

impl ProfileValidationError {
    /// Stable field path the failure relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyAccountId | Self::InvalidAccountId => "accountId",
            Self::EmptyDisplayName
            | Self::DisplayNameTooShort { .. }
            | Self::DisplayNameTooLong { .. }
            | Self::DisplayNameInvalidCharacters => "displayName",
            Self::EmptyAvatarRef
            | Self::InvalidAvatarRef
            | Self::UnsupportedAvatarScheme { .. } => "avatarRef",
            Self::EmptyPatch => "patch",
        }
    }

    /// Machine-readable rejection code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyAccountId | Self::EmptyDisplayName | Self::EmptyAvatarRef => "empty",
            Self::InvalidAccountId | Self::InvalidAvatarRef => "invalid",
            Self::DisplayNameTooShort { .. } => "too_short",
            Self::DisplayNameTooLong { .. } => "too_long",
            Self::DisplayNameInvalidCharacters => "invalid_chars",
            Self::UnsupportedAvatarScheme { .. } => "unsupported_scheme",
            Self::EmptyPatch => "no_changes",
        }
    }
}

impl fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAccountId => write!(f, "account id must not be empty"),
            Self::InvalidAccountId => {
                write!(f, "account id must not carry surrounding whitespace")
            }
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooShort { min } => {
                write!(f, "display name must be at least {min} characters")
            }
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::DisplayNameInvalidCharacters => {
                write!(f, "display name must not contain control characters")
            }
            Self::EmptyAvatarRef => write!(f, "avatar reference must not be empty"),
            Self::InvalidAvatarRef => write!(f, "avatar reference must be an absolute URL"),
            Self::UnsupportedAvatarScheme { scheme } => {
                write!(f, "avatar reference scheme `{scheme}` is not http or https")
            }
            Self::EmptyPatch => write!(f, "profile edit must change at least one field"),
        }
    }
}

impl std::error::Error for ProfileValidationError {}

/// Opaque identifier issued by the identity provider for one account.
///
/// The core never interprets the value; it only requires a non-empty string
/// without surrounding whitespace so it can act as a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validate and construct an [`AccountId`].
    ///
    /// # Examples
    /// ```
    /// use horizon_client::domain::AccountId;
    ///
    /// let id = AccountId::new("u42").unwrap();
    /// assert_eq!(id.as_ref(), "u42");
    /// assert!(AccountId::new(" u42").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, ProfileValidationError> {
        Self::from_owned(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    fn from_owned(id: String) -> Result<Self, ProfileValidationError> {
        if id.is_empty() {
            return Err(ProfileValidationError::EmptyAccountId);
        }
        if id.trim() != id {
            return Err(ProfileValidationError::InvalidAccountId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = ProfileValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Minimum allowed length for a display name.
pub const DISPLAY_NAME_MIN: usize = 2;
/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

static DISPLAY_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn display_name_regex() -> &'static Regex {
    DISPLAY_NAME_RE.get_or_init(|| {
        // Length is enforced separately; this only rejects control and format characters.
        Regex::new(r"^[^\p{C}]+$")
            .unwrap_or_else(|error| panic!("display name regex failed to compile: {error}"))
    })
}

/// Human readable name shown on the account page.
///
/// Stored trimmed. Punctuation is allowed so names such as `Ana M.` survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`].
    pub fn new(display_name: impl Into<String>) -> Result<Self, ProfileValidationError> {
        Self::from_owned(display_name.into())
    }

    fn from_owned(display_name: String) -> Result<Self, ProfileValidationError> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(ProfileValidationError::EmptyDisplayName);
        }

        let length = trimmed.chars().count();
        if length < DISPLAY_NAME_MIN {
            return Err(ProfileValidationError::DisplayNameTooShort {
                min: DISPLAY_NAME_MIN,
            });
        }
        if length > DISPLAY_NAME_MAX {
            return Err(ProfileValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }

        if !display_name_regex().is_match(trimmed) {
            return Err(ProfileValidationError::DisplayNameInvalidCharacters);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Uppercased first character, used for avatar placeholders.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        self.0.chars().next().and_then(|c| c.to_uppercase().next())
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ProfileValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Reference to the profile picture, an absolute `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AvatarRef(String);

impl AvatarRef {
    /// Validate and construct an [`AvatarRef`], normalising the URL.
    ///
    /// # Examples
    /// ```
    /// use horizon_client::domain::AvatarRef;
    ///
    /// let avatar = AvatarRef::new("https://cdn.example.org/a.png").unwrap();
    /// assert_eq!(avatar.as_ref(), "https://cdn.example.org/a.png");
    /// assert!(AvatarRef::new("ftp://cdn.example.org/a.png").is_err());
    /// ```
    pub fn new(avatar_ref: impl Into<String>) -> Result<Self, ProfileValidationError> {
        Self::from_owned(avatar_ref.into())
    }

    fn from_owned(avatar_ref: String) -> Result<Self, ProfileValidationError> {
        let trimmed = avatar_ref.trim();
        if trimmed.is_empty() {
            return Err(ProfileValidationError::EmptyAvatarRef);
        }
        let url = Url::parse(trimmed).map_err(|_| ProfileValidationError::InvalidAvatarRef)?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url.into())),
            other => Err(ProfileValidationError::UnsupportedAvatarScheme {
                scheme: other.to_owned(),
            }),
        }
    }
}

impl AsRef<str> for AvatarRef {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AvatarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<AvatarRef> for String {
    fn from(value: AvatarRef) -> Self {
        value.0
    }
}

impl TryFrom<String> for AvatarRef {
    type Error = ProfileValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", ProfileValidationError::EmptyAccountId)]
    #[case(" u1", ProfileValidationError::InvalidAccountId)]
    #[case("u1\n", ProfileValidationError::InvalidAccountId)]
    fn rejects_malformed_account_ids(
        #[case] raw: &str,
        #[case] expected: ProfileValidationError,
    ) {
        assert_eq!(AccountId::new(raw), Err(expected));
    }

    #[rstest]
    fn random_account_ids_differ() {
        assert_ne!(AccountId::random(), AccountId::random());
    }

    #[rstest]
    #[case("", ProfileValidationError::EmptyDisplayName)]
    #[case("   ", ProfileValidationError::EmptyDisplayName)]
    #[case("A", ProfileValidationError::DisplayNameTooShort { min: DISPLAY_NAME_MIN })]
    #[case(&"a".repeat(DISPLAY_NAME_MAX + 1), ProfileValidationError::DisplayNameTooLong { max: DISPLAY_NAME_MAX })]
    #[case("Ana\u{0007}", ProfileValidationError::DisplayNameInvalidCharacters)]
    fn rejects_invalid_display_names(
        #[case] raw: &str,
        #[case] expected: ProfileValidationError,
    ) {
        assert_eq!(DisplayName::new(raw), Err(expected));
    }

    #[rstest]
    #[case("Ana M.", "Ana M.")]
    #[case("  Zoë  ", "Zoë")]
    #[case("李娜", "李娜")]
    fn accepts_and_trims_display_names(#[case] raw: &str, #[case] stored: &str) {
        let name = DisplayName::new(raw).expect("valid display name");
        assert_eq!(name.as_ref(), stored);
    }

    #[rstest]
    fn display_name_initial_is_uppercase() {
        let name = DisplayName::new("ana").expect("valid display name");
        assert_eq!(name.initial(), Some('A'));
    }

    #[rstest]
    #[case("", ProfileValidationError::EmptyAvatarRef)]
    #[case("not a url", ProfileValidationError::InvalidAvatarRef)]
    #[case("data:image/png;base64,AAAA", ProfileValidationError::UnsupportedAvatarScheme { scheme: "data".to_owned() })]
    fn rejects_invalid_avatar_refs(#[case] raw: &str, #[case] expected: ProfileValidationError) {
        assert_eq!(AvatarRef::new(raw), Err(expected));
    }

    #[rstest]
    fn deserialising_rejects_invalid_display_names() {
        let result: Result<DisplayName, _> = serde_json::from_value(json!("A"));
        assert!(result.is_err());
    }

    #[rstest]
    fn validation_errors_expose_field_and_code() {
        let err = ProfileValidationError::DisplayNameTooShort {
            min: DISPLAY_NAME_MIN,
        };
        assert_eq!(err.field(), "displayName");
        assert_eq!(err.code(), "too_short");
        assert_eq!(err.to_string(), "display name must be at least 2 characters");
    }
}

//! Sign-in credentials and sign-up registrations.
//!
//! Form input is validated here before anything reaches the identity
//! provider. Passwords are held in zeroizing buffers and never printed.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use zeroize::Zeroizing;

use super::account::{DisplayName, ProfileValidationError};
use super::Error;
use super::session::SeedMetadata;

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 6;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Reasons sign-in or sign-up input is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Email is not shaped like `name@domain.tld`.
    InvalidEmail,
    /// Password is shorter than [`PASSWORD_MIN`].
    PasswordTooShort { min: usize },
    /// Password confirmation differs from the password.
    PasswordMismatch,
    /// The full name would not be a valid display name.
    FullName(ProfileValidationError),
}

impl CredentialsValidationError {
    /// Form field the failure relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::PasswordTooShort { .. } => "password",
            Self::PasswordMismatch => "confirmPassword",
            Self::FullName(_) => "fullName",
        }
    }
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "please enter a valid email"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::PasswordMismatch => write!(f, "passwords don't match"),
            Self::FullName(err) => write!(f, "full name is invalid: {err}"),
        }
    }
}

impl std::error::Error for CredentialsValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FullName(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CredentialsValidationError> for Error {
    fn from(value: CredentialsValidationError) -> Self {
        Self::validation_failed(value.to_string()).with_details(json!({ "field": value.field() }))
    }
}

fn normalise_email(email: &str) -> Result<String, CredentialsValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(CredentialsValidationError::EmptyEmail);
    }
    if !email_regex().is_match(trimmed) {
        return Err(CredentialsValidationError::InvalidEmail);
    }
    Ok(trimmed.to_owned())
}

fn checked_password(password: &str) -> Result<Zeroizing<String>, CredentialsValidationError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(CredentialsValidationError::PasswordTooShort { min: PASSWORD_MIN });
    }
    Ok(Zeroizing::new(password.to_owned()))
}

/// Validated email/password pair for password sign-in.
///
/// ## Invariants
/// - `email` is trimmed and syntactically valid.
/// - `password` has at least [`PASSWORD_MIN`] characters and keeps any
///   caller-provided whitespace.
///
/// # Examples
/// ```
/// use horizon_client::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ana@example.org ", "secret1").unwrap();
/// assert_eq!(creds.email(), "ana@example.org");
/// assert_eq!(creds.password(), "secret1");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw form inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        Ok(Self {
            email: normalise_email(email)?,
            password: checked_password(password)?,
        })
    }

    /// Email used to look up the account.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated sign-up form.
///
/// # Examples
/// ```
/// use horizon_client::domain::{CredentialsValidationError, Registration};
///
/// let err = Registration::try_from_parts("Ana", "ana@example.org", "secret1", "secret2")
///     .unwrap_err();
/// assert_eq!(err, CredentialsValidationError::PasswordMismatch);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    full_name: DisplayName,
    credentials: LoginCredentials,
}

impl Registration {
    /// Construct a registration from raw form inputs.
    pub fn try_from_parts(
        full_name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Self, CredentialsValidationError> {
        let full_name = DisplayName::new(full_name).map_err(CredentialsValidationError::FullName)?;
        let credentials = LoginCredentials::try_from_parts(email, password)?;
        if password != confirm_password {
            return Err(CredentialsValidationError::PasswordMismatch);
        }
        Ok(Self {
            full_name,
            credentials,
        })
    }

    /// Name the new profile should be seeded with.
    #[must_use]
    pub fn full_name(&self) -> &DisplayName {
        &self.full_name
    }

    /// Credentials for the new account.
    #[must_use]
    pub fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }

    /// Sign-up metadata forwarded to the provider's account-created event.
    #[must_use]
    pub fn seed_metadata(&self) -> SeedMetadata {
        SeedMetadata::with_display_name(self.full_name.as_ref())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("credentials", &self.credentials)
            .finish()
    }
}

//! Profile record, eco points, and the edit patch applied to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::{AccountId, AvatarRef, DisplayName, ProfileValidationError};

/// Points needed to climb one eco level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// Non-negative eco points balance.
///
/// The core offers no subtraction path; balances only grow.
///
/// # Examples
/// ```
/// use horizon_client::domain::EcoPoints;
///
/// let points = EcoPoints::new(250);
/// assert_eq!(points.level(), 3);
/// assert_eq!(points.points_to_next_level(), 50);
/// assert_eq!(points.level_progress_percent(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EcoPoints(u32);

impl EcoPoints {
    /// Zero balance assigned to every new profile.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw balance.
    #[must_use]
    pub const fn new(points: u32) -> Self {
        Self(points)
    }

    /// Raw balance.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Current eco level, starting at 1.
    #[must_use]
    pub const fn level(self) -> u32 {
        self.0.div_euclid(POINTS_PER_LEVEL).saturating_add(1)
    }

    /// Points still missing before the next level.
    #[must_use]
    pub const fn points_to_next_level(self) -> u32 {
        self.level()
            .saturating_mul(POINTS_PER_LEVEL)
            .saturating_sub(self.0)
    }

    /// Progress through the current level, from 0 to 99.
    #[must_use]
    pub const fn level_progress_percent(self) -> u32 {
        self.0.rem_euclid(POINTS_PER_LEVEL)
    }
}

/// Durable per-account profile record.
///
/// ## Invariants
/// - Exactly one record exists per `account_id`; the profile store enforces
///   this on insert.
/// - `updated_at` never moves backwards for a given record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Primary key, matching the session's account.
    pub account_id: AccountId,
    /// Name shown on the account page.
    pub display_name: Option<DisplayName>,
    /// Profile picture reference.
    pub avatar_ref: Option<AvatarRef>,
    /// Eco points balance.
    pub eco_points: EcoPoints,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile for a newly created account with a zero balance.
    #[must_use]
    pub fn provisioned(
        account_id: AccountId,
        display_name: Option<DisplayName>,
        avatar_ref: Option<AvatarRef>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            display_name,
            avatar_ref,
            eco_points: EcoPoints::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this profile with `changes` applied and `updated_at` refreshed.
    #[must_use]
    pub fn with_changes(&self, changes: &ProfileChanges, updated_at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if let Some(display_name) = &changes.display_name {
            next.display_name = Some(display_name.clone());
        }
        if let Some(avatar_ref) = &changes.avatar_ref {
            next.avatar_ref = Some(avatar_ref.clone());
        }
        next.updated_at = updated_at;
        next
    }
}

/// Raw edit submitted by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    /// New display name, if it should change.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New avatar URL, if it should change.
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

impl ProfilePatch {
    /// Patch changing only the display name.
    #[must_use]
    pub fn display_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            avatar_ref: None,
        }
    }

    /// Patch changing only the avatar.
    #[must_use]
    pub fn avatar_ref(avatar_ref: impl Into<String>) -> Self {
        Self {
            display_name: None,
            avatar_ref: Some(avatar_ref.into()),
        }
    }

    /// Validate every present field.
    ///
    /// # Examples
    /// ```
    /// use horizon_client::domain::{ProfilePatch, ProfileValidationError};
    ///
    /// assert_eq!(
    ///     ProfilePatch::display_name("").validate(),
    ///     Err(ProfileValidationError::EmptyDisplayName),
    /// );
    /// assert!(ProfilePatch::display_name("Ana M.").validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<ProfileChanges, ProfileValidationError> {
        if self.display_name.is_none() && self.avatar_ref.is_none() {
            return Err(ProfileValidationError::EmptyPatch);
        }
        let display_name = self
            .display_name
            .as_deref()
            .map(DisplayName::new)
            .transpose()?;
        let avatar_ref = self.avatar_ref.as_deref().map(AvatarRef::new).transpose()?;
        Ok(ProfileChanges {
            display_name,
            avatar_ref,
        })
    }
}

/// Validated field changes ready for the profile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    display_name: Option<DisplayName>,
    avatar_ref: Option<AvatarRef>,
}

impl ProfileChanges {
    /// New display name, if it changes.
    #[must_use]
    pub fn display_name(&self) -> Option<&DisplayName> {
        self.display_name.as_ref()
    }

    /// New avatar, if it changes.
    #[must_use]
    pub fn avatar_ref(&self) -> Option<&AvatarRef> {
        self.avatar_ref.as_ref()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn profile(created_at: DateTime<Utc>) -> Profile {
        Profile::provisioned(
            AccountId::new("u42").expect("account id"),
            Some(DisplayName::new("Ana").expect("display name")),
            None,
            created_at,
        )
    }

    #[rstest]
    #[case(0, 1, 100, 0)]
    #[case(99, 1, 1, 99)]
    #[case(100, 2, 100, 0)]
    #[case(950, 10, 50, 50)]
    fn eco_levels_follow_hundred_point_steps(
        #[case] points: u32,
        #[case] level: u32,
        #[case] to_next: u32,
        #[case] progress: u32,
    ) {
        let points = EcoPoints::new(points);
        assert_eq!(points.level(), level);
        assert_eq!(points.points_to_next_level(), to_next);
        assert_eq!(points.level_progress_percent(), progress);
    }

    #[rstest]
    fn provisioned_profiles_start_at_zero(profile: Profile, created_at: DateTime<Utc>) {
        assert_eq!(profile.eco_points, EcoPoints::ZERO);
        assert_eq!(profile.created_at, created_at);
        assert_eq!(profile.updated_at, created_at);
    }

    #[rstest]
    fn with_changes_only_touches_present_fields(profile: Profile, created_at: DateTime<Utc>) {
        let changes = ProfilePatch::avatar_ref("https://cdn.example.org/ana.png")
            .validate()
            .expect("valid patch");
        let later = created_at + chrono::TimeDelta::minutes(5);

        let edited = profile.with_changes(&changes, later);

        assert_eq!(edited.display_name, profile.display_name);
        assert_eq!(
            edited.avatar_ref.as_ref().map(AsRef::as_ref),
            Some("https://cdn.example.org/ana.png")
        );
        assert_eq!(edited.created_at, created_at);
        assert_eq!(edited.updated_at, later);
    }

    #[rstest]
    fn empty_patches_are_rejected() {
        assert_eq!(
            ProfilePatch::default().validate(),
            Err(ProfileValidationError::EmptyPatch)
        );
    }

    #[rstest]
    fn invalid_avatar_fails_the_whole_patch() {
        let patch = ProfilePatch {
            display_name: Some("Ana M.".to_owned()),
            avatar_ref: Some("javascript:alert(1)".to_owned()),
        };
        assert!(matches!(
            patch.validate(),
            Err(ProfileValidationError::UnsupportedAvatarScheme { .. })
        ));
    }

    #[rstest]
    fn profile_serialises_in_camel_case(profile: Profile) {
        let value = serde_json::to_value(&profile).expect("serialise profile");
        assert_eq!(value["accountId"], json!("u42"));
        assert_eq!(value["displayName"], json!("Ana"));
        assert_eq!(value["ecoPoints"], json!(0));
        assert_eq!(value["avatarRef"], json!(null));
    }
}

//! Read-only projections of session and profile state for display.
//!
//! Views are built from a [`SessionSnapshot`] and own their data, so
//! consumers can hold them without borrowing the store and cannot write
//! back through them.

use serde::Serialize;

use crate::domain::{
    AccountId, EcoPoints, Error, Profile, SessionSnapshot, SessionStatus, SessionStore,
};

const ANONYMOUS_NAME: &str = "Anonymous User";
const UNKNOWN_INITIAL: char = '?';
const LEGEND_LEVEL: u32 = 10;

/// Session fields a UI needs to render identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Authentication status.
    pub status: SessionStatus,
    /// Signed-in account.
    pub account_id: Option<AccountId>,
    /// Email address for display.
    pub email_hint: Option<String>,
}

impl SessionView {
    /// View of the store's current session.
    #[must_use]
    pub fn current(store: &SessionStore) -> Self {
        Self::from(&store.snapshot())
    }
}

impl From<&SessionSnapshot> for SessionView {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let session = snapshot.session();
        Self {
            status: session.status(),
            account_id: session.account_id().cloned(),
            email_hint: session.email_hint().map(str::to_owned),
        }
    }
}

/// Cached profile with its load status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    /// Cached profile, if loaded.
    pub profile: Option<Profile>,
    /// Whether a load is in flight.
    pub loading: bool,
    /// Last failure to show the user.
    pub error: Option<Error>,
    /// Signed in, but the profile could not be provisioned.
    pub degraded: bool,
}

impl ProfileView {
    /// View of the store's cached profile.
    #[must_use]
    pub fn current(store: &SessionStore) -> Self {
        Self::from(&store.snapshot())
    }
}

impl From<&SessionSnapshot> for ProfileView {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let state = snapshot.profile();
        Self {
            profile: state.profile().cloned(),
            loading: state.is_loading(),
            error: state.error().cloned(),
            degraded: state.is_degraded(),
        }
    }
}

/// Header control offered to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthAffordance {
    /// Session still resolving; show a spinner.
    Loading,
    /// Offer the sign-in link.
    SignIn,
    /// Offer the account link with an avatar initial.
    Account {
        /// Upper-cased first letter of the email hint.
        initial: char,
    },
}

impl From<&SessionSnapshot> for AuthAffordance {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let session = snapshot.session();
        match session.status() {
            SessionStatus::Uninitialized | SessionStatus::Loading => Self::Loading,
            SessionStatus::Unauthenticated => Self::SignIn,
            SessionStatus::Authenticated => Self::Account {
                initial: first_upper(session.email_hint()).unwrap_or(UNKNOWN_INITIAL),
            },
        }
    }
}

/// Badge shown on the account page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    /// Every account starts with this.
    FirstSteps,
    /// 100 or more points.
    EcoWarrior,
    /// 500 or more points.
    GreenChampion,
    /// Level 10 or above.
    EcoLegend,
}

impl Achievement {
    /// Badge title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FirstSteps => "First Steps",
            Self::EcoWarrior => "Eco Warrior",
            Self::GreenChampion => "Green Champion",
            Self::EcoLegend => "Eco Legend",
        }
    }

    /// Short description of how the badge was earned.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::FirstSteps => "Joined Green Horizon",
            Self::EcoWarrior => "Earned 100+ points",
            Self::GreenChampion => "Earned 500+ points",
            Self::EcoLegend => "Reached Level 10",
        }
    }

    /// Badges earned with `points`, in display order.
    #[must_use]
    pub fn earned(points: EcoPoints) -> Vec<Self> {
        [
            (Self::FirstSteps, true),
            (Self::EcoWarrior, points.value() >= 100),
            (Self::GreenChampion, points.value() >= 500),
            (Self::EcoLegend, points.level() >= LEGEND_LEVEL),
        ]
        .into_iter()
        .filter_map(|(badge, earned)| earned.then_some(badge))
        .collect()
    }
}

/// Account page summary derived from a profile.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use horizon_client::domain::views::AccountSummary;
/// use horizon_client::domain::{AccountId, EcoPoints, Profile};
///
/// let mut profile = Profile::provisioned(
///     AccountId::new("u42").unwrap(),
///     None,
///     None,
///     Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
/// );
/// profile.eco_points = EcoPoints::new(250);
///
/// let summary = AccountSummary::new(&profile, Some("ana@example.org"));
/// assert_eq!(summary.display_name, "Anonymous User");
/// assert_eq!(summary.initial, 'A');
/// assert_eq!(summary.level, 3);
/// assert_eq!(summary.member_since, "March 2026");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Display name, or a placeholder when unset.
    pub display_name: String,
    /// Avatar initial from the display name, else the email hint.
    pub initial: char,
    /// Avatar URL, if any.
    pub avatar_ref: Option<String>,
    /// Eco points balance.
    pub eco_points: u32,
    /// Eco level, starting at 1.
    pub level: u32,
    /// Points missing before the next level.
    pub points_to_next_level: u32,
    /// Progress through the current level, 0 to 99.
    pub level_progress_percent: u32,
    /// Month and year the profile was created, e.g. "March 2026".
    pub member_since: String,
    /// Earned badges.
    pub achievements: Vec<Achievement>,
}

impl AccountSummary {
    /// Summarise `profile`, using `email_hint` for the initial when the
    /// profile has no display name.
    #[must_use]
    pub fn new(profile: &Profile, email_hint: Option<&str>) -> Self {
        let points = profile.eco_points;
        let initial = profile
            .display_name
            .as_ref()
            .and_then(|name| name.initial())
            .or_else(|| first_upper(email_hint))
            .unwrap_or(UNKNOWN_INITIAL);
        Self {
            display_name: profile
                .display_name
                .as_ref()
                .map_or_else(|| ANONYMOUS_NAME.to_owned(), ToString::to_string),
            initial,
            avatar_ref: profile.avatar_ref.as_ref().map(ToString::to_string),
            eco_points: points.value(),
            level: points.level(),
            points_to_next_level: points.points_to_next_level(),
            level_progress_percent: points.level_progress_percent(),
            member_since: profile.created_at.format("%B %Y").to_string(),
            achievements: Achievement::earned(points),
        }
    }

    /// Summary for the snapshot's cached profile, if one is loaded.
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Option<Self> {
        let profile = snapshot.profile().profile()?;
        Some(Self::new(profile, snapshot.session().email_hint()))
    }
}

fn first_upper(text: Option<&str>) -> Option<char> {
    text?.chars().next().and_then(|c| c.to_uppercase().next())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{DisplayName, Session};
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn profile() -> Profile {
        Profile::provisioned(
            AccountId::new("u42").expect("account id"),
            Some(DisplayName::new("ana").expect("display name")),
            None,
            Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }

    #[rstest]
    #[case(0, vec![Achievement::FirstSteps])]
    #[case(100, vec![Achievement::FirstSteps, Achievement::EcoWarrior])]
    #[case(
        500,
        vec![Achievement::FirstSteps, Achievement::EcoWarrior, Achievement::GreenChampion]
    )]
    #[case(
        900,
        vec![
            Achievement::FirstSteps,
            Achievement::EcoWarrior,
            Achievement::GreenChampion,
            Achievement::EcoLegend,
        ]
    )]
    fn achievements_follow_thresholds(#[case] points: u32, #[case] expected: Vec<Achievement>) {
        assert_eq!(Achievement::earned(EcoPoints::new(points)), expected);
    }

    #[rstest]
    fn summary_uses_display_name_initial(profile: Profile) {
        let summary = AccountSummary::new(&profile, Some("zed@example.org"));
        assert_eq!(summary.display_name, "ana");
        assert_eq!(summary.initial, 'A');
        assert_eq!(summary.member_since, "October 2026");
        assert_eq!(summary.level, 1);
        assert_eq!(summary.points_to_next_level, 100);
    }

    #[rstest]
    fn summary_falls_back_without_name_or_email(mut profile: Profile) {
        profile.display_name = None;
        let summary = AccountSummary::new(&profile, None);
        assert_eq!(summary.display_name, ANONYMOUS_NAME);
        assert_eq!(summary.initial, UNKNOWN_INITIAL);
    }

    #[rstest]
    fn default_snapshot_shows_loading_affordance() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(AuthAffordance::from(&snapshot), AuthAffordance::Loading);
        assert!(AccountSummary::from_snapshot(&snapshot).is_none());
        let view = SessionView::from(&snapshot);
        assert_eq!(view.status, SessionStatus::Uninitialized);
        assert!(view.account_id.is_none());
    }

    #[rstest]
    fn authenticated_session_without_email_uses_placeholder() {
        let session = Session::authenticated(AccountId::new("u1").expect("account id"), None);
        assert_eq!(
            first_upper(session.email_hint()).unwrap_or(UNKNOWN_INITIAL),
            UNKNOWN_INITIAL
        );
        assert_eq!(first_upper(Some("bea@example.org")), Some('B'));
    }
}

//! Replay a scripted sequence of provider events and profile edits against the
//! session core, logging the resulting state after every step.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use horizon_client::ClientSettings;
use horizon_client::domain::{
    AccountSummary, AuthAffordance, ProfileEditor, ProfilePatch, ProviderEvent, ProviderSession,
    RouteGuard, SessionStore, SessionStorePorts, SessionView,
};
use horizon_client::outbound::{InMemoryIdentityProvider, InMemoryProfileStore};
use horizon_client::telemetry::init_tracing;
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use serde_json::json;
use tokio::runtime::Builder;
use tracing::{info, warn};

/// `session-replay` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "session-replay",
    about = "Replay provider events and profile edits against the session core",
    version
)]
struct CliArgs {
    /// Path to a JSON replay script.
    #[arg(long = "script", value_name = "path")]
    script: PathBuf,
    /// Client settings flags (`--login-path`, `--home-path`, `--log-json`)
    /// passed after `--`; `HORIZON_*` environment variables also apply.
    #[arg(last = true, value_name = "settings")]
    settings: Vec<OsString>,
}

impl CliArgs {
    fn load_settings(&self) -> Result<ClientSettings> {
        let argv = std::iter::once(OsString::from("session-replay"))
            .chain(self.settings.iter().cloned());
        ClientSettings::load_from_iter(argv)
            .map_err(|err| eyre!("failed to load client settings: {err}"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReplayScript {
    #[serde(default)]
    initial_session: Option<ProviderSession>,
    #[serde(default)]
    steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
enum ReplayStep {
    Emit { event: ProviderEvent },
    Edit { patch: ProfilePatch },
    SignOut,
}

impl ReplayStep {
    const fn label(&self) -> &'static str {
        match self {
            Self::Emit { event } => event.name(),
            Self::Edit { .. } => "edit",
            Self::SignOut => "sign-out",
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let settings = args.load_settings()?;
    init_tracing(&settings);

    let script = load_script(&args.script)?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(replay(&settings, script))
}

fn load_script(path: &Path) -> Result<ReplayScript> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("script path '{}' has no file name", path.display()))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())
        .wrap_err_with(|| format!("failed to open script directory '{}'", parent.display()))?;
    let raw = directory
        .read_to_string(file_name)
        .wrap_err_with(|| format!("failed to read script '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("failed to parse script '{}'", path.display()))
}

async fn replay(settings: &ClientSettings, script: ReplayScript) -> Result<()> {
    let provider = Arc::new(InMemoryIdentityProvider::new());
    provider.set_current_session(script.initial_session);
    let profiles = Arc::new(InMemoryProfileStore::new());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let store = SessionStore::initialize(SessionStorePorts {
        provider: provider.clone(),
        profiles: profiles.clone(),
        clock: Arc::clone(&clock),
    })?;
    let editor = ProfileEditor::new(profiles, store.profile_cache(), clock);
    let guard = RouteGuard::from_settings(settings);

    store.wait_until_idle().await;
    report(&store, &guard, 0, "initial")?;

    for (index, step) in script.steps.into_iter().enumerate() {
        let label = step.label();
        match step {
            ReplayStep::Emit { event } => provider.emit(event),
            ReplayStep::Edit { patch } => {
                if let Err(err) = editor.edit_profile(&patch).await {
                    warn!(step = index + 1, code = %err.code(), error = %err, "edit rejected");
                }
            }
            ReplayStep::SignOut => {
                if let Err(err) = store.sign_out().await {
                    warn!(step = index + 1, code = %err.code(), error = %err, "sign-out failed");
                }
            }
        }
        store.wait_until_idle().await;
        report(&store, &guard, index + 1, label)?;
    }

    store.teardown();
    Ok(())
}

fn report(store: &SessionStore, guard: &RouteGuard, step: usize, label: &str) -> Result<()> {
    let snapshot = store.snapshot();
    let state = json!({
        "session": SessionView::from(&snapshot),
        "profile": snapshot.profile(),
        "providerError": snapshot.provider_error(),
        "affordance": AuthAffordance::from(&snapshot),
        "account": AccountSummary::from_snapshot(&snapshot),
        "protectedRoute": guard.protected(snapshot.session()),
        "guestRoute": guard.guest_only(snapshot.session()),
    });
    let rendered = serde_json::to_string(&state).wrap_err("failed to render replay state")?;
    info!(step, label, state = %rendered, "replayed step");
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the replay binary.
    use super::*;
    use env_lock::lock_env;
    use rstest::rstest;

    const FIXTURE: &str = include_str!("../../fixtures/replay/sign-up-and-edit.json");

    #[rstest]
    fn fixture_script_parses() {
        let script: ReplayScript = serde_json::from_str(FIXTURE).expect("fixture parses");
        assert!(script.initial_session.is_none());
        let labels: Vec<_> = script.steps.iter().map(ReplayStep::label).collect();
        assert_eq!(
            labels,
            vec!["account-created", "edit", "edit", "token-refreshed", "sign-out"]
        );
    }

    #[rstest]
    fn unknown_steps_are_rejected() {
        let result: Result<ReplayScript, _> =
            serde_json::from_str(r#"{ "steps": [{ "step": "teleport" }] }"#);
        assert!(result.is_err());
    }

    #[rstest]
    fn settings_flags_after_separator_reach_client_settings() {
        let _guard = lock_env([
            ("HORIZON_LOGIN_PATH", None::<String>),
            ("HORIZON_HOME_PATH", None::<String>),
            ("HORIZON_LOG_JSON", None::<String>),
        ]);
        let args = CliArgs::try_parse_from([
            "session-replay",
            "--script",
            "replay.json",
            "--",
            "--login-path",
            "/auth/sign-in",
        ])
        .expect("arguments parse");

        let settings = args.load_settings().expect("settings load");

        assert_eq!(args.script, PathBuf::from("replay.json"));
        assert_eq!(settings.login_path(), "/auth/sign-in");
        assert_eq!(settings.home_path(), "/");
        assert!(settings.log_json());
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_script_replays() {
        let script: ReplayScript = serde_json::from_str(FIXTURE).expect("fixture parses");
        let settings = ClientSettings {
            login_path: None,
            home_path: None,
            log_json: Some(false),
        };
        replay(&settings, script).await.expect("replay succeeds");
    }
}

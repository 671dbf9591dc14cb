//! Client-side authentication flow: the screen state machine plus the
//! pieces every screen shares (session cache, role routing).

pub mod api;
pub mod otp_input;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::user::Role;

/// Cache key holding the serialized profile.
pub const USER_KEY: &str = "auth_user";
/// Cache key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Screens of the authentication flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    #[default]
    Welcome,
    Login,
    Register,
    ForgotPassword,
    OtpVerification,
    ResetPassword,
    Success,
}

/// Payload carried across screens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub email: Option<String>,
    pub reset_flow: bool,
    /// Password kept around between register and verify for the
    /// post-verification auto-login.
    pub pending_password: Option<String>,
    pub message: Option<String>,
}

/// Partial update applied by [`AuthFlow::navigate`]. `None` fields keep
/// their previous value: the payload is merged, never replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub email: Option<String>,
    pub reset_flow: Option<bool>,
    pub pending_password: Option<String>,
    pub message: Option<String>,
}

/// Durable key/value storage surviving reloads, the browser-storage
/// analogue. A convenience cache, not a security boundary.
pub trait SessionCache {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory [`SessionCache`].
#[derive(Debug, Default)]
pub struct MemoryCache(HashMap<String, String>);

impl SessionCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }
}

/// Profile slice the client keeps around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&crate::user::User> for Profile {
    fn from(user: &crate::user::User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Map a role to its dashboard route.
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::User => "/user/dashboard",
        Role::MessOwner => "/mess-owner/dashboard",
        Role::Admin => "/admin/dashboard",
    }
}

/// Authentication state machine driven by the screens.
///
/// Every mutation goes through a named operation, never direct field
/// assignment from outside.
#[derive(Debug, Default)]
pub struct AuthFlow {
    screen: Screen,
    state: FlowState,
    authenticated: bool,
    user: Option<Profile>,
    in_flight: bool,
}

impl AuthFlow {
    /// Fresh flow on the welcome screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the flow from the cache, restoring an authenticated
    /// session when both profile and token survived the reload.
    pub fn hydrate(cache: &impl SessionCache) -> Self {
        let user: Option<Profile> = cache
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let authenticated = user.is_some() && cache.get(TOKEN_KEY).is_some();

        Self {
            user: if authenticated { user } else { None },
            authenticated,
            ..Self::default()
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    /// Switch screens, merging `update` into the carried payload. This
    /// merge is how email, reset flag and pending password survive across
    /// screens without a server round trip.
    pub fn navigate(&mut self, screen: Screen, update: StateUpdate) {
        if let Some(email) = update.email {
            self.state.email = Some(email);
        }
        if let Some(reset_flow) = update.reset_flow {
            self.state.reset_flow = reset_flow;
        }
        if let Some(password) = update.pending_password {
            self.state.pending_password = Some(password);
        }
        if let Some(message) = update.message {
            self.state.message = Some(message);
        }
        self.screen = screen;
    }

    /// Gate duplicate submissions: `false` while a request is already
    /// outstanding, in which case the caller must not send another.
    pub fn begin_request(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// A settled request only drops the loading flag; it never forces a
    /// navigation on its own, even when its screen is long gone.
    pub fn finish_request(&mut self) {
        self.in_flight = false;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Record a successful login and persist the session.
    pub fn login_succeeded(
        &mut self,
        user: Profile,
        token: &str,
        cache: &mut impl SessionCache,
    ) {
        if let Ok(raw) = serde_json::to_string(&user) {
            cache.set(USER_KEY, &raw);
        }
        cache.set(TOKEN_KEY, token);

        self.user = Some(user);
        self.authenticated = true;
        self.state.pending_password = None;
    }

    /// Drop the session locally. The server keeps no logout state, so
    /// discarding the token is the whole operation.
    pub fn logout(&mut self, cache: &mut impl SessionCache) {
        cache.remove(USER_KEY);
        cache.remove(TOKEN_KEY);

        self.user = None;
        self.authenticated = false;
        self.state = FlowState::default();
        self.screen = Screen::Welcome;
    }

    /// Where the success screen should redirect: a role dashboard when the
    /// user ended up authenticated, nothing (manual sign-in affordance)
    /// otherwise.
    pub fn success_redirect(&self) -> Option<&'static str> {
        match (&self.user, self.authenticated) {
            (Some(user), true) => Some(dashboard_path(user.role)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Role) -> Profile {
        Profile {
            name: "Alice".into(),
            email: "alice@tiffin.dev".into(),
            role,
        }
    }

    #[test]
    fn test_navigate_merges_payload() {
        let mut flow = AuthFlow::new();

        flow.navigate(
            Screen::OtpVerification,
            StateUpdate {
                email: Some("alice@tiffin.dev".into()),
                pending_password: Some("Secret123!".into()),
                ..Default::default()
            },
        );
        // A later navigation without email keeps the carried one.
        flow.navigate(
            Screen::Success,
            StateUpdate {
                message: Some("Account verified.".into()),
                ..Default::default()
            },
        );

        assert_eq!(flow.screen(), Screen::Success);
        assert_eq!(flow.state().email.as_deref(), Some("alice@tiffin.dev"));
        assert_eq!(flow.state().pending_password.as_deref(), Some("Secret123!"));
        assert_eq!(flow.state().message.as_deref(), Some("Account verified."));
    }

    #[test]
    fn test_reset_flow_flag_survives_screens() {
        let mut flow = AuthFlow::new();

        flow.navigate(
            Screen::OtpVerification,
            StateUpdate {
                email: Some("alice@tiffin.dev".into()),
                reset_flow: Some(true),
                ..Default::default()
            },
        );
        flow.navigate(Screen::ResetPassword, StateUpdate::default());

        assert!(flow.state().reset_flow);
    }

    #[test]
    fn test_begin_request_gates_duplicates() {
        let mut flow = AuthFlow::new();

        assert!(flow.begin_request());
        assert!(flow.is_loading());
        // Submit control stays disabled while the request is outstanding.
        assert!(!flow.begin_request());

        flow.finish_request();
        assert!(flow.begin_request());
    }

    #[test]
    fn test_stale_completion_does_not_navigate() {
        let mut flow = AuthFlow::new();
        flow.navigate(Screen::OtpVerification, StateUpdate::default());
        assert!(flow.begin_request());

        // User navigated away while the request was in flight.
        flow.navigate(Screen::Login, StateUpdate::default());
        flow.finish_request();

        assert_eq!(flow.screen(), Screen::Login);
        assert!(!flow.is_loading());
    }

    #[test]
    fn test_hydrate_requires_user_and_token() {
        let mut cache = MemoryCache::default();

        assert!(!AuthFlow::hydrate(&cache).is_authenticated());

        // Profile alone is not enough.
        cache.set(
            USER_KEY,
            &serde_json::to_string(&profile(Role::User)).unwrap(),
        );
        assert!(!AuthFlow::hydrate(&cache).is_authenticated());

        cache.set(TOKEN_KEY, "token");
        let flow = AuthFlow::hydrate(&cache);
        assert!(flow.is_authenticated());
        assert_eq!(flow.user().unwrap().email, "alice@tiffin.dev");
    }

    #[test]
    fn test_login_then_logout_round_trip() {
        let mut cache = MemoryCache::default();
        let mut flow = AuthFlow::new();

        flow.navigate(
            Screen::OtpVerification,
            StateUpdate {
                pending_password: Some("Secret123!".into()),
                ..Default::default()
            },
        );
        flow.login_succeeded(profile(Role::MessOwner), "token", &mut cache);

        assert!(flow.is_authenticated());
        // Pending password is dropped once consumed.
        assert!(flow.state().pending_password.is_none());
        assert!(cache.get(TOKEN_KEY).is_some());

        flow.logout(&mut cache);
        assert!(!flow.is_authenticated());
        assert_eq!(flow.screen(), Screen::Welcome);
        assert_eq!(flow.state(), &FlowState::default());
        assert!(cache.get(USER_KEY).is_none());
        assert!(cache.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_profile_from_user() {
        let user = crate::user::User {
            name: "Alice".into(),
            email: "alice@tiffin.dev".into(),
            role: Role::Admin,
            password: Some("$argon2id$hash".into()),
            ..Default::default()
        };

        let profile = Profile::from(&user);
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.email, "alice@tiffin.dev");
    }

    #[test]
    fn test_success_redirect_by_role() {
        let mut cache = MemoryCache::default();
        let mut flow = AuthFlow::new();

        // Not authenticated: manual sign-in, no redirect.
        assert_eq!(flow.success_redirect(), None);

        flow.login_succeeded(profile(Role::User), "token", &mut cache);
        assert_eq!(flow.success_redirect(), Some("/user/dashboard"));

        flow.login_succeeded(profile(Role::MessOwner), "token", &mut cache);
        assert_eq!(flow.success_redirect(), Some("/mess-owner/dashboard"));

        flow.login_succeeded(profile(Role::Admin), "token", &mut cache);
        assert_eq!(flow.success_redirect(), Some("/admin/dashboard"));
    }
}

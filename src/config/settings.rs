//! Credentials loaded from the process environment
//!
//! `Settings` is validated as a whole: either both values pass or loading
//! fails with every problem listed. The validated value is memoized in a
//! [`SettingsCache`]; the process-wide instance is reached through
//! [`get_settings`] and cleared with [`reset_settings`].

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "ICAET_API_KEY";

/// Environment variable holding the user's email
pub const USER_EMAIL_VAR: &str = "USER_EMAIL";

/// Minimum accepted API key length, in characters
pub const MIN_API_KEY_LEN: usize = 10;

/// Prefix of every masked secret
pub const MASK_PREFIX: &str = "***";

/// One failed check against a required environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsProblem {
    pub variable: &'static str,
    pub reason: String,
}

impl SettingsProblem {
    pub fn new(variable: &'static str, reason: impl Into<String>) -> Self {
        Self {
            variable,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SettingsProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.variable, self.reason)
    }
}

/// Validated credentials for the ICAET API
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    api_key: String,
    user_email: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("user_email", &self.user_email)
            .finish()
    }
}

impl Settings {
    /// Validate a pair of raw values. Values are kept exactly as given.
    pub fn new(api_key: Option<String>, user_email: Option<String>) -> Result<Self> {
        let mut problems = Vec::new();

        if let Some(problem) = check_api_key(api_key.as_deref()) {
            problems.push(problem);
        }
        if let Some(problem) = check_user_email(user_email.as_deref()) {
            problems.push(problem);
        }

        match (api_key, user_email) {
            (Some(api_key), Some(user_email)) if problems.is_empty() => Ok(Self {
                api_key,
                user_email,
            }),
            _ => Err(Error::Settings { problems }),
        }
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(lookup(API_KEY_VAR), lookup(USER_EMAIL_VAR))
    }

    /// Read and validate settings from the process environment
    pub fn from_env() -> Result<Self> {
        debug!("Reading {} and {} from environment", API_KEY_VAR, USER_EMAIL_VAR);
        Self::from_lookup(env_var)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    /// Display-safe form of the API key
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

fn check_api_key(value: Option<&str>) -> Option<SettingsProblem> {
    match value {
        None => Some(SettingsProblem::new(API_KEY_VAR, "is not set")),
        Some(v) if v.trim().is_empty() => Some(SettingsProblem::new(API_KEY_VAR, "cannot be empty")),
        Some(v) if v.chars().count() < MIN_API_KEY_LEN => Some(SettingsProblem::new(
            API_KEY_VAR,
            format!("must be at least {} characters", MIN_API_KEY_LEN),
        )),
        Some(_) => None,
    }
}

fn check_user_email(value: Option<&str>) -> Option<SettingsProblem> {
    match value {
        None => Some(SettingsProblem::new(USER_EMAIL_VAR, "is not set")),
        Some(v) if v.trim().is_empty() => {
            Some(SettingsProblem::new(USER_EMAIL_VAR, "cannot be empty"))
        }
        Some(v) if !v.contains('@') || !v.contains('.') => Some(SettingsProblem::new(
            USER_EMAIL_VAR,
            "must be a valid email format (contain @ and .)",
        )),
        Some(_) => None,
    }
}

/// Look a variable up in the process environment, ignoring name case.
fn env_var(name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name) {
        return Some(value);
    }
    let vars = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
    find_case_insensitive(vars, name)
}

/// First entry whose key equals `name` ignoring ASCII case
pub fn find_case_insensitive<I>(vars: I, name: &str) -> Option<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Render a secret showing only its last four characters.
///
/// Keys shorter than four characters render as the bare prefix.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 4 {
        return MASK_PREFIX.to_string();
    }
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", MASK_PREFIX, suffix)
}

/// Memoized settings with explicit reset.
///
/// The lock is held while loading, so concurrent first use runs the
/// loader at most once. Failures are not cached.
#[derive(Debug, Default)]
pub struct SettingsCache {
    slot: Mutex<Option<Arc<Settings>>>,
}

impl SettingsCache {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Settings>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached settings, running `load` if none are cached yet
    pub fn get_or_load_with<F>(&self, load: F) -> Result<Arc<Settings>>
    where
        F: FnOnce() -> Result<Settings>,
    {
        let mut slot = self.lock();
        if let Some(settings) = slot.as_ref() {
            return Ok(Arc::clone(settings));
        }

        let settings = Arc::new(load()?);
        debug!(api_key = %settings.masked_api_key(), "Settings validated and cached");
        *slot = Some(Arc::clone(&settings));
        Ok(settings)
    }

    /// Return the cached settings, reading the environment on first use
    pub fn get_or_load(&self) -> Result<Arc<Settings>> {
        self.get_or_load_with(Settings::from_env)
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the cached value so the next access re-validates
    pub fn reset(&self) {
        *self.lock() = None;
    }
}

static GLOBAL_SETTINGS: SettingsCache = SettingsCache::new();

/// Process-wide settings, validated from the environment on first use
pub fn get_settings() -> Result<Arc<Settings>> {
    GLOBAL_SETTINGS.get_or_load()
}

/// Clear the process-wide settings
pub fn reset_settings() {
    GLOBAL_SETTINGS.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "test_api_key_12345";
    const EMAIL: &str = "test@example.com";

    fn settings(key: Option<&str>, email: Option<&str>) -> Result<Settings> {
        Settings::new(key.map(String::from), email.map(String::from))
    }

    fn problems(result: Result<Settings>) -> Vec<SettingsProblem> {
        match result {
            Err(Error::Settings { problems }) => problems,
            other => panic!("expected settings error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_settings_keep_values_unchanged() {
        let s = settings(Some(KEY), Some(EMAIL)).unwrap();
        assert_eq!(s.api_key(), KEY);
        assert_eq!(s.user_email(), EMAIL);
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let s = settings(Some(" padded-key-123 "), Some(" a@b.co ")).unwrap();
        assert_eq!(s.api_key(), " padded-key-123 ");
        assert_eq!(s.user_email(), " a@b.co ");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let p = problems(settings(None, Some(EMAIL)));
        assert_eq!(p, vec![SettingsProblem::new(API_KEY_VAR, "is not set")]);
    }

    #[test]
    fn test_missing_user_email_rejected() {
        let p = problems(settings(Some(KEY), None));
        assert_eq!(p, vec![SettingsProblem::new(USER_EMAIL_VAR, "is not set")]);
    }

    #[test]
    fn test_blank_api_key_rejected() {
        for key in ["", "   ", "\t\t\t\t\t\t\t\t\t\t\t"] {
            let p = problems(settings(Some(key), Some(EMAIL)));
            assert_eq!(p[0].variable, API_KEY_VAR);
            assert_eq!(p[0].reason, "cannot be empty");
        }
    }

    #[test]
    fn test_short_api_key_rejected() {
        let p = problems(settings(Some("short-key"), Some(EMAIL)));
        assert!(p[0].reason.contains("at least 10"));

        assert!(settings(Some("exactly10!"), Some(EMAIL)).is_ok());
    }

    #[test]
    fn test_blank_user_email_rejected() {
        for email in ["", "    "] {
            let p = problems(settings(Some(KEY), Some(email)));
            assert_eq!(p[0].variable, USER_EMAIL_VAR);
            assert_eq!(p[0].reason, "cannot be empty");
        }
    }

    #[test]
    fn test_email_format_requires_at_and_dot() {
        for email in ["invalid_email", "user@localhost", "user.example.com"] {
            let p = problems(settings(Some(KEY), Some(email)));
            assert!(p[0].reason.contains("valid email format"), "{}", email);
        }
        assert!(settings(Some(KEY), Some("valid@email.com")).is_ok());
    }

    #[test]
    fn test_both_fields_reported_together() {
        let p = problems(settings(Some(""), Some("nope")));
        let vars: Vec<_> = p.iter().map(|p| p.variable).collect();
        assert_eq!(vars, vec![API_KEY_VAR, USER_EMAIL_VAR]);
    }

    #[test]
    fn test_from_lookup_reads_named_variables() {
        let env: HashMap<&str, &str> = [(API_KEY_VAR, KEY), (USER_EMAIL_VAR, EMAIL)].into();
        let s = Settings::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(s.api_key(), KEY);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let vars = vec![
            ("PATH".to_string(), "/bin".to_string()),
            ("icaet_api_key".to_string(), KEY.to_string()),
        ];
        assert_eq!(find_case_insensitive(vars.clone(), API_KEY_VAR), Some(KEY.to_string()));
        assert_eq!(find_case_insensitive(vars, USER_EMAIL_VAR), None);
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("test-api-key-12345"), "***2345");
        assert_eq!(mask_api_key("abc"), "***");
        assert_eq!(mask_api_key("abcd"), "***abcd");
        assert_eq!(mask_api_key(""), "***");
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let s = settings(Some("test-api-key-12345"), Some(EMAIL)).unwrap();
        let rendered = format!("{:?}", s);
        assert!(!rendered.contains("test-api-key-12345"));
        assert!(rendered.contains("***2345"));
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let cache = SettingsCache::new();
        let first = cache.get_or_load_with(|| settings(Some(KEY), Some(EMAIL))).unwrap();
        let second = cache
            .get_or_load_with(|| panic!("loader must not run again"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_reset_reloads() {
        let cache = SettingsCache::new();
        let first = cache.get_or_load_with(|| settings(Some(KEY), Some(EMAIL))).unwrap();
        cache.reset();
        assert!(!cache.is_loaded());
        let second = cache.get_or_load_with(|| settings(Some(KEY), Some(EMAIL))).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_cache_does_not_remember_failures() {
        let cache = SettingsCache::new();
        assert!(cache.get_or_load_with(|| settings(None, None)).is_err());
        assert!(!cache.is_loaded());
        assert!(cache.get_or_load_with(|| settings(Some(KEY), Some(EMAIL))).is_ok());
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let cache = SettingsCache::new();
        let loads = AtomicUsize::new(0);

        let results: Vec<Arc<Settings>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        cache
                            .get_or_load_with(|| {
                                loads.fetch_add(1, Ordering::SeqCst);
                                settings(Some(KEY), Some(EMAIL))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}

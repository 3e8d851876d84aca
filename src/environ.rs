//! Purpose: Identify the hosting environment (development, staging, production) of an app.
//! Exports: `Platform`, `ProcessEnv`, environment predicates, `dot_target_name(_safe)`,
//! `environ_dict`, `ENVIRON_KEYS`, `UNDEFINED`.
//! Role: Thin classification layer over platform identity lookups.
//! Invariants: Predicates never fail; an unknown version or host classifies as `false`.
//! Invariants: `ProcessEnv` reads a snapshot; later environment changes are not observed.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Placeholder for unset variables in `environ_dict`.
pub const UNDEFINED: &str = "_UNDEFINED_";

/// Environment variables reported by `environ_dict`.
pub const ENVIRON_KEYS: [&str; 18] = [
    "AUTH_DOMAIN",
    "CURRENT_CONFIGURATION_VERSION",
    "CURRENT_MODULE_ID",
    "CURRENT_VERSION_ID",
    "DEFAULT_VERSION_HOSTNAME",
    "FEDERATED_IDENTITY",
    "FEDERATED_PROVIDER",
    "GAE_LOCAL_VM_RUNTIME",
    "HTTP_HOST",
    "HTTP_PROXY",
    "HTTP_X_APPENGINE_HTTPS",
    "HTTP_X_APPENGINE_QUEUENAME",
    "HTTP_X_ORIGINAL_HOST",
    "HTTP_X_ORIGINAL_SCHEME",
    "SERVER_NAME",
    "SERVER_PORT",
    "SERVER_SOFTWARE",
    "USER_IS_ADMIN",
];

const APPSPOT_SUFFIX: &str = ".appspot.com";

/// Identity lookups of the hosting platform.
pub trait Platform {
    fn var(&self, name: &str) -> Option<String>;

    fn application_id(&self) -> Option<String>;
    fn default_version_hostname(&self) -> Option<String>;
    fn current_instance_id(&self) -> Option<String>;
    fn current_module_name(&self) -> Option<String>;
    fn current_version_name(&self) -> Option<String>;
    fn default_version(&self) -> Option<String>;
    fn hostname(&self) -> Option<String>;

    fn service_account_name(&self) -> Option<String> {
        None
    }

    fn modules(&self) -> Vec<String> {
        self.current_module_name().into_iter().collect()
    }

    fn versions(&self) -> Vec<String> {
        self.current_version_name().into_iter().collect()
    }

    /// Empty string for the default namespace.
    fn namespace(&self) -> String;
    fn google_apps_namespace(&self) -> Option<String>;

    fn server_software(&self) -> String {
        self.var("SERVER_SOFTWARE").unwrap_or_default()
    }
}

/// `Platform` backed by environment variables, as the runtime sets them for each request.
#[derive(Clone, Debug, Default)]
pub struct ProcessEnv {
    vars: HashMap<String, String>,
    default_version: Option<String>,
}

impl ProcessEnv {
    pub fn from_env() -> Self {
        let env = Self::from_pairs(std::env::vars());
        debug!(vars = env.vars.len(), "captured process environment");
        env
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            default_version: None,
        }
    }

    /// The environment does not carry the default version; callers that know it set it here.
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    fn non_empty(&self, name: &str) -> Option<String> {
        self.vars.get(name).filter(|value| !value.is_empty()).cloned()
    }
}

impl Platform for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    // `s~app` / `dev~app`: drop the partition prefix.
    fn application_id(&self) -> Option<String> {
        let raw = self.non_empty("APPLICATION_ID")?;
        Some(match raw.rsplit_once('~') {
            Some((_, app)) => app.to_string(),
            None => raw,
        })
    }

    fn default_version_hostname(&self) -> Option<String> {
        self.non_empty("DEFAULT_VERSION_HOSTNAME")
    }

    fn current_instance_id(&self) -> Option<String> {
        self.non_empty("INSTANCE_ID")
    }

    fn current_module_name(&self) -> Option<String> {
        Some(self.non_empty("CURRENT_MODULE_ID").unwrap_or_else(|| "default".to_string()))
    }

    // `CURRENT_VERSION_ID` is `<version>.<deployment id>`.
    fn current_version_name(&self) -> Option<String> {
        let raw = self.non_empty("CURRENT_VERSION_ID")?;
        raw.split('.').next().map(str::to_string)
    }

    fn default_version(&self) -> Option<String> {
        self.default_version.clone()
    }

    fn hostname(&self) -> Option<String> {
        self.non_empty("HTTP_HOST")
            .or_else(|| self.default_version_hostname())
    }

    fn namespace(&self) -> String {
        self.non_empty("HTTP_X_APPENGINE_CURRENT_NAMESPACE")
            .unwrap_or_default()
    }

    fn google_apps_namespace(&self) -> Option<String> {
        self.non_empty("HTTP_X_APPENGINE_DEFAULT_NAMESPACE")
    }
}

/// Served from the platform's own infrastructure.
pub fn is_host_google(platform: &dyn Platform) -> bool {
    platform.server_software().starts_with("Google")
        || platform
            .hostname()
            .is_some_and(|host| host.ends_with(APPSPOT_SUFFIX))
}

/// Running under the local development server.
pub fn is_development(platform: &dyn Platform) -> bool {
    platform.server_software().starts_with("Development")
}

/// `version` (or the current version) is the default one. Unknown versions are never default.
pub fn is_default_version(platform: &dyn Platform, version: Option<&str>) -> bool {
    let version = or_current(version, || platform.current_version_name());
    match (version, platform.default_version()) {
        (Some(version), Some(default)) => version == default,
        _ => false,
    }
}

pub fn is_staging(platform: &dyn Platform, version: Option<&str>) -> bool {
    is_host_google(platform) && !is_default_version(platform, version)
}

pub fn is_production(platform: &dyn Platform, version: Option<&str>) -> bool {
    is_host_google(platform) && is_default_version(platform, version)
}

/// `<version>-dot-<module>`, the form used to target a version of a module.
pub fn dot_target_name(
    platform: &dyn Platform,
    version: Option<&str>,
    module: Option<&str>,
) -> Result<String, Error> {
    let version = or_current(version, || platform.current_version_name())
        .ok_or_else(|| unknown("version"))?;
    let module = or_current(module, || platform.current_module_name())
        .ok_or_else(|| unknown("module"))?;
    Ok(format!("{version}-dot-{module}"))
}

pub fn dot_target_name_safe(
    platform: &dyn Platform,
    version: Option<&str>,
    module: Option<&str>,
) -> Option<String> {
    dot_target_name(platform, version, module).ok()
}

// An empty argument means "not given".
fn or_current(given: Option<&str>, current: impl FnOnce() -> Option<String>) -> Option<String> {
    match given.filter(|value| !value.is_empty()) {
        Some(value) => Some(value.to_string()),
        None => current().filter(|value| !value.is_empty()),
    }
}

fn unknown(what: &str) -> Error {
    Error::new(ErrorKind::Resolve)
        .with_message(format!("current {what} name is unknown"))
        .with_hint("pass it explicitly or run inside the platform runtime")
}

/// Snapshot of everything the platform reports, ready for `dumps`.
pub fn environ_dict(platform: &dyn Platform) -> Value {
    let os_environ: Map = ENVIRON_KEYS
        .iter()
        .map(|key| {
            let value = platform.var(key).unwrap_or_else(|| UNDEFINED.to_string());
            (key.to_string(), Value::String(value))
        })
        .collect();
    let app_identity = section([
        ("get_service_account_name", platform.service_account_name().into()),
        ("get_application_id", platform.application_id().into()),
        (
            "get_default_version_hostname",
            platform.default_version_hostname().into(),
        ),
    ]);
    let modules = section([
        ("get_current_module_name", platform.current_module_name().into()),
        ("get_current_version_name", platform.current_version_name().into()),
        ("get_current_instance_id", platform.current_instance_id().into()),
        ("get_modules", strings(platform.modules())),
        ("get_versions", strings(platform.versions())),
        ("get_default_version", platform.default_version().into()),
        ("get_hostname", platform.hostname().into()),
    ]);
    let namespace_manager = section([
        ("get_namespace", platform.namespace().into()),
        ("google_apps_namespace", platform.google_apps_namespace().into()),
    ]);
    section([
        ("os.environ", Value::Object(os_environ)),
        ("app_identity", app_identity),
        ("modules", modules),
        ("namespace_manager", namespace_manager),
    ])
}

fn section<const N: usize>(entries: [(&str, Value); N]) -> Value {
    entries.into_iter().collect()
}

fn strings(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

//! Environment classification over a fixed variable snapshot.
use gaek::api::{DumpOptions, Platform, ProcessEnv, Value, dumps};
use gaek::environ::{
    ENVIRON_KEYS, UNDEFINED, dot_target_name, dot_target_name_safe, environ_dict, is_default_version,
    is_development, is_host_google, is_production, is_staging,
};

fn dev_server() -> ProcessEnv {
    ProcessEnv::from_pairs([
        ("APPLICATION_ID", "dev~testbed-test"),
        ("CURRENT_VERSION_ID", "testbed-version.1"),
        ("SERVER_SOFTWARE", "Development/2.0"),
        ("HTTP_HOST", "localhost:8080"),
    ])
}

fn hosted(version: &str) -> ProcessEnv {
    ProcessEnv::from_pairs([
        ("APPLICATION_ID", "s~example"),
        ("CURRENT_VERSION_ID", version),
        ("CURRENT_MODULE_ID", "api"),
        ("SERVER_SOFTWARE", "Google App Engine/1.9.40"),
        ("DEFAULT_VERSION_HOSTNAME", "example.appspot.com"),
    ])
    .with_default_version("v2")
}

#[test]
fn development_server_is_not_google() {
    let env = dev_server();
    assert!(is_development(&env));
    assert!(!is_host_google(&env));
    assert!(!is_staging(&env, None));
    assert!(!is_production(&env, None));
    assert!(!is_default_version(&env, None));
}

#[test]
fn appspot_hostname_counts_as_google() {
    let env = ProcessEnv::from_pairs([("HTTP_HOST", "v1-dot-example.appspot.com")]);
    assert!(is_host_google(&env));
    assert!(!is_development(&env));
}

#[test]
fn default_version_is_production_others_are_staging() {
    let prod = hosted("v2.4711");
    assert!(is_production(&prod, None));
    assert!(!is_staging(&prod, None));

    let staging = hosted("v3.4712");
    assert!(is_staging(&staging, None));
    assert!(!is_production(&staging, None));
    assert!(is_production(&staging, Some("v2")));
}

#[test]
fn dot_target_names() {
    let env = dev_server();
    assert_eq!(
        dot_target_name(&env, None, None).expect("name"),
        "testbed-version-dot-default"
    );
    assert_eq!(
        dot_target_name_safe(&hosted("v2.1"), None, None).as_deref(),
        Some("v2-dot-api")
    );
    let bare = ProcessEnv::from_pairs(Vec::<(String, String)>::new());
    assert_eq!(dot_target_name_safe(&bare, None, None), None);
    assert!(dot_target_name(&bare, None, None).is_err());
}

#[test]
fn environ_dict_reports_every_section() {
    let env = dev_server();
    let dict = environ_dict(&env);
    let os_environ = dict.get("os.environ").and_then(Value::as_object).expect("os.environ");
    assert_eq!(os_environ.len(), ENVIRON_KEYS.len());
    assert_eq!(os_environ.get("SERVER_SOFTWARE"), Some(&Value::from("Development/2.0")));
    assert_eq!(os_environ.get("AUTH_DOMAIN"), Some(&Value::from(UNDEFINED)));

    let app_identity = dict.get("app_identity").expect("app_identity");
    assert_eq!(app_identity.get("get_application_id"), Some(&Value::from("testbed-test")));
    assert_eq!(app_identity.get("get_service_account_name"), Some(&Value::Null));

    let modules = dict.get("modules").expect("modules");
    assert_eq!(modules.get("get_current_version_name"), Some(&Value::from("testbed-version")));
    assert_eq!(
        modules.get("get_modules"),
        Some(&Value::Array(vec![Value::from("default")]))
    );
    assert_eq!(
        dict.get("namespace_manager").and_then(|ns| ns.get("get_namespace")),
        Some(&Value::from(""))
    );
}

#[test]
fn environ_dict_is_encodable() {
    let text = dumps(&environ_dict(&hosted("v2.1")), DumpOptions::new().with_sort_keys(true))
        .expect("dumps");
    assert!(text.starts_with(r#"{"app_identity": {"get_application_id": "example""#));
    assert!(text.contains(r#""get_default_version": "v2""#));
}

#[test]
fn process_env_snapshot_reads_real_variables() {
    let env = ProcessEnv::from_env();
    assert_eq!(env.var("PATH"), std::env::var("PATH").ok());
}

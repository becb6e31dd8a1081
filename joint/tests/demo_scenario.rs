//! End-to-end bootstrap of the demo components from a config file.

use std::fs;
use std::path::Path;

use joint::components::server::{Response, SERVER_KEY, Server};
use joint::components::store::{DataStore, SNAPSHOT_FILE, STORE_KEY};
use joint::components::{BUILD_LABEL, default_specs};
use joint_common::config::{ConfigError, ConfigLoader, Configuration};
use joint_runtime::{Orchestrator, Phase, StarterError};
use tempfile::TempDir;

fn config_for(data_dir: &Path, extra: &str) -> Configuration {
    let text = format!(
        r#"
[store]
path = "{}"
seed = {{ greeting = "hello" }}

[auth]
tokens = {{ "t-1" = "alice" }}

[auth_admin]
tokens = {{ "root" = "admin" }}

[components.auth_admin]
kind = "auth"
{extra}
"#,
        data_dir.display()
    );
    Configuration::from_toml_str(&text).unwrap()
}

#[test]
fn test_full_bootstrap_serves_and_persists() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let config = config_for(&data_dir, "");

    let mut bootstrap = Orchestrator::new(default_specs(&config).unwrap())
        .with_label(BUILD_LABEL)
        .run(&config)
        .unwrap();

    let names: Vec<&str> = bootstrap.components().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["logging", "store", "auth", "auth", "server"]);

    // Setup provisioned the data directory.
    assert!(data_dir.is_dir());

    let server = bootstrap.registry().require::<Server>(&SERVER_KEY).unwrap();
    assert_eq!(server.authenticators(), vec!["auth", "auth_admin"]);
    assert_eq!(server.handle_line("t-1 GET greeting").to_string(), "OK hello");
    assert_eq!(server.handle_line("root PUT motd welcome"), Response::Ok(None));
    assert_eq!(server.handle_line("nobody GET motd"), Response::Denied);

    let store = bootstrap
        .registry()
        .require::<dyn DataStore>(&STORE_KEY)
        .unwrap();
    assert_eq!(store.get("motd").as_deref(), Some("welcome"));

    bootstrap.shutdown().unwrap();
    assert_eq!(server.handle_line("- PING"), Response::Unavailable);

    let snapshot = fs::read_to_string(data_dir.join(SNAPSHOT_FILE)).unwrap();
    assert!(snapshot.contains("welcome"));

    // A second process picks the snapshot back up.
    let mut again = Orchestrator::new(default_specs(&config).unwrap())
        .run(&config)
        .unwrap();
    let server = again.registry().require::<Server>(&SERVER_KEY).unwrap();
    assert_eq!(server.handle_line("t-1 GET motd").to_string(), "OK welcome");
    again.shutdown().unwrap();
}

#[test]
fn test_missing_auth_section_fails_init() {
    let config = Configuration::from_toml_str("[store]\n").unwrap();
    let err = Orchestrator::new(default_specs(&config).unwrap())
        .run(&config)
        .unwrap_err();

    assert_eq!(err.component, "auth");
    assert_eq!(err.phase, Phase::Init);
    assert!(matches!(
        err.source,
        StarterError::Config(ConfigError::MissingSection(ref s)) if s == "auth"
    ));
}

#[test]
fn test_unusable_data_dir_fails_setup() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "x").unwrap();
    let config = config_for(&blocker.join("data"), "");

    let err = Orchestrator::new(default_specs(&config).unwrap())
        .run(&config)
        .unwrap_err();

    assert_eq!(err.component, "store");
    assert_eq!(err.phase, Phase::Setup);
    assert!(matches!(err.source, StarterError::Provision { .. }));
}

#[test]
fn test_read_only_server_from_config() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir.path().join("data"), "\n[server]\nread_only = true\n");

    let bootstrap = Orchestrator::new(default_specs(&config).unwrap())
        .run(&config)
        .unwrap();
    let server = bootstrap.registry().require::<Server>(&SERVER_KEY).unwrap();
    assert_eq!(server.handle_line("t-1 PUT k v"), Response::ReadOnly);
}

#[test]
fn test_config_file_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("joint.toml");
    fs::write(
        &path,
        "[shared]\nservice_name = \"disk\"\n\n[auth]\ntokens = { \"t\" = \"u\" }\n",
    )
    .unwrap();

    let config = Configuration::load(&path).unwrap();
    assert_eq!(config.shared().unwrap().unwrap().service_name, "disk");

    let bootstrap = Orchestrator::new(default_specs(&config).unwrap())
        .run(&config)
        .unwrap();
    let snapshot = bootstrap.registry().snapshot();
    let keys: Vec<&str> = snapshot.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["logger", "store", "auth", "server"]);
    assert!(snapshot.iter().find(|c| c.key.as_str() == "server").unwrap().closable);
}

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::MockServer;

use querychat::api::ApiClient;
use querychat::auth::{AuthContext, CredentialStore, Credentials, FileStore};
use querychat::config::ApiConfig;

/// Auth context backed by a credentials file inside `dir`, optionally signed in
#[allow(dead_code)]
pub fn file_auth(dir: &TempDir, token: Option<&str>) -> (Arc<AuthContext>, PathBuf) {
    let path = dir.path().join("credentials.json");
    let store = FileStore::new(path.clone());
    if let Some(token) = token {
        store
            .save(&Credentials::bearer(token))
            .expect("failed to seed credentials");
    }
    (Arc::new(AuthContext::init(Box::new(store))), path)
}

/// Client pointed at the mock server
#[allow(dead_code)]
pub fn client_for(server: &MockServer, auth: Arc<AuthContext>) -> ApiClient {
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        ..Default::default()
    };
    ApiClient::new(&config, auth).expect("failed to build client")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

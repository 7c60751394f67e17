#![allow(dead_code, missing_docs)]

use std::path::PathBuf;

use twosub_settings::AsrSettings;

/// Settings with every endpoint pointed at `server_uri` and fast polling.
pub fn settings_for(server_uri: &str) -> AsrSettings {
    let mut settings = AsrSettings::default();
    settings.polling.interval_ms = 1;
    settings.polling.max_attempts = 5;
    settings.http.request_timeout_ms = 10_000;
    settings.providers.elevenlabs.base_url = server_uri.to_string();
    settings.providers.bijian.base_url = server_uri.to_string();
    settings.providers.jianying.base_url = server_uri.to_string();
    settings.providers.jianying.vod_url = server_uri.to_string();
    settings.providers.jianying.upload_scheme = "http".to_string();
    settings
}

/// `host:port` of a mock server URI.
pub fn host_of(server_uri: &str) -> String {
    server_uri.trim_start_matches("http://").to_string()
}

/// Temporary audio file holding `bytes`. Keep the directory alive for the
/// duration of the test.
pub fn audio_file(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp3");
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

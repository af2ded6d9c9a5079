//! Mock server fixtures

use batch_loader::decoder::TextDecoder;
use batch_loader::{Config, FetchScheduler, ManifestConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Manifest listing two images in its first group and a thumbnail group after it
pub const STUDY_MANIFEST: &str = r#"{
  "groups": [
    { "files": ["IMAGES\\IMG001.txt", "IMAGES\\IMG002.txt"] },
    ["THUMBS/T001.txt"]
  ]
}"#;

/// Serve `body` with status 200 at `route`
pub async fn serve_text(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Answer `route` with `status` and an empty body
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// HTTP scheduler with a text decoder, treating `DICOMDIR` as a manifest
pub fn text_scheduler() -> FetchScheduler<String> {
    let config = Config {
        manifest: ManifestConfig {
            file_names: vec!["DICOMDIR".to_string(), "manifest.json".to_string()],
        },
        ..Default::default()
    };
    let mut scheduler = FetchScheduler::new(config).expect("HTTP client should build");
    scheduler.register_decoder(TextDecoder::new());
    scheduler
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use edgarmirror::{HttpsClient, MirrorConfig};
use wiremock::MockServer;

#[allow(dead_code)]
pub fn fixture_path(relative: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

#[allow(dead_code)]
pub fn read_fixture(relative: impl AsRef<Path>) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture file should be readable")
}

/// Client pointed at a mock server, with fast failures and no pacing so
/// tests stay quick.
#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> HttpsClient {
    let config = MirrorConfig {
        rate_limit: 1000,
        max_retries: 0,
        ..MirrorConfig::default()
    }
    .with_archive_url(server.uri());
    HttpsClient::new(config).unwrap()
}

/// Minimal directory page in the upstream's listing shape.
#[allow(dead_code)]
pub fn listing_html(names: &[&str]) -> String {
    let mut html = String::from(
        "<html><body><h1>Index</h1><table>\
         <tr><td><a href=\"../\">Parent Directory</a></td></tr>\
         <tr><td><a href=\"?C=N;O=D\">Name</a></td></tr>",
    );
    for name in names {
        html.push_str(&format!("<tr><td><a href=\"{name}\">{name}</a></td></tr>"));
    }
    html.push_str("</table></body></html>");
    html
}

mod common;

use common::{client_for, read_fixture};
use edgarmirror::{NO_CIK_FOUND, TICKER_MANIFEST_PATH, TickerCache};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_manifest(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TICKER_MANIFEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(read_fixture("tickers/company_tickers.json")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn download_writes_cache_and_resolves_standard_tickers() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("ticker_cache.txt");

    let mut cache = TickerCache::new();
    let count = cache
        .download(&client_for(&server), &cache_file)
        .await
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(cache.cik_for("AAPL"), "0000320193");
    assert_eq!(cache.cik_for("msft"), "0000789019");
    assert_eq!(cache.cik_for("NOPE"), NO_CIK_FOUND);

    let written = std::fs::read_to_string(&cache_file).unwrap();
    assert!(written.contains("AAPL\t0000320193"));
}

#[tokio::test]
async fn cache_file_round_trips_through_load() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("ticker_cache.txt");

    let mut cache = TickerCache::new();
    cache
        .download(&client_for(&server), &cache_file)
        .await
        .unwrap();

    let mut reloaded = TickerCache::new();
    let count = reloaded.load(&cache_file).unwrap();
    assert_eq!(count, 3);
    assert_eq!(reloaded.cik_for("NVDA"), "0001045810");
}

#[tokio::test]
async fn bulk_resolution_from_ticker_file() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("ticker_cache.txt");
    let ticker_file = dir.path().join("tickers.txt");
    std::fs::write(&ticker_file, "AAPL\nZZZZ\nNVDA\n").unwrap();

    let mut cache = TickerCache::new();
    cache
        .download(&client_for(&server), &cache_file)
        .await
        .unwrap();

    let resolved = cache.resolve_ticker_file(&ticker_file, 0).unwrap();
    assert_eq!(resolved, vec!["0000320193", "0001045810"]);
}

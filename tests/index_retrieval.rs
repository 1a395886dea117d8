mod common;

use common::{client_for, listing_html};
use edgarmirror::{
    DailyIndexRetriever, DateRange, IndexRetriever, MirrorError, QuarterlyIndexRetriever,
};
use chrono::NaiveDate;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const QTR4_DIR: &str = "/Archives/edgar/daily-index/2013/QTR4";

async fn mount_listing(server: &MockServer, dir: &str, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path(dir))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(names)))
        .mount(server)
        .await;
}

async fn mount_text(server: &MockServer, remote: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(remote))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn daily_range_skips_gap_days_and_mirrors_hierarchically() {
    let server = MockServer::start().await;
    // Oct 16 is a gap: listed days only.
    mount_listing(
        &server,
        QTR4_DIR,
        &["form.20131014.idx", "form.20131015.idx", "form.20131017.idx"],
    )
    .await;
    for day in ["20131014", "20131015", "20131017"] {
        mount_text(&server, &format!("{QTR4_DIR}/form.{day}.idx"), "index body\n").await;
    }

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let range = DateRange::new(d(2013, 10, 14), d(2013, 10, 17)).unwrap();

    let remotes = retriever.remote_paths_for_range(&range).await.unwrap();
    assert_eq!(
        remotes,
        vec![
            format!("{QTR4_DIR}/form.20131014.idx"),
            format!("{QTR4_DIR}/form.20131015.idx"),
            format!("{QTR4_DIR}/form.20131017.idx"),
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    let copied = retriever
        .copy_index_files_concurrent(&remotes, dir.path(), 4, false)
        .await
        .unwrap();
    assert_eq!(copied.len(), 3);
    assert!(dir.path().join("2013/QTR4/form.20131014.idx").exists());
    assert!(dir.path().join("2013/QTR4/form.20131017.idx").exists());
    assert!(!dir.path().join("2013/QTR4/form.20131016.idx").exists());
}

#[tokio::test]
async fn range_spanning_quarters_lists_each_quarter_directory() {
    let server = MockServer::start().await;
    mount_listing(&server, QTR4_DIR, &["form.20131231.idx"]).await;
    mount_listing(
        &server,
        "/Archives/edgar/daily-index/2014/QTR1",
        &["form.20140102.idx"],
    )
    .await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let range = DateRange::new(d(2013, 12, 30), d(2014, 1, 3)).unwrap();
    let remotes = retriever.remote_paths_for_range(&range).await.unwrap();
    assert_eq!(
        remotes,
        vec![
            format!("{QTR4_DIR}/form.20131231.idx"),
            "/Archives/edgar/daily-index/2014/QTR1/form.20140102.idx".to_string(),
        ]
    );
}

#[tokio::test]
async fn recopy_without_replace_preserves_mtime() {
    let server = MockServer::start().await;
    let remote = format!("{QTR4_DIR}/form.20131014.idx");
    mount_text(&server, &remote, "index body\n").await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();

    let first = retriever
        .copy_index_file_hierarchical(&remote, dir.path(), false)
        .await
        .unwrap();
    let original = std::fs::metadata(&first).unwrap().modified().unwrap();

    // Filesystem timestamps are second-granular on some platforms.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let second = retriever
        .copy_index_file_hierarchical(&remote, dir.path(), false)
        .await
        .unwrap();
    assert_eq!(first, second);
    let preserved = std::fs::metadata(&second).unwrap().modified().unwrap();
    assert_eq!(original, preserved);

    let third = retriever
        .copy_index_file_hierarchical(&remote, dir.path(), true)
        .await
        .unwrap();
    let refreshed = std::fs::metadata(&third).unwrap().modified().unwrap();
    assert!(refreshed > original);
}

#[tokio::test]
async fn gz_remote_lands_decompressed() {
    let server = MockServer::start().await;
    let plain = "Form Type   Company Name\n";
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(plain.as_bytes()).unwrap();
    let gz_bytes = encoder.finish().unwrap();

    let remote = format!("{QTR4_DIR}/form.20131014.idx.gz");
    Mock::given(method("GET"))
        .and(path(remote.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gz_bytes))
        .mount(&server)
        .await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let local = retriever
        .copy_index_file(&remote, dir.path(), false)
        .await
        .unwrap();

    // The .gz suffix is dropped and the content is plain text.
    assert_eq!(local, dir.path().join("form.20131014.idx"));
    assert_eq!(std::fs::read_to_string(&local).unwrap(), plain);
}

#[tokio::test]
async fn zero_byte_artifact_still_materializes() {
    let server = MockServer::start().await;
    let remote = format!("{QTR4_DIR}/form.20131115.idx");
    mount_text(&server, &remote, "").await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let local = retriever
        .copy_index_file(&remote, dir.path(), false)
        .await
        .unwrap();

    // A zero-byte file distinguishes "attempted" from "not attempted".
    assert!(local.exists());
    assert_eq!(std::fs::metadata(&local).unwrap().len(), 0);
}

#[tokio::test]
async fn nearest_walks_back_to_latest_available_day() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        QTR4_DIR,
        &["form.20131010.idx", "form.20131011.idx", "form.20131014.idx"],
    )
    .await;

    let retriever = DailyIndexRetriever::new(client_for(&server));

    // Sunday the 13th has no index; Friday the 11th is the nearest.
    let (remote, actual) = retriever.nearest_index_file(d(2013, 10, 13)).await.unwrap();
    assert_eq!(remote, format!("{QTR4_DIR}/form.20131011.idx"));
    assert_eq!(actual, d(2013, 10, 11));

    // A listed target date is returned as-is.
    let (_, actual) = retriever.nearest_index_file(d(2013, 10, 14)).await.unwrap();
    assert_eq!(actual, d(2013, 10, 14));
}

#[tokio::test]
async fn missing_file_is_skipped_but_batch_completes() {
    let server = MockServer::start().await;
    let present = format!("{QTR4_DIR}/form.20131014.idx");
    let absent = format!("{QTR4_DIR}/form.20131015.idx");
    mount_text(&server, &present, "index body\n").await;
    // `absent` is unmounted, so the mock server answers 404.

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let copied = retriever
        .copy_index_files(&[absent, present], dir.path(), false)
        .await
        .unwrap();

    assert_eq!(copied.len(), 1);
    assert!(dir.path().join("2013/QTR4/form.20131014.idx").exists());
}

#[tokio::test]
async fn server_error_aborts_the_batch() {
    let server = MockServer::start().await;
    let good = format!("{QTR4_DIR}/form.20131014.idx");
    let bad = format!("{QTR4_DIR}/form.20131015.idx");
    mount_text(&server, &good, "index body\n").await;
    Mock::given(method("GET"))
        .and(path(bad.as_str()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let err = retriever
        .copy_index_files(&[good, bad], dir.path(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::Http { status: 500, .. }));
}

#[tokio::test]
async fn corrupt_gzip_leaves_no_partial_artifact() {
    let server = MockServer::start().await;
    let remote = format!("{QTR4_DIR}/form.20131014.idx.gz");
    Mock::given(method("GET"))
        .and(path(remote.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not gzip at all".to_vec()))
        .mount(&server)
        .await;

    let retriever = DailyIndexRetriever::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let err = retriever
        .copy_index_file(&remote, dir.path(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::Protocol(_)));

    // Neither the destination nor a temp file survives the failure.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn quarterly_probe_accepts_whichever_product_is_served() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/Archives/edgar/full-index/2000/QTR1",
        &["master.idx", "sitemap.xml"],
    )
    .await;
    mount_listing(
        &server,
        "/Archives/edgar/full-index/2000/QTR2",
        &["form.idx"],
    )
    .await;
    mount_text(
        &server,
        "/Archives/edgar/full-index/2000/QTR1/master.idx",
        "CIK|Company Name|Form Type|Date Filed|Filename\n---\n",
    )
    .await;
    mount_text(
        &server,
        "/Archives/edgar/full-index/2000/QTR2/form.idx",
        "Form Type\n---\n",
    )
    .await;

    let retriever = QuarterlyIndexRetriever::new(client_for(&server));
    let range = DateRange::new(d(2000, 1, 1), d(2000, 6, 30)).unwrap();
    let remotes = retriever.remote_paths_for_range(&range).await.unwrap();
    assert_eq!(
        remotes,
        vec![
            "/Archives/edgar/full-index/2000/QTR1/master.idx".to_string(),
            "/Archives/edgar/full-index/2000/QTR2/form.idx".to_string(),
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    retriever
        .copy_index_files_concurrent(&remotes, dir.path(), 2, false)
        .await
        .unwrap();
    assert!(dir.path().join("2000/QTR1/master.idx").exists());
    assert!(dir.path().join("2000/QTR2/form.idx").exists());
}

//! End-to-end batch runs through the public API with local fakes

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{
    FileTransfer, HIRES_MANIFEST, SPATIAL_MANIFEST, StaticCatalog, account, album, album_ref,
    spawn_device,
};
use media_dl::manifest::DeviceManifestLocator;
use media_dl::services::MediaSource;
use media_dl::ui::NullTerminal;
use media_dl::{
    AudioMode, BatchRequest, CompletionLedger, Config, DeviceManifestMode, Downloader, NoOpTagger,
    Selection, Services,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(dir: &TempDir, accounts: Vec<media_dl::Account>) -> Config {
    let mut config = Config {
        accounts,
        ..Default::default()
    };
    config.output.alac_save_folder = dir.path().join("alac");
    config.output.aac_save_folder = dir.path().join("aac");
    config.output.atmos_save_folder = dir.path().join("atmos");
    config.naming.song_file_format = "{SongNumber}. {SongName} {Quality}".into();
    config.retry.attempt_delay = Duration::ZERO;
    config.retry.account_pause = Duration::ZERO;
    config.ui.refresh_interval = Duration::from_millis(10);
    config
}

fn downloader(config: Config, catalog: StaticCatalog, transfer: Arc<FileTransfer>) -> Downloader {
    let services = Services::new(Arc::new(catalog), transfer, Arc::new(NoOpTagger)).unwrap();
    Downloader::new(config, services)
        .unwrap()
        .with_terminal(|| Box::new(NullTerminal))
}

fn file_names(transfer: &FileTransfer) -> Vec<String> {
    let mut names: Vec<String> = transfer
        .destinations()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn catalog_manifest_drives_file_names_and_layout() {
    let dir = tempfile::tempdir().unwrap();
    let transfer = Arc::new(FileTransfer::default());
    let dl = downloader(
        config(&dir, vec![account("Main", "us")]),
        StaticCatalog::new(album("77", 2)),
        transfer.clone(),
    );

    let report = dl
        .run_batch(
            &BatchRequest::all(album_ref("77"), AudioMode::Alac),
            Arc::new(CompletionLedger::new()),
        )
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.counters.success, 2);
    assert_eq!(
        file_names(&transfer),
        vec!["01. Track 1 16B-48.0kHz.m4a", "02. Track 2 16B-48.0kHz.m4a"]
    );
    for destination in transfer.destinations() {
        assert!(destination.starts_with(dir.path().join("alac").join("Pipeline Artist").join("Album 77")));
        assert!(destination.exists());
    }
    let requests = transfer.requests.lock().unwrap();
    match &requests[0].source {
        MediaSource::Stream(url) => assert!(url.path().ends_with("/alac/48.m3u8"), "{url}"),
        other => panic!("expected a manifest stream, got {other:?}"),
    }
}

#[tokio::test]
async fn device_manifest_replaces_catalog_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hires/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HIRES_MANIFEST))
        .mount(&server)
        .await;
    let endpoint = spawn_device(format!("{}/hires/master.m3u8", server.uri())).await;

    let dir = tempfile::tempdir().unwrap();
    let mut main = account("Main", "us");
    main.device_endpoint = Some(endpoint);
    let mut cfg = config(&dir, vec![main]);
    cfg.manifest.device_manifest = DeviceManifestMode::HiRes;
    cfg.manifest.device_timeout = Duration::from_secs(5);

    let transfer = Arc::new(FileTransfer::default());
    let mut services = Services::new(
        Arc::new(StaticCatalog::new(album("78", 1))),
        transfer.clone(),
        Arc::new(NoOpTagger),
    )
    .unwrap();
    services.locator = Some(Arc::new(DeviceManifestLocator::new(cfg.manifest.device_timeout)));
    let dl = Downloader::new(cfg, services)
        .unwrap()
        .with_terminal(|| Box::new(NullTerminal));

    let report = dl
        .run_batch(
            &BatchRequest::all(album_ref("78"), AudioMode::Alac),
            Arc::new(CompletionLedger::new()),
        )
        .await
        .unwrap();

    assert_eq!(report.counters.success, 1);
    assert_eq!(file_names(&transfer), vec!["01. Track 1 24B-192.0kHz.m4a"]);
    let requests = transfer.requests.lock().unwrap();
    match &requests[0].source {
        MediaSource::Stream(url) => {
            assert!(url.as_str().starts_with(&server.uri()), "{url}");
            assert!(url.path().ends_with("/hires/alac/192.m3u8"), "{url}");
        }
        other => panic!("expected a manifest stream, got {other:?}"),
    }
}

#[tokio::test]
async fn device_manifest_serves_spatial_batches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spatial/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SPATIAL_MANIFEST))
        .expect(1)
        .mount(&server)
        .await;
    let endpoint = spawn_device(format!("{}/spatial/master.m3u8", server.uri())).await;

    let dir = tempfile::tempdir().unwrap();
    let mut main = account("Main", "us");
    main.device_endpoint = Some(endpoint);
    let mut cfg = config(&dir, vec![main]);
    cfg.manifest.device_manifest = DeviceManifestMode::All;

    let transfer = Arc::new(FileTransfer::default());
    let mut services = Services::new(
        Arc::new(StaticCatalog::new(album("82", 1))),
        transfer.clone(),
        Arc::new(NoOpTagger),
    )
    .unwrap();
    services.locator = Some(Arc::new(DeviceManifestLocator::new(cfg.manifest.device_timeout)));
    let dl = Downloader::new(cfg, services)
        .unwrap()
        .with_terminal(|| Box::new(NullTerminal));

    let report = dl
        .run_batch(
            &BatchRequest::all(album_ref("82"), AudioMode::Atmos),
            Arc::new(CompletionLedger::new()),
        )
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failed_ordinals);
    assert_eq!(file_names(&transfer), vec!["01. Track 1 2768 kbps.m4a"]);
    let requests = transfer.requests.lock().unwrap();
    match &requests[0].source {
        MediaSource::Stream(url) => assert!(url.path().ends_with("/spatial/atmos/2768.m3u8"), "{url}"),
        other => panic!("expected a manifest stream, got {other:?}"),
    }
}

#[tokio::test]
async fn legacy_item_uses_legacy_source() {
    let dir = tempfile::tempdir().unwrap();
    let transfer = Arc::new(FileTransfer::default());
    let mut catalog = StaticCatalog::new(album("79", 2));
    catalog.legacy.insert("7902".into());
    let dl = downloader(
        config(&dir, vec![account("Main", "us")]),
        catalog,
        transfer.clone(),
    );

    let mut request = BatchRequest::all(album_ref("79"), AudioMode::Alac);
    request.selection = Selection::Item("7902".into());
    let report = dl
        .run_batch(&request, Arc::new(CompletionLedger::new()))
        .await
        .unwrap();

    assert_eq!(report.counters.total, 1);
    assert_eq!(file_names(&transfer), vec!["02. Track 2 256kbps.m4a"]);
    let requests = transfer.requests.lock().unwrap();
    assert_eq!(
        requests[0].source,
        MediaSource::Legacy {
            item_id: "7902".into()
        }
    );
}

#[tokio::test]
async fn inventory_reports_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let transfer = Arc::new(FileTransfer::default());
    let mut catalog = StaticCatalog::new(album("80", 2));
    catalog.legacy.insert("8002".into());
    let dl = downloader(
        config(&dir, vec![account("Main", "us")]),
        catalog,
        transfer.clone(),
    );

    let report = dl
        .inventory(&BatchRequest::all(album_ref("80"), AudioMode::Alac))
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    let first = report[0].inventory.as_ref().unwrap();
    assert_eq!(first.variants.len(), 2);
    assert_eq!(first.variants[0].average_bandwidth, 1_400_000);
    assert!(report[1].inventory.is_none());
    assert!(report[1].error.is_some());

    assert!(transfer.destinations().is_empty());
    assert!(!dir.path().join("alac").exists(), "inventory writes nothing");
}

#[tokio::test]
async fn long_names_are_shortened_to_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut collection = album("81", 1);
    collection.name = "A".repeat(120);
    collection.items[0].name = "B".repeat(120);
    let mut cfg = config(&dir, vec![account("Main", "us")]);
    let limit = dir.path().join("alac").to_string_lossy().chars().count() + 80;
    cfg.output.max_path_length = Some(limit);

    let transfer = Arc::new(FileTransfer::default());
    let dl = downloader(cfg, StaticCatalog::new(collection), transfer.clone());
    let report = dl
        .run_batch(
            &BatchRequest::all(album_ref("81"), AudioMode::Alac),
            Arc::new(CompletionLedger::new()),
        )
        .await
        .unwrap();

    assert_eq!(report.counters.success, 1);
    let destination = &transfer.destinations()[0];
    assert!(destination.exists());
    assert!(
        destination.to_string_lossy().chars().count() <= limit,
        "{} exceeds {limit}",
        destination.display()
    );
    assert!(destination.to_string_lossy().ends_with(".m4a"));
}

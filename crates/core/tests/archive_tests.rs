//! Archival against an in-process fixture server
#![cfg(feature = "fetch")]
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::http::{StatusCode, header};
use axum::routing::get;
use shelfmark_core::uri::{ARCHIVE_ROOT, archival_name};
use shelfmark_core::*;
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

fn html(body: &'static str) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

fn archiver() -> Archiver {
    Archiver::new(ArchiverConfig::builder().concurrency(2).build()).unwrap()
}

#[tokio::test]
async fn test_archive_dedup() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new()
        .route(
            "/page",
            get(|| async {
                html(
                    r#"<html><head>
                    <link rel="stylesheet" href="/x.css">
                    <link rel="stylesheet" href="x.css">
                    <link rel="stylesheet" href="/x.css?utm_source=y">
                    </head><body><p>hello</p></body></html>"#,
                )
            }),
        )
        .route(
            "/x.css",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "text/css")], "p { color: red }")
                }
            }),
        );
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("archive").join("1");
    let report = archiver().archive(ArchiveRequest::new(format!("http://{addr}/page")), &dest).await.unwrap();

    let css_url = format!("http://{addr}/x.css");
    let css_name = archival_name(&css_url);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(report.downloaded, vec![css_url]);
    assert!(report.warnings.is_empty());

    let reader = ArchiveReader::open(&dest).unwrap();
    assert_eq!(reader.names().unwrap(), vec![ARCHIVE_ROOT.to_string(), css_name.clone()]);

    let (root, content_type) = reader.read("").unwrap();
    let root = String::from_utf8(root).unwrap();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(root.matches(&css_name).count(), 3);
}

#[tokio::test]
async fn test_page_framing_itself_is_fetched_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/page",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                html(r#"<html><body><iframe src="/page"></iframe><p>hello</p></body></html>"#)
            }
        }),
    );
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("3");
    let url = format!("http://{addr}/page?utm_source=feed#top");
    let report = archiver().archive(ArchiveRequest::new(url), &dest).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(report.downloaded.is_empty());
    assert_eq!(report.saved, 1);
}

#[tokio::test]
async fn test_archive_follows_stylesheets_and_iframes() {
    let app = Router::new()
        .route(
            "/page",
            get(|| async {
                html(
                    r#"<html><head><link rel="stylesheet" href="/css/site.css"></head>
                    <body><iframe src="/frame"></iframe><a href="/other">other</a></body></html>"#,
                )
            }),
        )
        .route(
            "/css/site.css",
            get(|| async { ([(header::CONTENT_TYPE, "text/css")], "body { background: url(../img/bg.png) }") }),
        )
        .route("/img/bg.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG) }))
        .route("/frame", get(|| async { html(r#"<html><body><img src="/img/inner.png"></body></html>"#) }))
        .route("/img/inner.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG) }));
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("2");
    let report = archiver().archive(ArchiveRequest::new(format!("http://{addr}/page")), &dest).await.unwrap();
    assert_eq!(report.saved, 5);

    let reader = ArchiveReader::open(&dest).unwrap();
    let name = |path: &str| archival_name(&format!("http://{addr}{path}"));

    let (css, _) = reader.read(&name("/css/site.css")).unwrap();
    assert_eq!(String::from_utf8(css).unwrap(), format!("body {{ background: url(\"{}\") }}", name("/img/bg.png")));

    let (frame, _) = reader.read(&name("/frame")).unwrap();
    assert!(String::from_utf8(frame).unwrap().contains(&name("/img/inner.png")));

    let (png, content_type) = reader.read(&name("/img/bg.png")).unwrap();
    assert_eq!(png, PNG);
    assert_eq!(content_type, "image/png");
    assert!(!reader.has(&name("/other")).unwrap());
}

#[tokio::test]
async fn test_failed_subresource_is_a_warning() {
    let app = Router::new()
        .route(
            "/page",
            get(|| async { html(r#"<html><body><img src="/missing.png"><img src="/ok.png"></body></html>"#) }),
        )
        .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .route("/ok.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG) }));
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("3");
    let report = archiver().archive(ArchiveRequest::new(format!("http://{addr}/page")), &dest).await.unwrap();

    assert_eq!(report.saved, 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("missing.png"));
    assert!(ArchiveReader::open(&dest).unwrap().has(&archival_name(&format!("http://{addr}/ok.png"))).unwrap());
}

#[tokio::test]
async fn test_unreachable_root_fails() {
    let app = Router::new().route("/gone", get(|| async { StatusCode::GONE }));
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("4");
    let err = archiver().archive(ArchiveRequest::new(format!("http://{addr}/gone")), &dest).await.unwrap_err();

    assert!(matches!(err, ShelfmarkError::FetchFailed(_)));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_pipeline_stores_thumbnail_and_archive() {
    let mut cover = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(64, 48, image::Rgb([200, 40, 40])))
        .write_to(&mut std::io::Cursor::new(&mut cover), image::ImageFormat::Png)
        .unwrap();
    let cover: &'static [u8] = Box::leak(cover.into_boxed_slice());

    let page = std::fs::read_to_string(format!("{}/tests/fixtures/article.html", env!("CARGO_MANIFEST_DIR"))).unwrap();
    let page: &'static str = Box::leak(page.into_boxed_str());
    let app = Router::new()
        .route("/posts/ownership", get(move || async move { html(page) }))
        .route("/images/cover.png", get(move || async move { ([(header::CONTENT_TYPE, "image/png")], cover) }));
    let addr = serve(app).await;

    let dir = TempDir::new().unwrap();
    let data = DataDir::new(dir.path());
    let processor = Processor::new(&FetchConfig::default(), ArchiverConfig::default()).unwrap();
    let url = format!("http://{addr}/posts/ownership");
    let fetched = processor.download(&url).await.unwrap();

    let mut request = ProcessRequest::new(Bookmark { id: 7, ..Bookmark::new(url) }, fetched, data.clone());
    request.create_archive = true;
    let outcome = processor.process(request).await.unwrap();

    assert_eq!(outcome.bookmark.image_url, "/bookmark/7/thumb");
    assert!(outcome.bookmark.has_content);
    let thumb = image::load_from_memory(&std::fs::read(data.thumbnail(7)).unwrap()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (600, 400));

    let report = outcome.archive.unwrap();
    assert_eq!(report.path, data.archive(7));
    assert!(ArchiveReader::open(&data.archive(7)).unwrap().has(ARCHIVE_ROOT).unwrap());
}

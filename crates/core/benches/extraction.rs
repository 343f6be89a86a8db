use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use shelfmark_core::dom::Dom;
use shelfmark_core::{extract_html, is_probably_readable, parse_with_url, scan_css, scan_js};
use url::Url;

const ARTICLE: &str = include_str!("../tests/fixtures/article.html");
const PAGE_URL: &str = "https://journal.example/posts/ownership";

fn bench_parse(c: &mut Criterion) {
    let small = ARTICLE.to_string();
    let large = ARTICLE.repeat(20);

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("small", "5KB"), &small, |b, html| {
        b.iter(|| Dom::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("large", "100KB"), &large, |b, html| {
        b.iter(|| Dom::parse(black_box(html)))
    });

    group.finish();
}

fn bench_readability(c: &mut Criterion) {
    c.bench_function("readability", |b| b.iter(|| parse_with_url(black_box(ARTICLE), PAGE_URL)));
    c.bench_function("readable_check", |b| b.iter(|| is_probably_readable(black_box(ARTICLE))));
}

fn bench_archive_extraction(c: &mut Criterion) {
    let base = Url::parse(PAGE_URL).unwrap();

    c.bench_function("extract_html", |b| b.iter(|| extract_html(black_box(ARTICLE), &base)));
}

fn bench_scanners(c: &mut Criterion) {
    let base = Url::parse("https://journal.example/css/site.css").unwrap();
    let css = "body { background: url('../img/bg.png') } .a::after { content: \"url(x)\" } "
        .repeat(200);
    let js = "var icon = \"/img/icon.png\"; // \"/not/a/string.png\"\nvar r = /a\\/b/g; "
        .repeat(200);

    c.bench_function("scan_css", |b| b.iter(|| scan_css(black_box(&css), &base)));
    c.bench_function("scan_js", |b| b.iter(|| scan_js(black_box(&js), &base)));
}

criterion_group!(
    benches,
    bench_parse,
    bench_readability,
    bench_archive_extraction,
    bench_scanners
);
criterion_main!(benches);

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use qiitadl_core::{Document, ExtractConfig, MarkdownConfig, convert_to_markdown, normalize_markdown, parse_article};

fn fixture() -> String {
    std::fs::read_to_string("../../tests/fixtures/qiita/article.html").unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let html = fixture();

    c.bench_function("parse", |b| b.iter(|| Document::parse(black_box(&html))));
}

fn bench_parse_article(c: &mut Criterion) {
    let html = fixture();
    let config = ExtractConfig::default();

    c.bench_function("parse_article", |b| b.iter(|| parse_article(black_box(&html), &config)));
}

fn bench_convert(c: &mut Criterion) {
    let article = parse_article(&fixture(), &ExtractConfig::default()).unwrap();
    let body = article.content.to_html();
    let config = MarkdownConfig::default();

    c.bench_function("convert_to_markdown", |b| b.iter(|| convert_to_markdown(black_box(&body), &config)));
}

fn bench_normalize(c: &mut Criterion) {
    let markdown = "##見出し\n\n\\*\\*太字\\*\\*です。\\*斜体\\*と 2 \\* 3。\n\n```\n#include <stdio.h>\n```\n".repeat(200);

    c.bench_function("normalize_markdown", |b| b.iter(|| normalize_markdown(black_box(&markdown))));
}

criterion_group!(benches, bench_parse, bench_parse_article, bench_convert, bench_normalize);
criterion_main!(benches);

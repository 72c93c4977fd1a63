//! Performance benchmarks for TOC parsing and alias resolution.
//!
//! Run with: `cargo bench --bench resolution`
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | TOC parse | Outline with duplicate detection |
//! | TOC load, cold | Index scans plus parse |
//! | TOC load, cached | LRU hit |
//! | Latest resolution | Tag scan over every unit of a topic |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tokio::runtime::Runtime;

use doc_version_kernel::types::{MANUALS_PAGE, VERSIONS_PAGE};
use doc_version_kernel::{
    AllowAll, ContentKey, DocsKernel, InMemoryWiki, KernelConfig, RequestContext, TocOutline,
};

fn toc_markup(topics: usize) -> String {
    let mut raw = String::new();
    for i in 0..topics {
        if i % 10 == 0 {
            raw.push_str(&format!("Section {}\n", i / 10));
        }
        raw.push_str(&format!("* {{{{#topic:Topic Number {}}}}}\n", i));
    }
    raw
}

/// Wiki with `versions` versions and `topics` topics, every topic branched
/// once per version.
fn build_kernel(runtime: &Runtime, versions: usize, topics: usize) -> DocsKernel<InMemoryWiki> {
    let wiki = InMemoryWiki::new();
    let definition: String = (1..=versions)
        .map(|v| format!("{{{{#version:{}.0|released}}}}\n", v))
        .collect();
    wiki.insert_page(ContentKey::new(VERSIONS_PAGE), definition, Vec::<String>::new());
    wiki.insert_page(ContentKey::new(MANUALS_PAGE), "{{#manual:User|User Manual}}", Vec::<String>::new());

    for v in 1..=versions {
        let name = format!("{}.0", v);
        wiki.insert_page(ContentKey::toc("User", &name), toc_markup(topics), [format!("V:{}", name)]);
        for t in 0..topics {
            let slug = format!("TopicNumber{}", t);
            wiki.insert_page(ContentKey::topic("User", &slug, &name), "", [format!("V:{}", name)]);
        }
    }

    runtime
        .block_on(DocsKernel::load(Arc::new(wiki), Arc::new(AllowAll), KernelConfig::default()))
        .expect("seeded wiki loads")
}

/// Benchmark TOC outline parsing.
fn bench_toc_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("toc_parse");

    for topics in [10, 100, 1000] {
        let raw = toc_markup(topics);
        group.throughput(Throughput::Elements(topics as u64));
        group.bench_with_input(BenchmarkId::new("topics", topics), &raw, |b, raw| {
            b.iter(|| TocOutline::parse_validated(black_box(raw)).expect("no duplicates"))
        });
    }

    group.finish();
}

/// Benchmark TOC loads with and without the cache.
fn bench_toc_load(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let kernel = build_kernel(&runtime, 3, 100);
    let kernel = &kernel;

    let mut group = c.benchmark_group("toc_load");
    group.bench_function("cold", |b| {
        b.to_async(&runtime).iter(|| async move {
            kernel.toc().cache().clear();
            kernel.toc().load("User", "2.0").await.expect("toc loads")
        })
    });
    group.bench_function("cached", |b| {
        b.to_async(&runtime).iter(|| async move { kernel.toc().load("User", "2.0").await.expect("toc loads") })
    });
    group.finish();
}

/// Benchmark latest resolution as the number of versions grows.
fn bench_latest_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("latest_resolution");

    for versions in [2, 10, 50] {
        let kernel = build_kernel(&runtime, versions, 20);
        let kernel = &kernel;
        let ctx = RequestContext::anonymous();
        let ctx = &ctx;
        group.bench_with_input(BenchmarkId::new("versions", versions), &versions, |b, _| {
            b.to_async(&runtime).iter(|| async move {
                kernel
                    .resolve(ctx, black_box("Documentation/latest/User/TopicNumber7"))
                    .await
                    .expect("resolves")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_toc_parse, bench_toc_load, bench_latest_resolution);
criterion_main!(benches);

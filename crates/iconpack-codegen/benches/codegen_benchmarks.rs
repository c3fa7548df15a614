use criterion::{criterion_group, criterion_main, Criterion};
use iconpack_codegen::{generate_all, normalize, CollisionPolicy, RawAsset};
use std::hint::black_box;

const SAMPLE: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" id="Layer_1" width="512" height="512" "#,
    r##"viewBox="0 0 24 24" enable-background="new 0 0 24 24" color="#333">"##,
    r#"<path d="M12 2L2 7l10 5 10-5-10-5zm0 7.5L4.5 6 12 2.5 19.5 6 12 9.5z"/>"#,
    r#"<path d="M2 17l10 5 10-5M2 12l10 5 10-5"/></svg>"#
);

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_root_tag", |b| {
        b.iter(|| normalize(black_box(SAMPLE)));
    });
}

fn bench_generate_all(c: &mut Criterion) {
    let assets: Vec<RawAsset> = (0..200)
        .map(|i| RawAsset::new(format!("icon-{i}.svg"), SAMPLE))
        .collect();
    c.bench_function("generate_all_200_icons", |b| {
        b.iter(|| generate_all(black_box(&assets), CollisionPolicy::Fail).unwrap());
    });
}

criterion_group!(benches, bench_normalize, bench_generate_all);
criterion_main!(benches);

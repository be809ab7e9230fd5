use card_features::{MatcherConfig, SymbolMatcher};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};

/// Dark comb-like symbol with `teeth` teeth on a bright background
fn create_symbol(teeth: u32) -> GrayImage {
    let width = teeth * 10 + 16;
    GrayImage::from_fn(width, 52, |x, y| {
        let (x, y) = (x as i32 - 8, y as i32 - 10);
        let span = (teeth * 10) as i32 - 4;
        let base = (0..span).contains(&x) && (22..32).contains(&y);
        let tooth = (0..span).contains(&x) && (0..22).contains(&y) && x % 10 < 6;
        if base || tooth { Luma([30]) } else { Luma([220]) }
    })
}

fn bench_describe(c: &mut Criterion) {
    let matcher = SymbolMatcher::new(MatcherConfig::default()).unwrap();
    let mut group = c.benchmark_group("describe");

    for teeth in [2u32, 6, 12] {
        let symbol = create_symbol(teeth);
        group.bench_with_input(BenchmarkId::from_parameter(teeth), &symbol, |b, img| {
            b.iter(|| matcher.describe(black_box(img)))
        });
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let matcher = SymbolMatcher::new(MatcherConfig::default()).unwrap();
    let mut group = c.benchmark_group("match_descriptors");

    for teeth in [2u32, 6, 12] {
        let set = matcher.describe(&create_symbol(teeth));
        group.bench_with_input(BenchmarkId::from_parameter(set.len()), &set, |b, set| {
            b.iter(|| matcher.match_descriptors(black_box(set), black_box(set)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_describe, bench_match);
criterion_main!(benches);

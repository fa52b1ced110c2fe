//! Benchmarks for retrieval over a synthetic corpus.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use selene::builder::build_structural_graph;
use selene::context::Context;
use selene::graph::KnowledgeGraph;
use selene::migrate::{CorpusRecord, VecCorpus, migrate_knowledge};
use selene::ontology::catalog::{LAYERS, PLANETS, SIGNS};
use selene::query::{
    ChartInput, ChartPlacement, ReleasingPeriod, SearchFilters, chart_grounded_knowledge,
    filtered_search,
};

const AUTHORS: [&str; 6] = ["Valens", "Dorotheus", "Ptolemy", "Lilly", "Greene", "Brennan"];

fn synthetic_graph(passages: usize) -> KnowledgeGraph {
    let kg = KnowledgeGraph::new();
    build_structural_graph(&kg).unwrap();

    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let records = (0..passages)
        .map(|i| {
            let planet = PLANETS[..7].choose(&mut rng).unwrap().id;
            let sign = SIGNS.choose(&mut rng).unwrap().id;
            let house = rng.gen_range(1..=12u8);
            CorpusRecord::new(format!("p{i}"), format!("{planet} in {sign}, house {house}"))
                .author(*AUTHORS.choose(&mut rng).unwrap())
                .layer(LAYERS.choose(&mut rng).unwrap().id)
                .trust_tier(rng.gen_range(1..=4))
                .planets(planet)
                .signs(sign)
                .houses(house.to_string())
        })
        .collect();
    migrate_knowledge(&kg, &mut VecCorpus::new(records), 500, &Context::background()).unwrap();
    kg
}

fn bench_filtered_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_search");
    for passages in [1_000, 10_000] {
        let kg = synthetic_graph(passages);
        let ctx = Context::background();
        let filters = SearchFilters {
            planet: Some("mars".into()),
            sign: Some("aries".into()),
            layer: Some("technical".into()),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(passages), &kg, |bench, kg| {
            bench.iter(|| black_box(filtered_search(kg, &filters, 10, &ctx).unwrap()))
        });
    }
    group.finish();
}

fn bench_chart(c: &mut Criterion) {
    let kg = synthetic_graph(10_000);
    let ctx = Context::background();
    let chart = ChartInput {
        placements: PLANETS[..7]
            .iter()
            .zip(SIGNS.iter())
            .enumerate()
            .map(|(i, (planet, sign))| ChartPlacement::new(planet.id, sign.id, Some(i as u8 + 1)))
            .collect(),
        is_day: Some(true),
        lord_of_year: Some("saturn".into()),
        releasing: Some(ReleasingPeriod {
            sign: "capricorn".into(),
            ruler: None,
        }),
        ..Default::default()
    };

    let mut group = c.benchmark_group("chart_grounded_knowledge");
    for workers in [1, 4] {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &pool, |bench, pool| {
            bench.iter(|| black_box(chart_grounded_knowledge(&kg, &chart, 3, pool, &ctx).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_filtered_search, bench_chart);
criterion_main!(benches);

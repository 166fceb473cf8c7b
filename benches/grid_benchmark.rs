use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use paralog::grid::GridEvaluator;
use paralog::survival::SurvivalModel;
use paralog::types::{CategoryMixture, CategoryParameters};

fn benchmark_survival(c: &mut Criterion) {
    let parameters = CategoryParameters::default();
    let mut group = c.benchmark_group("survival_probability");
    for truncation in [20_usize, 100, 170] {
        let model = SurvivalModel::new(truncation).expect("truncation within bounds");
        let id = BenchmarkId::new("alt_func", truncation);
        group.bench_with_input(id, &model, |b, model| {
            let params = &parameters.alt_func;
            b.iter(|| model.survival_probability(params, black_box(0.37)));
        });
    }
    group.finish();
}

fn benchmark_grid(c: &mut Criterion) {
    let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.25).expect("valid mixture");
    let mut group = c.benchmark_group("grid_evaluation");
    for time_points in [11_usize, 51, 101] {
        let evaluator = GridEvaluator::default().with_time_points(time_points);
        group.throughput(Throughput::Elements((time_points * time_points) as u64));
        group.bench_with_input(
            BenchmarkId::new("evaluate", time_points),
            &evaluator,
            |b, evaluator| {
                b.iter(|| {
                    let grid = evaluator.evaluate(black_box(&mixture));
                    black_box(grid.expect("grid evaluates").summary());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(grid_benchmark, benchmark_survival, benchmark_grid);
criterion_main!(grid_benchmark);

use criterion::Criterion;
use newt::{
    population_init,
    random::{ProbBinding, ProbStatic, WyRng},
    DeltaSpeciation, FitnessProportionStats, SelectionReproduction,
};

fn bench_reproduce(bench: &mut Criterion) {
    let count = 100;
    let (mut population, mut inno) = population_init(4, 2, count);
    let mut rng = ProbBinding::new(ProbStatic::default(), WyRng::seeded(0x800));
    for genome in population.species[0].members.iter_mut() {
        for _ in 0..10 {
            genome.mutate(&mut rng, &mut inno);
        }
    }

    let mut reproduction =
        SelectionReproduction::new(DeltaSpeciation::new(2.), FitnessProportionStats::default(), 8);
    reproduction.init(&mut population).unwrap();
    population.evaluate(|genome| genome.connections.len() as f64);

    bench.bench_function("reproduce-generation", |b| {
        b.iter(|| {
            let mut generation = population.clone();
            reproduction
                .invoke(&mut generation, &mut inno, &mut rng)
                .unwrap();
            generation
        })
    });
}

pub fn benches() {
    #[cfg(not(feature = "smol_bench"))]
    let mut criterion: criterion::Criterion<_> = Criterion::default()
        .sample_size(1000)
        .significance_level(0.1);
    #[cfg(feature = "smol_bench")]
    let mut criterion: criterion::Criterion<_> = {
        use core::time::Duration;
        Criterion::default()
            .measurement_time(Duration::from_millis(1))
            .sample_size(10)
            .nresamples(1)
            .without_plots()
            .configure_from_args()
    };
    bench_reproduce(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}

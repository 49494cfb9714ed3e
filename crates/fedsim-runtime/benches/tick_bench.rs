use criterion::{criterion_group, criterion_main, Criterion};
use fedsim_core::{SimConfig, ToolSettings};
use fedsim_runtime::{run_ticks, Simulation};

fn bench_ticks(c: &mut Criterion) {
    let config = SimConfig {
        pause_each_quarter: false,
        history_capacity: Some(512),
        ..SimConfig::default().seeded(42)
    };
    let mut sim = Simulation::new(config.clone()).expect("valid config");
    sim.set_tools(ToolSettings {
        fed_funds_rate: 3.5,
        ..ToolSettings::INITIAL
    })
    .expect("finite tools");
    sim.toggle_play();
    c.bench_function("sim_tick", |b| {
        b.iter(|| {
            if run_ticks(&mut sim, 1) == 0 {
                // Term milestone or crash; start over.
                sim.reset();
                sim.toggle_play();
            }
        })
    });

    c.bench_function("sim_first_term", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(config.clone()).expect("valid config");
            sim.toggle_play();
            run_ticks(&mut sim, 48)
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);

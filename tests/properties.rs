//! Cross-cutting invariants that must hold for any valid environment,
//! independent of the literal scenarios in `spec_scenarios.rs`.

use molflow::{
    AoSStore, Container, DirectSum, Domain, Environment, Force, InteractionScope, LinkedCells, NoUserData,
    ParticleSpec, ParticleStore, System, Vec3,
};

/// 1 & 2: dense ids/types are exactly `[0, N)`/`[0, T)`, and every dense id
/// maps back to the index that reports the same id.
#[test]
fn density_of_indices_and_id_index_inverse() {
    let mut env: Environment<NoUserData> = Environment::new();
    for i in 0..5u64 {
        env = env.add_particle(ParticleSpec::new(i % 2, Vec3::new(i as f64, 0.0, 0.0), 1.0).with_id(100 + i));
    }
    let env = env
        .with_interaction(Force::NoForce, InteractionScope::ToType(0))
        .with_interaction(Force::NoForce, InteractionScope::ToType(1))
        .with_domain(Domain::Fixed { origin: Vec3::splat(-1.0), extent: Vec3::splat(10.0) });

    let built = env.build().unwrap();
    let mut ids: Vec<u32> = built.id_map.values().copied().collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..5).collect::<Vec<_>>());

    let mut types: Vec<u16> = built.type_map.values().copied().collect();
    types.sort_unstable();
    assert_eq!(types, vec![0, 1]);

    let store = AoSStore::build(built.particles);
    for id in 0..5u32 {
        let index = store.id_to_index(id).unwrap();
        assert_eq!(store.record(index).id, id);
    }
}

/// 3: Newton-3 pairwise accumulation conserves total force to float noise.
#[test]
fn newton3_conserves_total_force() {
    let env: Environment<NoUserData> = Environment::new()
        .add_particle(ParticleSpec::new(0, Vec3::new(0.0, 0.0, 0.0), 1.0))
        .add_particle(ParticleSpec::new(0, Vec3::new(1.1, 0.0, 0.0), 2.0))
        .add_particle(ParticleSpec::new(0, Vec3::new(0.3, 1.4, 0.0), 0.5))
        .with_interaction(Force::lennard_jones(1.0, 1.0, Some(3.0)), InteractionScope::ToType(0))
        .with_domain(Domain::Fixed { origin: Vec3::splat(-5.0), extent: Vec3::splat(10.0) });

    let built = env.build().unwrap();
    let store = AoSStore::build(built.particles);
    let container = DirectSum::build(
        store,
        &built.simulation_box,
        built.create_info.periodic,
        &built.create_info.force_schema,
    );
    let mut system = System::new(built.simulation_box, container, built.force_table, built.boundary_table, 3);
    system.update_forces();

    let store = system.container().store();
    let total = (0..store.len()).fold(Vec3::ZERO, |acc, i| acc + store.force(i));
    assert!(total.length() < 1e-9, "total force was {total:?}");
}

/// 5: DirectSum and LinkedCells agree on per-particle force for identical
/// inputs, once the cutoff fits comfortably inside both.
#[test]
fn direct_sum_and_linked_cells_agree_on_forces() {
    let positions = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.8, 1.0, 1.0),
        Vec3::new(1.0, 1.9, 1.0),
        Vec3::new(5.0, 5.0, 5.0),
    ];

    let build_system_direct = || {
        let mut env: Environment<NoUserData> = Environment::new();
        for &p in &positions {
            env = env.add_particle(ParticleSpec::new(0, p, 1.0));
        }
        env.with_interaction(Force::lennard_jones(1.0, 1.0, Some(1.5)), InteractionScope::ToType(0))
            .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) })
    };

    let built_ds = build_system_direct().build().unwrap();
    let store_ds = AoSStore::build(built_ds.particles);
    let ds = DirectSum::build(
        store_ds,
        &built_ds.simulation_box,
        built_ds.create_info.periodic,
        &built_ds.create_info.force_schema,
    );
    let mut system_ds = System::new(built_ds.simulation_box, ds, built_ds.force_table, built_ds.boundary_table, 3);
    system_ds.update_forces();

    let built_lc = build_system_direct().build().unwrap();
    let store_lc = AoSStore::build(built_lc.particles);
    let lc = LinkedCells::build(
        store_lc,
        &built_lc.simulation_box,
        built_lc.create_info.periodic,
        &built_lc.create_info.force_schema,
    )
    .unwrap();
    let mut system_lc = System::new(built_lc.simulation_box, lc, built_lc.force_table, built_lc.boundary_table, 3);
    system_lc.update_forces();

    let store_ds = system_ds.container().store();
    let store_lc = system_lc.container().store();
    for i in 0..positions.len() {
        let fds = store_ds.force(i);
        let flc = store_lc.force(i);
        assert!((fds - flc).length() < 1e-9, "particle {i}: direct {fds:?} vs cells {flc:?}");
    }
}

/// 6: with periodic boundaries on every axis, wrapped-pair forces still
/// cancel under Newton-3 — wrapping changes the displacement a force law
/// sees, not whether the two halves of a pair are opposite.
#[test]
fn periodic_wrap_conserves_total_force() {
    let env: Environment<NoUserData> = Environment::new()
        .add_particle(ParticleSpec::new(0, Vec3::new(0.5, 5.0, 5.0), 1.0))
        .add_particle(ParticleSpec::new(0, Vec3::new(9.5, 5.0, 5.0), 1.0))
        .with_interaction(Force::harmonic(1.0, 0.0, 2.0), InteractionScope::ToType(0))
        .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) })
        .with_boundary(molflow::Face::XMinus, molflow::Boundary::Periodic)
        .with_boundary(molflow::Face::XPlus, molflow::Boundary::Periodic);

    let built = env.build().unwrap();
    let store = AoSStore::build(built.particles);
    let container = DirectSum::build(
        store,
        &built.simulation_box,
        built.create_info.periodic,
        &built.create_info.force_schema,
    );
    let mut system = System::new(built.simulation_box, container, built.force_table, built.boundary_table, 3);
    system.update_forces();

    let store = system.container().store();
    let total = (0..store.len()).fold(Vec3::ZERO, |acc, i| acc + store.force(i));
    assert!(total.length() < 1e-9, "total force was {total:?}");
}

/// 9: a region query returns exactly the alive particles inside it, no more
/// and no less.
#[test]
fn region_query_returns_only_alive_particles_inside_region() {
    let env: Environment<NoUserData> = Environment::new()
        .add_particle(ParticleSpec::new(0, Vec3::new(1.0, 1.0, 1.0), 1.0))
        .add_particle(ParticleSpec::new(0, Vec3::new(8.0, 8.0, 8.0), 1.0))
        .add_particle(ParticleSpec::new(0, Vec3::new(1.5, 1.5, 1.5), 1.0).with_state(molflow::ParticleState::DEAD))
        .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) });

    let built = env.build().unwrap();
    let store = AoSStore::build(built.particles);
    let container = DirectSum::build(
        store,
        &built.simulation_box,
        built.create_info.periodic,
        &built.create_info.force_schema,
    );

    let region = molflow::Box3::new(Vec3::ZERO, Vec3::splat(2.0));
    let indices = container.collect_indices_in_region(&region);

    assert_eq!(indices, vec![0]);
}

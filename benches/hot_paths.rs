use attack_map::attack::{AttackEvent, AttackKind, AttackRenderer};
use attack_map::data::decode_world;
use attack_map::geo::GeoCoordinate;
use attack_map::map::{Atlas, GeoPath, Projection};
use attack_map::scene::Scene;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

/// A grid of `n` x `n` square countries sharing their edges
fn grid_topology(n: usize) -> String {
    let side = 10;
    let mut arcs = Vec::new();
    let mut geometries = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let (x, y) = (col * side, row * side);
            // One closed ring per cell, delta encoded
            arcs.push(format!(
                "[[{x},{y}],[{side},0],[0,{side}],[-{side},0],[0,-{side}]]"
            ));
            let id = arcs.len() - 1;
            geometries.push(format!(
                r#"{{"type":"Polygon","arcs":[[{id}]],"id":"{}","properties":{{"name":"C{id}"}}}}"#,
                100 + id
            ));
        }
    }
    let mut out = String::new();
    let _ = write!(
        out,
        r#"{{"type":"Topology","transform":{{"scale":[0.3,0.15],"translate":[-150,-70]}},"arcs":[{}],"objects":{{"countries":{{"type":"GeometryCollection","geometries":[{}]}}}}}}"#,
        arcs.join(","),
        geometries.join(",")
    );
    out
}

fn bench_projection(c: &mut Criterion) {
    let projection = Projection::fitted(1200.0, 600.0, 170.0);
    c.bench_function("project_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..10_000 {
                let lon = (i % 360) as f64 - 180.0;
                let lat = (i % 170) as f64 - 85.0;
                if let Some(p) = projection.project(black_box(lon), black_box(lat)) {
                    acc += p.x;
                }
            }
            acc
        })
    });
}

fn bench_topology(c: &mut Criterion) {
    let json = grid_topology(30);
    c.bench_function("decode_world_900", |b| {
        b.iter(|| {
            let mut bytes = json.clone().into_bytes();
            decode_world(black_box(&mut bytes)).map(|w| w.len())
        })
    });

    let Ok(world) = decode_world(&mut json.clone().into_bytes()) else {
        return;
    };
    let path = GeoPath::new(Projection::fitted(1200.0, 600.0, 170.0));
    c.bench_function("atlas_build_900", |b| b.iter(|| Atlas::build(black_box(&world), &path).len()));
}

fn bench_scene(c: &mut Criterion) {
    let projection = Projection::fitted(1200.0, 600.0, 170.0);
    let renderer = AttackRenderer::default();
    c.bench_function("scene_advance_300_events", |b| {
        b.iter(|| {
            let mut scene = Scene::new();
            for i in 0..300 {
                let event = AttackEvent {
                    source: GeoCoordinate::new((i % 300) as f64 - 150.0, 10.0),
                    target: GeoCoordinate::new(40.0, (i % 120) as f64 - 60.0),
                    kind: AttackKind::City,
                };
                renderer.launch(&mut scene, &projection, &event, 0.0);
            }
            let mut now = 0.0;
            while !scene.is_empty() {
                now += 16.0;
                scene.advance(now);
            }
            now
        })
    });
}

criterion_group!(benches, bench_projection, bench_topology, bench_scene);
criterion_main!(benches);

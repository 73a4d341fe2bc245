// End-to-end runs of the generation pipeline:
//   planar reference scenario, metric and degree tiling over lon/lat,
//   worker-count invariance, and a SQLite-backed run fed from a GeoJSON file.

use std::collections::BTreeSet;

use geo::{
    coordinate_position::{CoordPos, CoordinatePosition},
    polygon, Contains, Distance, Haversine, MultiPolygon, Point,
};
use sectorgrid::{
    generate, store::{tables, GeometryStore, SqliteStore}, Border, BorderConfig, ContainmentPolicy, GeoJsonBorderSource,
    Generated, ParallelExecutor, Pipeline, Presentation, ProjectionMode, RunConfig, SectorFan,
};

fn planar_square(side: f64) -> Border {
    let shape = polygon![(x: 0.0, y: 0.0), (x: side, y: 0.0), (x: side, y: side), (x: 0.0, y: side)];
    Border::new(MultiPolygon(vec![shape]), 3857).unwrap()
}

/// Roughly 71 km by 55 km around Kyiv.
fn lonlat_block() -> Border {
    let shape = polygon![(x: 30.0, y: 50.0), (x: 31.0, y: 50.0), (x: 31.0, y: 50.5), (x: 30.0, y: 50.5)];
    Border::new(MultiPolygon(vec![shape]), 4326).unwrap()
}

fn run(border: &Border, config: &RunConfig, workers: usize) -> Generated {
    generate(border, config, &ParallelExecutor::new(Some(workers)).unwrap()).unwrap()
}

fn pairs(generated: &Generated) -> BTreeSet<(usize, usize)> {
    generated.intersections.iter().map(|i| (i.sector_id, i.point_id)).collect()
}

#[test]
fn planar_reference_scenario() {
    let config = RunConfig {
        step_km: 10.0,
        mode: ProjectionMode::Identity,
        fan: SectorFan { radius_km: 5.0, ..Default::default() },
        ..Default::default()
    };
    let generated = run(&planar_square(20.0), &config, 2);

    let corners = generated.cells.iter()
        .map(|c| (c.polygon.exterior().0[0].x as i64, c.polygon.exterior().0[0].y as i64))
        .collect::<Vec<_>>();
    assert_eq!(corners, vec![(0, 0), (0, 10), (10, 0), (10, 10)]);

    assert_eq!(generated.points.len(), 1);
    assert_eq!(generated.points[0].point, Point::new(10.0, 10.0));

    let north = generated.sectors.iter().find(|s| s.azimuth == 0.0).unwrap();
    let ring = &north.polygon.exterior().0;
    assert_eq!(ring.len() - 1, 62);
    assert_eq!(ring[61], north.apex.0);
    let bearing = |i: usize| (ring[i].x - 10.0).atan2(ring[i].y - 10.0).to_degrees();
    assert!((bearing(0) + 30.0).abs() < 1e-9);
    assert!((bearing(60) - 30.0).abs() < 1e-9);
}

#[test]
fn metric_run_over_lonlat_border() {
    let border = lonlat_block();
    let config = RunConfig { step_km: 10.0, workers: Some(2), ..Default::default() };
    let generated = run(&border, &config, 2);

    assert!(!generated.cells.is_empty());
    assert!(!generated.points.is_empty());
    assert!(!generated.sectors.is_empty());

    // Cells are 10 km squares on the ground.
    for cell in generated.cells.iter().take(5) {
        let ring = &cell.polygon.exterior().0;
        let side = Haversine.distance(Point::from(ring[0]), Point::from(ring[1]));
        assert!((side - 10_000.0).abs() < 100.0, "side {side}");
    }

    // Every point is strictly inside, every sector wholly inside.
    for vertex in &generated.points {
        assert_eq!(border.shape().coordinate_position(&vertex.point.0), CoordPos::Inside);
    }
    for sector in &generated.sectors {
        assert!(border.shape().contains(&sector.polygon), "sector {}", sector.id);
        let reach = Haversine.distance(sector.apex, Point::from(sector.polygon.exterior().0[30]));
        assert!((reach - 10_000.0).abs() < 60.0, "reach {reach}");
    }

    // Intersections agree with a direct scan.
    let mut scanned = BTreeSet::new();
    for sector in &generated.sectors {
        for vertex in &generated.points {
            if sector.polygon.coordinate_position(&vertex.point.0) != CoordPos::Outside {
                scanned.insert((sector.id, vertex.id));
            }
        }
    }
    assert_eq!(pairs(&generated), scanned);
}

#[test]
fn degree_run_keeps_geodesic_sectors() {
    let border = lonlat_block();
    let config = RunConfig { step_km: 10.0, mode: ProjectionMode::Degree, ..Default::default() };
    let generated = run(&border, &config, 2);

    // Cells are 10 / 111 degrees on each side, so narrower than 10 km east-west.
    let side = 10.0 / 111.0;
    for cell in &generated.cells {
        let ring = &cell.polygon.exterior().0;
        assert!((ring[1].x - ring[0].x - side).abs() < 1e-9);
        assert!((ring[2].y - ring[1].y - side).abs() < 1e-9);
    }
    assert!(!generated.points.is_empty());

    // Sector arcs still sit 10 km from the apex on the ground in every direction.
    assert!(!generated.sectors.is_empty());
    for sector in &generated.sectors {
        assert!(border.shape().contains(&sector.polygon), "sector {}", sector.id);
        for i in [0, 30, 60] {
            let reach = Haversine.distance(sector.apex, Point::from(sector.polygon.exterior().0[i]));
            assert!((reach - 10_000.0).abs() < 60.0, "sector {} reach {reach}", sector.id);
        }
    }
}

#[test]
fn worker_count_does_not_change_results() {
    let border = lonlat_block();
    let config = RunConfig { step_km: 8.0, containment: ContainmentPolicy::Exclusive, ..Default::default() };

    let one = run(&border, &config, 1);
    let many = run(&border, &config, 4);
    assert_eq!(one.points, many.points);
    assert_eq!(one.sectors, many.sectors);
    assert_eq!(pairs(&one), pairs(&many));
}

#[test]
fn sqlite_backed_run_from_geojson_file() {
    let dir = tempfile::tempdir().unwrap();
    let geojson = dir.path().join("countries.geojson");
    std::fs::write(&geojson, r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "ADMIN": "Squareland" },
              "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [40, 0], [40, 40], [0, 40], [0, 0]]] } },
            { "type": "Feature", "properties": { "ADMIN": "Elsewhere" },
              "geometry": { "type": "Polygon", "coordinates": [[[100, 0], [101, 0], [101, 1], [100, 0]]] } }
        ]
    }"#).unwrap();

    let config = RunConfig {
        mode: ProjectionMode::Identity,
        fan: SectorFan { radius_km: 5.0, ..Default::default() },
        border: BorderConfig { file: Some(geojson), value: "Squareland".into(), ..Default::default() },
        ..Default::default()
    };
    let source = GeoJsonBorderSource::from_config(&config.border);
    let database = dir.path().join("layers.sqlite");

    let first = Pipeline::new(config.clone(), SqliteStore::open(&database).unwrap()).unwrap()
        .run(&source, false).unwrap();
    assert_eq!((first.grid_cells, first.grid_points, first.sectors), (16, 9, 27));
    assert!(first.reused.is_empty());

    // A fresh connection sees the stored layers and reuses them all.
    let mut pipeline = Pipeline::new(config, SqliteStore::open(&database).unwrap()).unwrap();
    let second = pipeline.run(&source, false).unwrap();
    assert_eq!(second.reused.len(), tables::ALL.len());
    assert_eq!(second.intersections, first.intersections);

    let store = pipeline.into_store();
    assert_eq!(store.row_count(tables::SECTORS).unwrap(), 27);

    let presentation = Presentation::from_store(&store).unwrap();
    let svg = dir.path().join("out").join("map.svg");
    presentation.to_svg(&svg).unwrap();
    assert!(std::fs::read_to_string(&svg).unwrap().contains("<svg"));
    assert_eq!(presentation.write_geojson(&dir.path().join("out")).unwrap().len(), 4);
}

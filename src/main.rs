//! Demo: set up a deployment, ingest mock POIs around a city center, run an
//! encrypted range query and decrypt the matches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use eplq::{
    setup, CancelHandle, EngineConfig, GeoPoint, GridConfig, Poi, SecurityLevel, Server,
    TreeConfig,
};

/// Scatter mock POIs uniformly within `max_radius_m` of a center, the way
/// the original demo seeded its map.
fn generate_mock_pois<R: Rng>(
    center: GeoPoint,
    count: u64,
    max_radius_m: f64,
    rng: &mut R,
) -> Vec<Poi> {
    let earth_radius = 6_371_000.0;
    (0..count)
        .map(|id| {
            let radius_deg = max_radius_m / earth_radius * 180.0 / std::f64::consts::PI;
            let distance = rng.gen::<f64>() * radius_deg;
            let angle = rng.gen::<f64>() * 2.0 * std::f64::consts::PI;
            let lat = center.lat + distance * angle.cos();
            let lng =
                center.lng + distance * angle.sin() / center.lat.to_radians().cos();
            Poi {
                id,
                location: GeoPoint::new(lat, lng),
            }
        })
        .collect()
}

fn main() -> eplq::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("set tracing subscriber");

    let mut rng = StdRng::seed_from_u64(1);
    let city_center = GeoPoint::new(51.505, -0.09);

    println!("=== EPLQ demo ===\n");

    println!("Step 1: deployment setup");
    let grid = GridConfig {
        ref_lat_deg: city_center.lat,
        max_radius_m: 2_000.0,
    };
    let (params, key) = setup(SecurityLevel::Bits128, grid, &mut rng)?;
    println!("  security: {:?}", params.security);
    println!("  max query radius: {} m\n", params.grid.max_radius_m);

    println!("Step 2: owner-side ingestion");
    let pois = generate_mock_pois(city_center, 40, 1_500.0, &mut rng);
    let (tree, report) = key.ingest(&TreeConfig::default(), &pois, &mut rng);
    println!(
        "  ingested {} POIs into {} nodes ({} skipped)\n",
        report.ingested,
        tree.node_count(),
        report.skipped
    );

    println!("Step 3: hand the encrypted index to the server");
    let server = Server::new(tree, EngineConfig::default())?;

    println!("Step 4: encrypted range query (500 m around the city center)");
    let token = key.make_query(city_center, 500.0, &mut rng)?;
    let matches = server.search(&token, &CancelHandle::new())?;
    info!(candidates = matches.len(), "server returned encrypted matches");

    println!("Step 5: decrypt and rank client-side");
    let mut found = Vec::with_capacity(matches.len());
    for m in &matches {
        found.push(key.decrypt(m)?);
    }
    key.sort_by_distance(city_center, &mut found);

    for poi in &found {
        println!(
            "  poi {:>3}  lat {:.6}  lng {:.6}",
            poi.id, poi.location.lat, poi.location.lng
        );
    }
    println!("\n{} of {} POIs inside the circle", found.len(), pois.len());

    Ok(())
}

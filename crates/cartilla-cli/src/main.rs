use anyhow::Context;
use clap::{Parser, Subcommand};

use cartilla_core::regions::RegionTable;
use cartilla_geo::{
    aggregate_by_region, count_within_radius, filter_by_radius, filter_with_fallback,
    rank_candidates, round1, CoordSource, Coordinate, GeoEntity, SearchCandidate,
};
use cartilla_store::StoreClient;

#[derive(Debug, Parser)]
#[command(name = "cartilla-cli")]
#[command(about = "Cartilla provider directory command line interface")]
struct Cli {
    /// Print raw JSON instead of formatted lines.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Radius search for providers around a point.
    Buscar {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Radius in kilometers.
        #[arg(long, default_value_t = 10.0)]
        radio: f64,
        #[arg(long)]
        especialidad: Option<String>,
        #[arg(long)]
        prestador: Option<String>,
        /// Return the nearest providers when the radius is empty.
        #[arg(long)]
        fallback: bool,
    },
    /// Provider counts per province.
    Provincias {
        #[arg(long)]
        especialidad: Option<String>,
    },
    /// Resolve a locality name to coordinates.
    Localidad {
        q: String,
        #[arg(long, default_value_t = 10.0)]
        radio: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cartilla_core::load_app_config()?;
    let store = StoreClient::new(
        &config.store_url,
        &config.store_api_key,
        config.store_timeout_secs,
    )?
    .with_retry_policy(config.store_max_retries, config.store_retry_backoff_ms);
    let regions = RegionTable::load(&config.regions_path).unwrap_or_else(|_| RegionTable::argentina());

    match cli.command {
        Commands::Buscar {
            lat,
            lng,
            radio,
            especialidad,
            prestador,
            fallback,
        } => {
            let origin = Coordinate::new(lat, lng, CoordSource::Gps)
                .context("coordenadas inválidas: lat debe estar en [-90, 90] y lng en [-180, 180], distintas de cero")?;
            let rows = cartilla_store::fetch_prestadores(
                &store,
                especialidad.as_deref(),
                prestador.as_deref(),
                config.fetch_cap,
            )
            .await?;

            let search = if fallback {
                filter_with_fallback(origin, radio, rows, config.fallback_limit)
            } else {
                filter_by_radius(origin, radio, rows)
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&search)?);
                return Ok(());
            }

            println!(
                "{} prestadores ({:?}, {} filas con coordenadas inválidas)",
                search.results.len(),
                search.kind,
                search.invalid_coordinates
            );
            for result in &search.results {
                let p = &result.entity;
                println!(
                    "{:>8.1} km  {}  [{} / {}]",
                    round1(result.distance_km),
                    p.nombre,
                    p.localidad.as_deref().unwrap_or("-"),
                    p.provincia.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Provincias { especialidad } => {
            let rows = cartilla_store::fetch_prestadores(
                &store,
                especialidad.as_deref(),
                None,
                config.fetch_cap,
            )
            .await?;
            let mut clusters = aggregate_by_region(rows, &regions);
            clusters.sort_by(|a, b| b.member_count.cmp(&a.member_count));

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&clusters)?);
                return Ok(());
            }

            for cluster in &clusters {
                println!(
                    "{:>6}  {}  ({:.4}, {:.4})",
                    cluster.member_count,
                    cluster.label,
                    cluster.centroid.latitude,
                    cluster.centroid.longitude
                );
            }
        }
        Commands::Localidad { q, radio } => {
            let localidades = cartilla_store::search_localidades(&store, &q, 20).await?;
            let prestadores =
                cartilla_store::fetch_prestadores(&store, None, None, config.fetch_cap).await?;

            let candidates: Vec<SearchCandidate<_>> = localidades
                .into_iter()
                .map(|localidad| {
                    let coordinate = regions
                        .correction_for(&localidad.nombre)
                        .and_then(|p| Coordinate::new(p.lat, p.lon, CoordSource::Corrected))
                        .or_else(|| localidad.coordinate());
                    let nearby =
                        coordinate.map_or(0, |c| count_within_radius(c, radio, &prestadores));
                    SearchCandidate::new(localidad, coordinate, nearby)
                })
                .collect();

            let Some(resolved) = rank_candidates(&q, candidates) else {
                println!("sin resultados para '{q}'");
                return Ok(());
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
                return Ok(());
            }

            let best = &resolved.best;
            match best.coordinate {
                Some(c) => println!(
                    "{} [{}]  ({:.4}, {:.4})  {} prestadores cercanos",
                    best.entity.nombre,
                    best.entity.provincia.as_deref().unwrap_or("-"),
                    c.latitude,
                    c.longitude,
                    best.nearby_count
                ),
                None => println!(
                    "{} [{}]  sin coordenadas",
                    best.entity.nombre,
                    best.entity.provincia.as_deref().unwrap_or("-")
                ),
            }
            for alt in &resolved.alternates {
                println!("  alternativa: {} (prioridad {})", alt.entity.nombre, alt.priority);
            }
        }
    }

    Ok(())
}

mod backend;

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use foundation::math::LatLon;
use geocoding::{AddressResolver, GeocoderConfig};
use layers::event::Event;
use layers::markers::SelectCallback;
use surface::{LocationPrefill, MapSurface, SurfaceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::backend::TraceBackend;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays incident event lists through the map surface")]
struct Args {
    /// Surface configuration as JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply event lists in order and report the marker diff for each
    Replay {
        /// JSON files, each an array of events; one file per update
        #[arg(required = true)]
        updates: Vec<PathBuf>,

        /// Keep the configured view instead of fitting to markers
        #[arg(long)]
        pin: bool,

        /// Print every live marker's popup with its address after the last update
        #[arg(long)]
        popups: bool,
    },

    /// Reverse geocode one coordinate (GEOCODER_* env vars apply)
    Reverse {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },

    /// Forward place search
    Search { query: String },

    /// Build the event form prefill for a long-pressed coordinate
    Prefill {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config: SurfaceConfig = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => SurfaceConfig::default(),
    };

    match args.command {
        Command::Replay {
            updates,
            pin,
            popups,
        } => replay(config, &updates, pin, popups).await?,
        Command::Reverse { lat, lng } => {
            let resolver = resolver()?;
            println!("{}", resolver.resolve(lat, lng).await?);
        }
        Command::Search { query } => {
            let resolver = resolver()?;
            for place in resolver.search(&query).await? {
                println!(
                    "{:.6}, {:.6}  {}",
                    place.position.lat, place.position.lon, place.display_name
                );
            }
        }
        Command::Prefill { lat, lng } => {
            let resolver = resolver()?;
            let prefill = LocationPrefill::resolve(LatLon::new(lat, lng), &resolver).await?;
            println!("{}", serde_json::to_string_pretty(&prefill)?);
        }
    }

    Ok(())
}

fn resolver() -> Result<AddressResolver, Box<dyn std::error::Error>> {
    Ok(AddressResolver::nominatim(GeocoderConfig::from_env())?)
}

async fn replay(
    config: SurfaceConfig,
    updates: &[PathBuf],
    pin: bool,
    popups: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let on_select: SelectCallback = Rc::new(|event: &Event| info!("selected event {}", event.id));
    let mut surface = MapSurface::new(TraceBackend::new(), config, on_select);
    surface.pin_view(pin);
    surface.create()?;

    for (n, path) in updates.iter().enumerate() {
        let events: Vec<Event> = serde_json::from_str(&fs::read_to_string(path)?)?;
        let summary = surface.update_events(&events);
        println!(
            "update {} ({}): +{:?} -{:?} kept={} skipped={}",
            n + 1,
            path.display(),
            summary.added.iter().map(|id| id.0).collect::<Vec<_>>(),
            summary.removed.iter().map(|id| id.0).collect::<Vec<_>>(),
            summary.kept.len(),
            summary.skipped.len()
        );
        for (id, reason) in &summary.skipped {
            println!("  skipped {id}: {reason}");
        }
    }

    if let Some(fit) = surface.backend().last_fit() {
        println!(
            "view fitted to {:?} .. {:?}",
            fit.south_west, fit.north_east
        );
    }

    if popups {
        let resolver = resolver()?;
        for id in surface.marker_ids() {
            if let Some(popup) = surface.popup(id, &resolver).await {
                println!("\n{}", popup.to_plain_text());
            }
        }
        let stats = resolver.stats();
        println!(
            "\ngeocoder: {} requests, {} cache hits, {} joined, {} failures",
            stats.requests, stats.cache_hits, stats.joined, stats.failures
        );
    }

    for (name, value) in surface.metrics().counters {
        info!("{name} = {value}");
    }
    surface.destroy();
    Ok(())
}

//! Delivery coverage geofencing.
//!
//! Decides whether a customer location falls inside a priced delivery zone
//! and lets operators draw, edit and publish those zones on a map canvas.
//!
//! The pure core ([`geometry`], [`regions`], [`transform`]) has no I/O.
//! The editor ([`input`], [`overlay`], [`display`]) and collaborators
//! ([`store`], [`feed`], [`geocode`]) sit on top of it.

pub mod config;
pub mod display;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod geometry;
pub mod input;
pub mod normalize;
pub mod overlay;
pub mod regions;
pub mod store;
pub mod transform;
pub mod visibility;

pub use config::Settings;
pub use error::{Result, ZoneError};
pub use input::{DrawingSession, MapEditor};
pub use normalize::normalize_location;
pub use regions::{
    classify, Classification, ClassifySettings, GeoPoint, Polygon, Region, RegionMetadata, ZoneMatch,
    ZoneRegistry,
};
pub use transform::MapView;
pub use visibility::RegionVisibility;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the filter when present; otherwise `info`.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

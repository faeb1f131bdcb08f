//! Province and sub-region aggregation for the map view.
//!
//! Region clusters pin to fixed administrative centroids (the row data is
//! too noisy to average); sub-region clusters pin to the mean of their
//! members. Oversized provinces drill down into anchor-assigned buckets,
//! and oversized buckets split into list-order chunks so the map renders
//! roughly even pin groups.

use serde::Serialize;

use cartilla_core::regions::{slug, GeoPoint, NamedPoint, RegionTable};

use crate::coord::{CoordSource, Coordinate};
use crate::distance::planar_degrees;
use crate::GeoEntity;

/// Region member count above which the map view offers sub-clusters.
pub const DEFAULT_DRILLDOWN_THRESHOLD: usize = 1000;

/// Largest sub-cluster bucket before it splits into list-order chunks.
pub const DEFAULT_SUBCLUSTER_CAP: usize = 1200;

/// Cluster label for entities whose region field is missing or blank.
pub const UNKNOWN_REGION_LABEL: &str = "Sin provincia";

/// A labeled aggregate of entities rendered as one map marker.
///
/// `member_count` is authoritative: callers may truncate `members` for
/// payload size, the count never changes.
#[derive(Debug, Clone, Serialize)]
pub struct GeoCluster<T> {
    pub id: String,
    pub label: String,
    pub centroid: Coordinate,
    pub members: Vec<T>,
    pub member_count: usize,
}

/// A cluster whose members span more ground than its region plausibly
/// covers — a symptom of mis-geocoded rows, surfaced as a warning only.
#[derive(Debug, Clone, Serialize)]
pub struct SpanWarning {
    pub region: String,
    pub lat_span: f64,
    pub lon_span: f64,
    pub limit: f64,
}

fn fixed_centroid(point: GeoPoint) -> Coordinate {
    // Reference tables are range-validated at load time.
    Coordinate {
        latitude: point.lat,
        longitude: point.lon,
        source: CoordSource::Corrected,
    }
}

/// Group entities into one cluster per administrative region.
///
/// Region labels are canonicalized through the alias table (case- and
/// accent-insensitive); unknown labels cluster under their own raw name
/// with the national fallback centroid, and blank labels under
/// [`UNKNOWN_REGION_LABEL`]. Every input entity lands in exactly one
/// cluster, so member counts sum to the input length.
#[must_use]
pub fn aggregate_by_region<T: GeoEntity>(
    entities: Vec<T>,
    table: &RegionTable,
) -> Vec<GeoCluster<T>> {
    use std::collections::HashMap;

    struct Group<T> {
        label: String,
        centroid: GeoPoint,
        members: Vec<T>,
    }

    let mut order: Vec<Group<T>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entity in entities {
        let raw = entity.region().map(str::trim).unwrap_or_default();
        let (key, label, centroid) = if raw.is_empty() {
            (
                cartilla_core::regions::fold_key(UNKNOWN_REGION_LABEL),
                UNKNOWN_REGION_LABEL.to_string(),
                table.fallback_centroid(),
            )
        } else if let Some(province) = table.canonical(raw) {
            (
                cartilla_core::regions::fold_key(&province.name),
                province.name.clone(),
                province.centroid,
            )
        } else {
            (
                cartilla_core::regions::fold_key(raw),
                raw.to_string(),
                table.fallback_centroid(),
            )
        };

        match index.entry(key) {
            std::collections::hash_map::Entry::Occupied(slot) => {
                order[*slot.get()].members.push(entity);
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(order.len());
                order.push(Group {
                    label,
                    centroid,
                    members: vec![entity],
                });
            }
        }
    }

    order
        .into_iter()
        .map(|group| GeoCluster {
            id: slug(&group.label),
            label: group.label,
            centroid: fixed_centroid(group.centroid),
            member_count: group.members.len(),
            members: group.members,
        })
        .collect()
}

/// Sub-cluster one region's entities around the given reference points.
///
/// Each entity goes to its nearest anchor by planar degree distance (see
/// `planar_degrees`); entities without a usable coordinate are skipped.
/// Buckets above `cap` split into list-order chunks of at most `cap`
/// members labeled `"<region> (<n>)"`, numbered per region from 1; buckets
/// at or below `cap` keep their anchor label. Cluster centroids are the
/// arithmetic mean of member coordinates.
#[must_use]
pub fn aggregate_by_subregion<T: GeoEntity>(
    entities: Vec<T>,
    region_label: &str,
    anchors: &[NamedPoint],
    cap: usize,
) -> Vec<GeoCluster<T>> {
    if anchors.is_empty() || cap == 0 {
        return Vec::new();
    }

    let mut buckets: Vec<Vec<(T, Coordinate)>> =
        (0..anchors.len()).map(|_| Vec::new()).collect();
    let mut skipped = 0usize;

    for entity in entities {
        let Some(coordinate) = entity.coordinate() else {
            skipped += 1;
            continue;
        };
        let nearest = anchors
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                planar_degrees(coordinate.latitude, coordinate.longitude, a.lat, a.lon).total_cmp(
                    &planar_degrees(coordinate.latitude, coordinate.longitude, b.lat, b.lon),
                )
            })
            .map_or(0, |(i, _)| i);
        buckets[nearest].push((entity, coordinate));
    }

    if skipped > 0 {
        tracing::debug!(region = region_label, skipped, "entities without coordinates skipped in sub-clustering");
    }

    let mut clusters = Vec::new();
    let mut split_seq = 0usize;
    for (anchor, bucket) in anchors.iter().zip(buckets) {
        if bucket.is_empty() {
            continue;
        }
        if bucket.len() <= cap {
            clusters.push(mean_cluster(anchor.label.clone(), bucket));
        } else {
            let mut remaining = bucket;
            while !remaining.is_empty() {
                let rest = if remaining.len() > cap {
                    remaining.split_off(cap)
                } else {
                    Vec::new()
                };
                split_seq += 1;
                clusters.push(mean_cluster(format!("{region_label} ({split_seq})"), remaining));
                remaining = rest;
            }
        }
    }
    clusters
}

fn mean_cluster<T>(label: String, members: Vec<(T, Coordinate)>) -> GeoCluster<T> {
    #[allow(clippy::cast_precision_loss)]
    let n = members.len() as f64;
    let (lat_sum, lon_sum) = members
        .iter()
        .fold((0.0, 0.0), |(la, lo), (_, c)| (la + c.latitude, lo + c.longitude));
    let centroid = Coordinate {
        latitude: lat_sum / n,
        longitude: lon_sum / n,
        source: CoordSource::Raw,
    };
    let members: Vec<T> = members.into_iter().map(|(entity, _)| entity).collect();
    GeoCluster {
        id: slug(&label),
        label,
        centroid,
        member_count: members.len(),
        members,
    }
}

/// Reference points for sub-clustering a region: the table's hardcoded
/// anchors when the province has them, otherwise the four bounding-box
/// edge midpoints of the observed data (Norte/Sur/Este/Oeste). Empty when
/// no entity has a usable coordinate.
#[must_use]
pub fn reference_points_for<T: GeoEntity>(
    region_label: &str,
    entities: &[T],
    table: &RegionTable,
) -> Vec<NamedPoint> {
    let canonical = table.canonical(region_label);
    if let Some(province) = canonical {
        if !province.anchors.is_empty() {
            return province.anchors.clone();
        }
    }

    let Some(bounds) = bounding_box(entities) else {
        return Vec::new();
    };
    let name = canonical.map_or(region_label, |p| p.name.as_str());
    let mid_lat = f64::midpoint(bounds.min_lat, bounds.max_lat);
    let mid_lon = f64::midpoint(bounds.min_lon, bounds.max_lon);
    let point = |suffix: &str, lat: f64, lon: f64| NamedPoint {
        label: format!("{name} {suffix}"),
        lat,
        lon,
    };
    vec![
        point("Norte", bounds.max_lat, mid_lon),
        point("Sur", bounds.min_lat, mid_lon),
        point("Este", mid_lat, bounds.max_lon),
        point("Oeste", mid_lat, bounds.min_lon),
    ]
}

struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

fn bounding_box<T: GeoEntity>(entities: &[T]) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for coordinate in entities.iter().filter_map(GeoEntity::coordinate) {
        match &mut bounds {
            Some(b) => {
                b.min_lat = b.min_lat.min(coordinate.latitude);
                b.max_lat = b.max_lat.max(coordinate.latitude);
                b.min_lon = b.min_lon.min(coordinate.longitude);
                b.max_lon = b.max_lon.max(coordinate.longitude);
            }
            None => {
                bounds = Some(Bounds {
                    min_lat: coordinate.latitude,
                    max_lat: coordinate.latitude,
                    min_lon: coordinate.longitude,
                    max_lon: coordinate.longitude,
                });
            }
        }
    }
    bounds
}

/// Check a region's members against its plausible coordinate span.
///
/// Returns a warning when a compact region (one with
/// `plausible_span_degrees` configured) spans more latitude or longitude
/// than believable. Diagnostic only — never blocks clustering.
#[must_use]
pub fn validate_region_span<T: GeoEntity>(
    region_label: &str,
    entities: &[T],
    table: &RegionTable,
) -> Option<SpanWarning> {
    let province = table.canonical(region_label)?;
    let limit = province.plausible_span_degrees?;
    let bounds = bounding_box(entities)?;
    let lat_span = bounds.max_lat - bounds.min_lat;
    let lon_span = bounds.max_lon - bounds.min_lon;
    if lat_span > limit || lon_span > limit {
        return Some(SpanWarning {
            region: province.name.clone(),
            lat_span,
            lon_span,
            limit,
        });
    }
    None
}

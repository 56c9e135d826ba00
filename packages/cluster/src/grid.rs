//! Greedy grid-distance clustering in screen-pixel space.
//!
//! Incidents are visited in input order. Each one joins the nearest
//! existing cluster whose seed lies within the reach on both axes, or
//! becomes the seed of a new cluster. Seeds are kept in an R-tree keyed by
//! their pixel position at the current zoom.
//!
//! The reach is `grid_size_px`, but never less than the largest cluster
//! icon, so any two seeds are at least one icon diameter apart and icons
//! drawn at their seeds cannot overlap.

use geo::{Centroid, MultiPoint, Point};
use rstar::{AABB, RTree, RTreeObject};
use safe_route_geography_models::projection::{self, PixelPoint};
use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_incident_models::Incident;
use safe_route_map::Viewport;
use safe_route_render::icon::MAX_CLUSTER_DIAMETER;

use crate::{Cluster, ClusterError, ClusterItem, Clusterer};

/// Tuning for [`GridClusterer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Pixel distance (per axis) within which incidents merge.
    pub grid_size_px: f64,
    /// Above this zoom every incident is drawn individually.
    pub max_zoom: u8,
    /// Groups smaller than this are drawn as individual incidents.
    pub minimum_cluster_size: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            grid_size_px: 60.0,
            max_zoom: 18,
            minimum_cluster_size: 2,
        }
    }
}

struct SeedEntry {
    pixel: [f64; 2],
    group: usize,
}

impl RTreeObject for SeedEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pixel)
    }
}

struct Group {
    seed: PixelPoint,
    members: Vec<usize>,
}

/// The built-in [`Clusterer`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridClusterer {
    options: ClusterOptions,
}

impl GridClusterer {
    /// Creates a clusterer with the given options.
    #[must_use]
    pub const fn new(options: ClusterOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    #[must_use]
    pub const fn options(&self) -> ClusterOptions {
        self.options
    }

    fn group(&self, incidents: &[Incident], visible: &[usize], zoom: f64) -> Vec<Group> {
        let grid = self
            .options
            .grid_size_px
            .max(f64::from(MAX_CLUSTER_DIAMETER));
        let mut groups: Vec<Group> = Vec::new();
        let mut seeds: RTree<SeedEntry> = RTree::new();

        for &index in visible {
            let pixel = projection::project(incidents[index].position, zoom);
            let reach = AABB::from_corners(
                [pixel.x - grid, pixel.y - grid],
                [pixel.x + grid, pixel.y + grid],
            );

            let nearest = seeds
                .locate_in_envelope_intersecting(&reach)
                .map(|seed| (seed.group, pixel.distance(&groups[seed.group].seed)))
                .min_by(|(a_group, a_dist), (b_group, b_dist)| {
                    a_dist.total_cmp(b_dist).then(a_group.cmp(b_group))
                })
                .map(|(group, _)| group);

            if let Some(group) = nearest {
                groups[group].members.push(index);
            } else {
                seeds.insert(SeedEntry {
                    pixel: [pixel.x, pixel.y],
                    group: groups.len(),
                });
                groups.push(Group {
                    seed: pixel,
                    members: vec![index],
                });
            }
        }

        groups
    }
}

impl Clusterer for GridClusterer {
    fn cluster(
        &self,
        incidents: &[Incident],
        viewport: &Viewport,
    ) -> Result<Vec<ClusterItem>, ClusterError> {
        let grid = self.options.grid_size_px;
        if !grid.is_finite() || grid <= 0.0 {
            return Err(ClusterError::Unavailable {
                reason: format!("invalid grid size {grid}"),
            });
        }

        let visible_area = viewport.pixel_bounds(grid);
        let visible: Vec<usize> = incidents
            .iter()
            .enumerate()
            .filter(|(_, incident)| visible_area.contains(incident.position))
            .map(|(index, _)| index)
            .collect();

        if viewport.zoom > self.options.max_zoom {
            return Ok(visible.into_iter().map(ClusterItem::Single).collect());
        }

        let groups = self.group(incidents, &visible, f64::from(viewport.zoom));
        log::trace!(
            "Grouped {} visible incidents into {} groups at zoom {}",
            visible.len(),
            groups.len(),
            viewport.zoom
        );

        let minimum = self.options.minimum_cluster_size.max(2);
        let mut items = Vec::with_capacity(groups.len());
        for group in groups {
            if group.members.len() < minimum {
                items.extend(group.members.into_iter().map(ClusterItem::Single));
            } else {
                items.push(ClusterItem::Cluster(summarize(incidents, group.members)));
            }
        }
        Ok(items)
    }
}

fn summarize(incidents: &[Incident], members: Vec<usize>) -> Cluster {
    let positions: Vec<GeoPoint> = members.iter().map(|i| incidents[*i].position).collect();
    let multi: MultiPoint<f64> = positions
        .iter()
        .map(|p| Point::from(geo::Coord::from(*p)))
        .collect();

    let position = multi
        .centroid()
        .map_or(positions[0], |centroid| GeoPoint::from(centroid.0));
    let bounds = GeoBounds::from_points(&positions)
        .unwrap_or_else(|| GeoBounds::new(position.lng, position.lat, position.lng, position.lat));

    Cluster {
        position,
        anchor: positions[0],
        members,
        bounds,
    }
}

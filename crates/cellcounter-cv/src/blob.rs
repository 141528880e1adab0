//! Reference blob detector
//!
//! Grayscale threshold sweep with connected-component analysis: binarize
//! at each threshold of the sweep, keep dark components that pass the area
//! and circularity filters, then merge centers that recur across
//! thresholds. Cells stained on a bright chamber background show up as the
//! dark components.

use cellcounter_core::{DetectionParameters, Point};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::traits::CellDetector;

/// Sweep-level knobs that are not part of the per-run parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobDetector {
    /// Centers closer than this many pixels across thresholds count as one blob.
    pub min_dist_between_blobs: f64,
    /// Thresholds a center must recur at before it is reported.
    pub min_repeatability: usize,
}

impl Default for BlobDetector {
    fn default() -> Self {
        Self {
            min_dist_between_blobs: 10.0,
            min_repeatability: 2,
        }
    }
}

/// A candidate center with the number of thresholds it appeared at.
struct Cluster {
    center: Point,
    hits: usize,
}

impl CellDetector for BlobDetector {
    fn detect(
        &self,
        image: &GrayImage,
        params: &DetectionParameters,
    ) -> crate::Result<Vec<Point>> {
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut sweep_len = 0usize;

        let mut threshold = params.min_threshold;
        while threshold <= params.max_threshold {
            sweep_len += 1;
            for center in component_centers(image, threshold as u8, params) {
                match nearest_cluster(&clusters, center, self.min_dist_between_blobs) {
                    Some(index) => {
                        let cluster = &mut clusters[index];
                        let n = cluster.hits as f64;
                        cluster.center = Point::new(
                            (cluster.center.x * n + center.x) / (n + 1.0),
                            (cluster.center.y * n + center.y) / (n + 1.0),
                        );
                        cluster.hits += 1;
                    }
                    None => clusters.push(Cluster { center, hits: 1 }),
                }
            }
            threshold += params.threshold_step;
        }

        // A short sweep cannot demand more repeats than it has thresholds.
        let needed = self.min_repeatability.min(sweep_len).max(1);
        log::debug!(
            "blob sweep over {} thresholds produced {} candidate clusters",
            sweep_len,
            clusters.len()
        );

        Ok(clusters
            .into_iter()
            .filter(|cluster| cluster.hits >= needed)
            .map(|cluster| cluster.center)
            .collect())
    }
}

fn nearest_cluster(clusters: &[Cluster], center: Point, max_dist: f64) -> Option<usize> {
    clusters
        .iter()
        .enumerate()
        .filter(|(_, cluster)| cluster.center.distance_to(center) <= max_dist)
        .min_by(|(_, a), (_, b)| {
            a.center
                .distance_to(center)
                .total_cmp(&b.center.distance_to(center))
        })
        .map(|(index, _)| index)
}

/// Centroids of dark connected components (8-connectivity) at one
/// threshold, after the area and circularity filters.
fn component_centers(image: &GrayImage, threshold: u8, params: &DetectionParameters) -> Vec<Point> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut visited = vec![false; width * height];
    let mut centers = Vec::new();
    let mut stack = Vec::new();

    let dark = |x: usize, y: usize| image.get_pixel(x as u32, y as u32)[0] <= threshold;

    for start_y in 0..height {
        for start_x in 0..width {
            if visited[start_y * width + start_x] || !dark(start_x, start_y) {
                continue;
            }

            // Flood fill one component, accumulating centroid and perimeter.
            let mut area = 0usize;
            let mut perimeter = 0usize;
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            visited[start_y * width + start_x] = true;
            stack.push((start_x, start_y));

            while let Some((x, y)) = stack.pop() {
                area += 1;
                sum_x += x as f64;
                sum_y += y as f64;

                let mut on_boundary = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                for (dx, dy) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    if !dark(nx as usize, ny as usize) {
                        on_boundary = true;
                    }
                }
                if on_boundary {
                    perimeter += 1;
                }

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        if !visited[ny * width + nx] && dark(nx, ny) {
                            visited[ny * width + nx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            let area_f = area as f64;
            if area_f < params.min_area || area_f > params.max_area {
                continue;
            }
            if params.use_circularity {
                let perimeter_f = perimeter.max(1) as f64;
                let circularity = 4.0 * std::f64::consts::PI * area_f / (perimeter_f * perimeter_f);
                if circularity < params.min_circularity {
                    continue;
                }
            }
            centers.push(Point::new(sum_x / area_f, sum_y / area_f));
        }
    }

    centers
}

//! Merging of tics that belong to the same physical perforation.

use crate::config::ClusterConfig;
use crate::tic::Tic;

/// Groups tics along an edge and keeps the deepest of each group.
#[derive(Debug, Clone, Copy)]
pub struct TicClusterer {
    radius_px: f32,
}

impl TicClusterer {
    pub fn new(radius_px: f32) -> Self {
        Self {
            radius_px: radius_px.max(0.0),
        }
    }

    pub fn from_config(config: &ClusterConfig, dpi: f32) -> Self {
        Self::new(config.radius_px(dpi))
    }

    pub fn radius_px(&self) -> f32 {
        self.radius_px
    }

    /// One tic per group of consecutive tics closer than the radius along
    /// the edge. Output is sorted along the edge; on equal depth the first
    /// tic of the group wins.
    pub fn cluster(&self, tics: &[Tic]) -> Vec<Tic> {
        let mut sorted = tics.to_vec();
        sorted.sort_by(|a, b| a.along().total_cmp(&b.along()));

        let mut kept: Vec<Tic> = Vec::with_capacity(sorted.len());
        let mut last_along = f32::NEG_INFINITY;
        for tic in sorted {
            let along = tic.along();
            match kept.last_mut() {
                Some(best) if along - last_along < self.radius_px => {
                    if tic.depth > best.depth {
                        *best = tic;
                    }
                }
                _ => kept.push(tic),
            }
            last_along = along;
        }

        if kept.len() < tics.len() {
            debug!("clustered {} tics into {}", tics.len(), kept.len());
        }
        kept
    }
}

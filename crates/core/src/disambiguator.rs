//! Ranking of ambiguous candidates by where the player is looking and standing.

use crate::square::Square;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisambiguationWeights {
    pub gaze_weight: f32,
    pub proximity_weight: f32,
    /// Candidates at or beyond this angle from the view direction get no gaze credit.
    pub max_gaze_angle_deg: f32,
}

impl Default for DisambiguationWeights {
    fn default() -> Self {
        Self {
            gaze_weight: 3.0,
            proximity_weight: 1.5,
            max_gaze_angle_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerPose {
    pub position: Vec3,
    pub forward: Vec3,
}

/// World placement of the board.
///
/// `file_axis` points from the a-file towards the h-file and `rank_axis` from
/// rank 1 towards rank 8; both are expected to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub center: Vec3,
    pub file_axis: Vec3,
    pub rank_axis: Vec3,
    pub side_length: f32,
}

impl BoardGeometry {
    pub fn square_center(&self, square: Square) -> Vec3 {
        let cell = self.side_length / 8.0;
        let half = self.side_length * 0.5;
        let x = -half + (f32::from(square.file()) - 0.5) * cell;
        let z = -half + (f32::from(square.rank()) - 0.5) * cell;
        self.center + self.file_axis * x + self.rank_axis * z
    }
}

impl Default for BoardGeometry {
    /// A 0.5 m board lying flat at the origin, white side towards -Z.
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            file_axis: Vec3::X,
            rank_axis: Vec3::Z,
            side_length: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialContext {
    pub viewer: ViewerPose,
    pub board: BoardGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub square: Square,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub best: Square,
    /// Highest score first; equal scores keep enumeration order.
    pub scored: Vec<ScoredCandidate>,
}

impl Ranking {
    pub fn squares(&self) -> Vec<Square> {
        self.scored.iter().map(|c| c.square).collect()
    }
}

pub(crate) fn gaze_term(viewer: &ViewerPose, target: Vec3, max_angle_deg: f32) -> f32 {
    let to_target = target - viewer.position;
    if to_target.length_squared() <= f32::EPSILON {
        return 1.0;
    }
    if viewer.forward.length_squared() <= f32::EPSILON || max_angle_deg <= 0.0 {
        return 0.0;
    }
    let angle = viewer.forward.angle_between(to_target).to_degrees();
    (1.0 - angle / max_angle_deg).max(0.0)
}

pub(crate) fn proximity_term(viewer: &ViewerPose, target: Vec3) -> f32 {
    1.0 / (1.0 + viewer.position.distance(target))
}

/// Scores one square. Higher is better.
pub fn score(square: Square, context: &SpatialContext, weights: &DisambiguationWeights) -> f32 {
    let target = context.board.square_center(square);
    weights.gaze_weight * gaze_term(&context.viewer, target, weights.max_gaze_angle_deg)
        + weights.proximity_weight * proximity_term(&context.viewer, target)
}

/// Ranks candidates. Without a spatial context every score is zero and the
/// first enumerated candidate wins. Returns `None` only for an empty slice.
pub fn rank(
    candidates: &[Square],
    context: Option<&SpatialContext>,
    weights: &DisambiguationWeights,
) -> Option<Ranking> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|&square| ScoredCandidate {
            square,
            score: context.map_or(0.0, |ctx| score(square, ctx, weights)),
        })
        .collect();

    // `sort_by` is stable, so ties keep their enumeration order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let best = scored.first()?.square;
    tracing::debug!(
        "Ranked candidates: {}",
        scored
            .iter()
            .map(|c| format!("{}={:.3}", c.square, c.score))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Some(Ranking { best, scored })
}

use glam::Vec2;

use crate::components::{Aabb, GroundInfo, SurfaceMaterial};
use crate::config::GroundConfig;

/// Absorbs float noise when comparing elapsed time against the coyote window.
const TIME_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Grounded / coyote time
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundTransition {
    Unchanged,
    Landed,
    Left,
}

/// Result of feeding one frame's `GroundInfo` into the tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundUpdate {
    pub transition: GroundTransition,
    /// Set when the material underfoot differs from the last one stood on.
    pub surface_changed: Option<SurfaceMaterial>,
}

/// Grounded/airborne state for one entity, with a coyote-time grace window.
#[derive(Clone, Debug)]
pub struct GroundContactTracker {
    coyote_time: f64,
    current: GroundInfo,
    was_grounded: bool,
    last_grounded_time: Option<f64>,
    /// A jump already used the grace window; it cannot be used twice.
    coyote_consumed: bool,
    last_surface: SurfaceMaterial,
}

impl GroundContactTracker {
    pub fn new(config: &GroundConfig) -> Self {
        Self {
            coyote_time: config.coyote_time,
            current: GroundInfo::airborne(),
            was_grounded: false,
            last_grounded_time: None,
            coyote_consumed: false,
            last_surface: SurfaceMaterial::None,
        }
    }

    pub fn update_ground_state(&mut self, info: GroundInfo, now: f64) -> GroundUpdate {
        self.was_grounded = self.current.is_grounded;

        let transition = match (self.was_grounded, info.is_grounded) {
            (false, true) => {
                self.coyote_consumed = false;
                GroundTransition::Landed
            }
            (true, false) => {
                self.last_grounded_time = Some(now);
                GroundTransition::Left
            }
            _ => GroundTransition::Unchanged,
        };

        let mut surface_changed = None;
        if info.is_grounded && info.ground_surface != self.last_surface {
            self.last_surface = info.ground_surface;
            surface_changed = Some(info.ground_surface);
        }

        self.current = GroundInfo {
            last_grounded_time: self.last_grounded_time,
            ..info
        };

        GroundUpdate {
            transition,
            surface_changed,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.current.is_grounded
    }

    pub fn was_grounded(&self) -> bool {
        self.was_grounded
    }

    /// Grounded now, or airborne for no longer than the coyote window.
    pub fn is_effectively_grounded(&self, now: f64) -> bool {
        if self.current.is_grounded {
            return true;
        }
        if self.coyote_consumed {
            return false;
        }
        self.last_grounded_time
            .is_some_and(|t| now - t <= self.coyote_time + TIME_EPSILON)
    }

    /// Mark the grace window as spent by a jump.
    pub fn consume_coyote(&mut self) {
        self.coyote_consumed = true;
    }

    pub fn ground_info(&self) -> GroundInfo {
        self.current
    }

    pub fn last_grounded_time(&self) -> Option<f64> {
        self.last_grounded_time
    }

    /// Material underfoot, `None` while airborne.
    pub fn surface(&self) -> SurfaceMaterial {
        if self.current.is_grounded {
            self.current.ground_surface
        } else {
            SurfaceMaterial::None
        }
    }

    pub fn reset(&mut self) {
        self.current = GroundInfo::airborne();
        self.was_grounded = false;
        self.last_grounded_time = None;
        self.coyote_consumed = false;
        self.last_surface = SurfaceMaterial::None;
    }
}

// ---------------------------------------------------------------------------
// Edge detection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeState {
    pub is_near_left_edge: bool,
    pub is_near_right_edge: bool,
    /// Distance from the body's left side to the drop, if a supporting span was found.
    pub left_edge_distance: Option<f32>,
    pub right_edge_distance: Option<f32>,
}

impl EdgeState {
    pub fn is_near_any_edge(&self) -> bool {
        self.is_near_left_edge || self.is_near_right_edge
    }
}

/// Merge supporting surfaces under the feet into contiguous spans and measure
/// how far each side of `body` is from the end of the span it stands on.
pub fn detect_edges(body: &Aabb, supports: &[Aabb], threshold: f32, tolerance: f32) -> EdgeState {
    let feet = body.max.y;
    let mut spans: Vec<(f32, f32)> = supports
        .iter()
        .filter(|s| (s.min.y - feet).abs() <= tolerance)
        .map(|s| (s.min.x, s.max.x))
        .collect();
    if spans.is_empty() {
        return EdgeState::default();
    }
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f32, f32)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 + tolerance => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let center = body.center().x;
    let overlap_of = |span: &(f32, f32)| span.1.min(body.max.x) - span.0.max(body.min.x);
    let span = merged
        .iter()
        .find(|s| s.0 <= center && center <= s.1)
        .or_else(|| {
            merged
                .iter()
                .filter(|s| overlap_of(s) > 0.0)
                .max_by(|a, b| overlap_of(a).total_cmp(&overlap_of(b)))
        });
    let Some(&(start, end)) = span else {
        return EdgeState::default();
    };

    let left = (body.min.x - start).max(0.0);
    let right = (end - body.max.x).max(0.0);
    EdgeState {
        is_near_left_edge: left <= threshold,
        is_near_right_edge: right <= threshold,
        left_edge_distance: Some(left),
        right_edge_distance: Some(right),
    }
}

/// Edge flags for one entity: recomputed every grounded frame, held briefly
/// once airborne, then cleared.
#[derive(Clone, Debug)]
pub struct EdgeDetector {
    threshold: f32,
    tolerance: f32,
    clear_buffer: f64,
    state: EdgeState,
    airborne_since: Option<f64>,
}

impl EdgeDetector {
    pub fn new(config: &GroundConfig) -> Self {
        Self {
            threshold: config.edge_threshold,
            tolerance: config.support_tolerance,
            clear_buffer: config.edge_clear_buffer,
            state: EdgeState::default(),
            airborne_since: None,
        }
    }

    pub fn update_grounded(&mut self, body: &Aabb, supports: &[Aabb]) {
        self.airborne_since = None;
        self.state = detect_edges(body, supports, self.threshold, self.tolerance);
    }

    pub fn update_airborne(&mut self, now: f64) {
        let since = *self.airborne_since.get_or_insert(now);
        if now - since > self.clear_buffer {
            self.state = EdgeState::default();
        }
    }

    pub fn state(&self) -> EdgeState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = EdgeState::default();
        self.airborne_since = None;
    }
}

/// Average the normals of all ground contacts; `UP`-ish when there is one.
pub fn average_normal(normals: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    let (sum, count) = normals.fold((Vec2::ZERO, 0u32), |(s, c), n| (s + n, c + 1));
    (count > 0).then(|| (sum / count as f32).normalize_or_zero())
}

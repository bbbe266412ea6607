//! Cubic Hermite segment between two PVT waypoints.

/// One (position, velocity, time) waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtPoint {
    pub position: f64,
    pub velocity: f64,
    /// Absolute time [s].
    pub time: f64,
}

impl PvtPoint {
    #[inline]
    pub const fn new(position: f64, velocity: f64, time: f64) -> Self {
        Self {
            position,
            velocity,
            time,
        }
    }
}

/// Cubic `x(τ) = a0 + a1·τ + a2·τ² + a3·τ³`, `τ = t − t0`, matching position
/// and velocity at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtSegment {
    start: PvtPoint,
    end: PvtPoint,
    a0: f64,
    a1: f64,
    a2: f64,
    a3: f64,
}

impl PvtSegment {
    /// Build the segment. Caller guarantees `end.time > start.time`.
    pub fn new(start: PvtPoint, end: PvtPoint) -> Self {
        let t = end.time - start.time;
        let dx = end.position - start.position;
        let a2 = (3.0 * dx - (2.0 * start.velocity + end.velocity) * t) / (t * t);
        let a3 = (-2.0 * dx + (start.velocity + end.velocity) * t) / (t * t * t);
        Self {
            start,
            end,
            a0: start.position,
            a1: start.velocity,
            a2,
            a3,
        }
    }

    #[inline]
    pub const fn start(&self) -> &PvtPoint {
        &self.start
    }

    #[inline]
    pub const fn end(&self) -> &PvtPoint {
        &self.end
    }

    #[inline]
    pub fn start_time(&self) -> f64 {
        self.start.time
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.end.time
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end.time - self.start.time
    }

    /// Position at absolute time `t`.
    #[inline]
    pub fn position(&self, t: f64) -> f64 {
        let tau = t - self.start.time;
        self.a0 + tau * (self.a1 + tau * (self.a2 + tau * self.a3))
    }

    /// Velocity at absolute time `t`.
    #[inline]
    pub fn velocity(&self, t: f64) -> f64 {
        let tau = t - self.start.time;
        self.a1 + tau * (2.0 * self.a2 + 3.0 * self.a3 * tau)
    }

    /// Acceleration at absolute time `t`.
    #[inline]
    pub fn acceleration(&self, t: f64) -> f64 {
        let tau = t - self.start.time;
        2.0 * self.a2 + 6.0 * self.a3 * tau
    }
}

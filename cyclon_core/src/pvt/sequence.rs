//! PVT sequence: waypoint list, RT cursor, preview accessors.
//!
//! Built incrementally with [`PvtSequence::add_point`], frozen by
//! [`PvtSequence::validate`]. The cursor advances with
//! [`PvtSequence::next_sample_step`] and only ever moves forward; the
//! `curr_*` evaluators use the cursor segment directly (no search).

use super::segment::{PvtPoint, PvtSegment};
use super::PvtError;

#[derive(Debug, Clone)]
pub struct PvtSequence {
    points: Vec<PvtPoint>,
    segments: Vec<PvtSegment>,
    sample_time: f64,
    validated: bool,
    cursor: f64,
    segment_index: usize,
    busy: bool,
}

impl PvtSequence {
    /// Empty sequence stepping at `sample_time` seconds.
    pub fn new(sample_time: f64) -> Result<Self, PvtError> {
        if !(sample_time.is_finite() && sample_time > 0.0) {
            return Err(PvtError::InvalidSampleTime(sample_time));
        }
        Ok(Self {
            points: Vec::new(),
            segments: Vec::new(),
            sample_time,
            validated: false,
            cursor: 0.0,
            segment_index: 0,
            busy: false,
        })
    }

    /// Build and validate a sequence from waypoints.
    pub fn from_points<I>(sample_time: f64, points: I) -> Result<Self, PvtError>
    where
        I: IntoIterator<Item = PvtPoint>,
    {
        let mut seq = Self::new(sample_time)?;
        for p in points {
            seq.add_point(p)?;
        }
        seq.validate()?;
        Ok(seq)
    }

    // ─── Building ───────────────────────────────────────────────────

    /// Append a waypoint; from the second point on, a segment is created
    /// between the last two points.
    pub fn add_point(&mut self, point: PvtPoint) -> Result<(), PvtError> {
        if self.validated {
            return Err(PvtError::AlreadyValidated);
        }
        if !(point.position.is_finite() && point.velocity.is_finite() && point.time.is_finite())
        {
            return Err(PvtError::NonFinitePoint {
                position: point.position,
                velocity: point.velocity,
                time: point.time,
            });
        }
        if let Some(last) = self.points.last().copied() {
            if point.time <= last.time {
                return Err(PvtError::NonIncreasingTime {
                    previous: last.time,
                    time: point.time,
                });
            }
            self.segments.push(PvtSegment::new(last, point));
        }
        self.points.push(point);
        Ok(())
    }

    /// Freeze the sequence. Requires at least one segment.
    pub fn validate(&mut self) -> Result<(), PvtError> {
        if self.segments.is_empty() {
            return Err(PvtError::NoSegments);
        }
        self.validated = true;
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validated
    }

    // ─── RT Cursor ──────────────────────────────────────────────────

    /// Reset the cursor to the first waypoint time and mark busy.
    pub fn init_seq(&mut self) -> Result<(), PvtError> {
        if !self.validated {
            return Err(PvtError::NotValidated);
        }
        self.cursor = self.start_time().unwrap_or(0.0);
        self.segment_index = 0;
        self.busy = true;
        Ok(())
    }

    /// Advance the cursor by one sample time.
    ///
    /// Returns `false` once the cursor has reached the end time; the cursor
    /// is then clamped to the end time and the sequence is no longer busy.
    pub fn next_sample_step(&mut self) -> bool {
        let Some(end) = self.end_time() else {
            return false;
        };
        self.cursor += self.sample_time;
        if self.cursor >= end {
            self.cursor = end;
            self.segment_index = self.segments.len() - 1;
            self.busy = false;
            return false;
        }
        while self.cursor > self.segments[self.segment_index].end_time()
            && self.segment_index + 1 < self.segments.len()
        {
            self.segment_index += 1;
        }
        true
    }

    /// Position at the cursor (0.0 when there are no segments).
    #[inline]
    pub fn curr_position(&self) -> f64 {
        self.segments
            .get(self.segment_index)
            .map_or(0.0, |s| s.position(self.cursor))
    }

    #[inline]
    pub fn curr_velocity(&self) -> f64 {
        self.segments
            .get(self.segment_index)
            .map_or(0.0, |s| s.velocity(self.cursor))
    }

    #[inline]
    pub fn curr_acceleration(&self) -> f64 {
        self.segments
            .get(self.segment_index)
            .map_or(0.0, |s| s.acceleration(self.cursor))
    }

    #[inline]
    pub fn curr_time(&self) -> f64 {
        self.cursor
    }

    #[inline]
    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    #[inline]
    pub fn busy(&self) -> bool {
        self.busy
    }

    /// Whether the cursor sits at (or past) the end time.
    pub fn is_last_sample(&self) -> bool {
        self.end_time().is_some_and(|end| self.cursor >= end)
    }

    // ─── Preview (non-RT) ───────────────────────────────────────────

    /// Segment containing `t`, or `None` outside `[start, end]`.
    fn segment_at(&self, t: f64) -> Option<&PvtSegment> {
        if !self.is_time_valid(t) {
            return None;
        }
        let idx = self.segments.partition_point(|s| s.end_time() <= t);
        self.segments.get(idx).or_else(|| self.segments.last())
    }

    /// Position at arbitrary time `t`; `None` outside the sequence range.
    pub fn position(&self, t: f64) -> Option<f64> {
        self.segment_at(t).map(|s| s.position(t))
    }

    pub fn velocity(&self, t: f64) -> Option<f64> {
        self.segment_at(t).map(|s| s.velocity(t))
    }

    pub fn acceleration(&self, t: f64) -> Option<f64> {
        self.segment_at(t).map(|s| s.acceleration(t))
    }

    pub fn is_time_valid(&self, t: f64) -> bool {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => t >= start && t <= end,
            _ => false,
        }
    }

    // ─── Shape ──────────────────────────────────────────────────────

    pub fn start_time(&self) -> Option<f64> {
        self.segments.first().map(PvtSegment::start_time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.segments.last().map(PvtSegment::end_time)
    }

    /// Total duration [s].
    pub fn duration(&self) -> Option<f64> {
        Some(self.end_time()? - self.start_time()?)
    }

    pub fn start_position(&self) -> Option<f64> {
        self.points.first().map(|p| p.position)
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn sample_time(&self) -> f64 {
        self.sample_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_point() -> PvtSequence {
        PvtSequence::from_points(
            0.1,
            [
                PvtPoint::new(0.0, 0.0, 0.0),
                PvtPoint::new(5.0, 10.0, 1.0),
                PvtPoint::new(10.0, 0.0, 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn segments_follow_points() {
        let mut seq = PvtSequence::new(0.001).unwrap();
        seq.add_point(PvtPoint::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(seq.segment_count(), 0);
        assert_eq!(seq.validate(), Err(PvtError::NoSegments));
        seq.add_point(PvtPoint::new(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(seq.point_count(), 2);
        assert_eq!(seq.segment_count(), 1);
        assert!(seq.validate().is_ok());
    }

    #[test]
    fn non_increasing_time_rejected() {
        let mut seq = PvtSequence::new(0.001).unwrap();
        seq.add_point(PvtPoint::new(0.0, 0.0, 1.0)).unwrap();
        assert!(matches!(
            seq.add_point(PvtPoint::new(1.0, 0.0, 1.0)),
            Err(PvtError::NonIncreasingTime { .. })
        ));
        assert_eq!(seq.point_count(), 1);
    }

    #[test]
    fn frozen_after_validate() {
        let mut seq = three_point();
        assert_eq!(
            seq.add_point(PvtPoint::new(0.0, 0.0, 3.0)),
            Err(PvtError::AlreadyValidated)
        );
    }

    #[test]
    fn init_requires_validation() {
        let mut seq = PvtSequence::new(0.001).unwrap();
        assert_eq!(seq.init_seq(), Err(PvtError::NotValidated));
        assert!(PvtSequence::new(0.0).is_err());
    }

    #[test]
    fn stepping_clamps_at_end() {
        let mut seq = three_point();
        seq.init_seq().unwrap();
        assert!(seq.busy());
        let mut steps = 0;
        let mut last = seq.curr_time();
        while seq.next_sample_step() {
            assert!(seq.curr_time() > last);
            last = seq.curr_time();
            steps += 1;
            assert!(steps < 100);
        }
        assert!((seq.curr_time() - 2.0).abs() < 1e-12);
        assert!(!seq.busy());
        assert!(seq.is_last_sample());
        assert_eq!(seq.segment_index(), 1);
        assert!((seq.curr_position() - 10.0).abs() < 1e-9);
        // Further calls keep returning false and never move backwards.
        assert!(!seq.next_sample_step());
        assert!((seq.curr_time() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn segment_index_advances_past_boundary() {
        let mut seq = three_point();
        seq.init_seq().unwrap();
        for _ in 0..10 {
            seq.next_sample_step();
        }
        // Float accumulation puts the cursor at ~1.0; still first or second segment.
        assert!(seq.segment_index() <= 1);
        seq.next_sample_step();
        assert_eq!(seq.segment_index(), 1);
    }

    #[test]
    fn cursor_matches_preview_across_segments() {
        let mut seq = PvtSequence::from_points(
            0.001,
            [
                PvtPoint::new(0.0, 0.0, 0.0),
                PvtPoint::new(2.0, 4.0, 0.5),
                PvtPoint::new(3.0, -1.0, 1.2),
                PvtPoint::new(-1.0, 0.0, 2.0),
            ],
        )
        .unwrap();
        seq.init_seq().unwrap();
        let mut last_time = seq.curr_time();
        let mut last_segment = seq.segment_index();
        let mut steps = 0;
        loop {
            let running = seq.next_sample_step();
            let t = seq.curr_time();
            assert!(t > last_time || !running);
            assert!(t >= last_time);
            assert!(seq.segment_index() >= last_segment);
            let preview = seq.position(t).unwrap();
            assert!((preview - seq.curr_position()).abs() < 1e-9, "t={t}");
            let preview_vel = seq.velocity(t).unwrap();
            assert!((preview_vel - seq.curr_velocity()).abs() < 1e-6, "t={t}");
            if !running {
                break;
            }
            assert!(t < 2.0);
            last_time = t;
            last_segment = seq.segment_index();
            steps += 1;
            assert!(steps < 3000);
        }
        assert!(steps >= 1990);
        assert_eq!(seq.curr_time(), 2.0);
        assert_eq!(seq.segment_index(), 2);
        assert!((seq.curr_position() + 1.0).abs() < 1e-12);
        for _ in 0..3 {
            assert!(!seq.next_sample_step());
            assert_eq!(seq.curr_time(), 2.0);
        }
    }

    #[test]
    fn preview_out_of_range_is_none() {
        let seq = three_point();
        assert_eq!(seq.position(-0.01), None);
        assert_eq!(seq.velocity(2.01), None);
        assert!(seq.position(2.0).is_some());
        assert!((seq.position(1.0).unwrap() - 5.0).abs() < 1e-9);
        assert!((seq.velocity(1.0).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn shape_accessors() {
        let seq = three_point();
        assert_eq!(seq.start_time(), Some(0.0));
        assert_eq!(seq.end_time(), Some(2.0));
        assert_eq!(seq.duration(), Some(2.0));
        assert_eq!(seq.start_position(), Some(0.0));
        assert!(seq.is_time_valid(1.5));
        assert!(!seq.is_time_valid(2.5));
        let empty = PvtSequence::new(0.1).unwrap();
        assert!(!empty.is_time_valid(0.0));
        assert_eq!(empty.curr_position(), 0.0);
    }
}

//! Smooth path generation for road and route rendering.
//!
//! Turns an ordered point list into cubic Bézier segments using a cardinal
//! spline: each point's control points lie along the direction from its
//! previous to its next neighbour, scaled by `smoothing`.
//!
//! The output is surface independent. Use [`SmoothPath::to_svg`] for SVG path
//! data or [`SmoothPath::to_lyon`] (feature `vectors`) for tessellation.

use std::f32::consts::PI;
use std::fmt::Write;

use glam::Vec2;

/// Default smoothing factor for road paths.
pub const DEFAULT_SMOOTHING: f32 = 0.2;

/// One drawing command of a smooth path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    CubicTo { ctrl1: Vec2, ctrl2: Vec2, to: Vec2 },
}

/// A cubic segment with its start point resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub from: Vec2,
    pub ctrl1: Vec2,
    pub ctrl2: Vec2,
    pub to: Vec2,
}

impl CubicSegment {
    /// Evaluate the Bézier curve at `t` in [0, 1].
    pub fn eval(&self, t: f32) -> Vec2 {
        let u = 1.0 - t;
        self.from * (u * u * u)
            + self.ctrl1 * (3.0 * u * u * t)
            + self.ctrl2 * (3.0 * u * t * t)
            + self.to * (t * t * t)
    }
}

/// Abstract smooth path description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothPath {
    pub commands: Vec<PathCommand>,
    pub closed: bool,
}

impl SmoothPath {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Resolve each cubic command into a segment with an explicit start point.
    pub fn segments(&self) -> Vec<CubicSegment> {
        let mut out = Vec::with_capacity(self.commands.len().saturating_sub(1));
        let mut pen = Vec2::ZERO;
        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) => pen = p,
                PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                    out.push(CubicSegment { from: pen, ctrl1, ctrl2, to });
                    pen = to;
                }
            }
        }
        out
    }

    /// Point at `t` along the path, where the integer part of `t` selects the
    /// segment and the fraction is the Bézier parameter within it. Clamped to
    /// the path ends; `None` for a path without segments.
    pub fn sample(&self, t: f32) -> Option<Vec2> {
        let segments = self.segments();
        let last = segments.len().checked_sub(1)?;
        let t = t.max(0.0);
        let index = (t.floor() as usize).min(last);
        let local = (t - index as f32).min(1.0);
        Some(segments[index].eval(local))
    }

    /// SVG path data (`M x,y C x,y x,y x,y ...`).
    pub fn to_svg(&self) -> String {
        let mut d = String::new();
        for cmd in &self.commands {
            // Writing to a String cannot fail.
            let _ = match cmd {
                PathCommand::MoveTo(p) => write!(d, "M{},{}", p.x, p.y),
                PathCommand::CubicTo { ctrl1, ctrl2, to } => write!(
                    d,
                    "C{},{} {},{} {},{}",
                    ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y
                ),
            };
        }
        d
    }

    /// Convert to a lyon path for tessellation.
    #[cfg(feature = "vectors")]
    pub fn to_lyon(&self) -> lyon::path::Path {
        use lyon::math::point;

        let mut builder = lyon::path::Path::builder();
        let mut open = false;
        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    if open {
                        builder.end(false);
                    }
                    builder.begin(point(p.x, p.y));
                    open = true;
                }
                PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                    builder.cubic_bezier_to(
                        point(ctrl1.x, ctrl1.y),
                        point(ctrl2.x, ctrl2.y),
                        point(to.x, to.y),
                    );
                }
            }
        }
        if open {
            builder.end(self.closed);
        }
        builder.build()
    }
}

fn control_point(cur: Vec2, prev: Option<Vec2>, next: Option<Vec2>, reverse: bool, smoothing: f32) -> Vec2 {
    let prev = prev.unwrap_or(cur);
    let next = next.unwrap_or(cur);
    let d = next - prev;
    let angle = d.y.atan2(d.x) + if reverse { PI } else { 0.0 };
    let length = d.length() * smoothing;
    cur + Vec2::new(angle.cos(), angle.sin()) * length
}

/// Build a smooth path through `points`.
///
/// Open paths treat missing neighbours at the ends as the endpoint itself.
/// Closed loops wrap neighbour lookups and return to the first point.
pub fn smooth_path(points: &[Vec2], looped: bool, smoothing: f32) -> SmoothPath {
    let Some(&first) = points.first() else {
        return SmoothPath::default();
    };
    let n = points.len();
    let mut commands = Vec::with_capacity(n + 1);
    commands.push(PathCommand::MoveTo(first));

    if looped {
        let at = |k: isize| points[k.rem_euclid(n as isize) as usize];
        for i in 1..=n as isize {
            let prev_prev = at(i - 2);
            let prev = at(i - 1);
            let cur = at(i);
            let next = at(i + 1);
            commands.push(PathCommand::CubicTo {
                ctrl1: control_point(prev, Some(prev_prev), Some(cur), false, smoothing),
                ctrl2: control_point(cur, Some(prev), Some(next), true, smoothing),
                to: cur,
            });
        }
    } else {
        for i in 1..n {
            let prev_prev = i.checked_sub(2).map(|k| points[k]);
            commands.push(PathCommand::CubicTo {
                ctrl1: control_point(points[i - 1], prev_prev, Some(points[i]), false, smoothing),
                ctrl2: control_point(points[i], Some(points[i - 1]), points.get(i + 1).copied(), true, smoothing),
                to: points[i],
            });
        }
    }

    SmoothPath { commands, closed: looped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_path() {
        assert!(smooth_path(&[], false, DEFAULT_SMOOTHING).is_empty());
        assert!(smooth_path(&[], true, DEFAULT_SMOOTHING).is_empty());
    }

    #[test]
    fn sample_walks_segments() {
        let pts = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        let path = smooth_path(&pts, false, DEFAULT_SMOOTHING);
        assert_eq!(path.sample(0.0), Some(Vec2::ZERO));
        assert_eq!(path.sample(1.0), Some(Vec2::new(10.0, 0.0)));
        assert_eq!(path.sample(5.0), Some(Vec2::new(20.0, 0.0)));
        let mid = path.sample(0.5).unwrap();
        assert!(mid.y.abs() < 1e-5 && mid.x > 0.0 && mid.x < 10.0);
        assert_eq!(smooth_path(&[Vec2::ONE], false, DEFAULT_SMOOTHING).sample(0.0), None);
    }

    #[test]
    fn single_point_is_just_a_move() {
        let path = smooth_path(&[Vec2::new(3.0, 4.0)], false, DEFAULT_SMOOTHING);
        assert_eq!(path.commands, vec![PathCommand::MoveTo(Vec2::new(3.0, 4.0))]);
    }

    #[test]
    fn colinear_points_stay_on_the_line() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(2.0, 4.0),
            Vec2::new(3.0, 6.0),
        ];
        let path = smooth_path(&points, false, DEFAULT_SMOOTHING);
        let segments = path.segments();
        assert_eq!(segments.len(), 3);
        for seg in &segments {
            for t in [0.25, 0.5, 0.75] {
                let p = seg.eval(t);
                assert!((p.y - 2.0 * p.x).abs() < 1e-4, "{p:?} off the line");
            }
        }
    }

    #[test]
    fn open_path_endpoints_have_zero_tangent_influence() {
        let points = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        let segments = smooth_path(&points, false, 0.5).segments();
        // First control point: neighbours are (p0, p1), so it leans toward p1.
        assert!((segments[0].ctrl1 - Vec2::new(5.0, 0.0)).length() < 1e-4);
        // Last control point: next is missing, so direction comes from p1 -> p2 reversed.
        assert!((segments[1].ctrl2 - Vec2::new(10.0, 5.0)).length() < 1e-4);
        assert_eq!(segments[1].to, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn closed_loop_wraps_to_start() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let path = smooth_path(&square, true, DEFAULT_SMOOTHING);
        let segments = path.segments();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].from, square[0]);
        assert_eq!(segments[3].to, square[0]);
        assert!(path.closed);
        // Symmetric square: every control point sits at the same distance from its anchor.
        let d0 = (segments[0].ctrl1 - segments[0].from).length();
        for seg in &segments {
            assert!(((seg.ctrl1 - seg.from).length() - d0).abs() < 1e-4);
            assert!(((seg.ctrl2 - seg.to).length() - d0).abs() < 1e-4);
        }
    }

    #[test]
    fn svg_output_matches_commands() {
        let path = smooth_path(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)], false, 0.0);
        assert_eq!(path.to_svg(), "M0,0C0,0 1,0 1,0");
    }

    #[cfg(feature = "vectors")]
    #[test]
    fn lyon_path_has_one_subpath() {
        let path = smooth_path(
            &[Vec2::new(0.0, 0.0), Vec2::new(5.0, 5.0), Vec2::new(10.0, 0.0)],
            false,
            DEFAULT_SMOOTHING,
        );
        let lyon_path = path.to_lyon();
        let begins = lyon_path
            .iter()
            .filter(|e| matches!(e, lyon::path::Event::Begin { .. }))
            .count();
        assert_eq!(begins, 1);
    }
}

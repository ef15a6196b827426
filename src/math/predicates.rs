//! Orientation and intersection predicates on 2D glyph geometry.
//!
//! Points are stored as `f32`, every predicate promotes to `f64` before
//! evaluating so that integer font coordinates are handled exactly.

use super::Point2;

#[inline]
fn xy(p: &Point2) -> (f64, f64) {
    (f64::from(p.x), f64::from(p.y))
}

/// Twice the signed area of the triangle `(a, b, c)`.
///
/// Positive when `c` lies to the left of the directed line `a → b`.
#[must_use]
pub fn determinant(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    let (ax, ay) = xy(a);
    let (bx, by) = xy(b);
    let (cx, cy) = xy(c);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

/// Returns `true` if `p` is strictly left of the directed line `a → b`,
/// more than `epsilon` away from it.
#[must_use]
pub fn is_on_left_side(a: &Point2, b: &Point2, p: &Point2, epsilon: f32) -> bool {
    let len = distance(a, b);
    if len <= f64::from(epsilon) {
        return false;
    }
    determinant(a, b, p) / len > f64::from(epsilon)
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    let (ax, ay) = xy(a);
    let (bx, by) = xy(b);
    ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
}

/// Computes the signed area of a closed vertex loop (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (x0, y0) = xy(&points[i]);
        let (x1, y1) = xy(&points[(i + 1) % n]);
        sum += x0 * y1 - x1 * y0;
    }
    sum * 0.5
}

/// Bounded segment-segment intersection of `a0 → a1` and `b0 → b1`.
///
/// Returns the parameters `(t, u)` along each segment, clamped to `[0, 1]`.
/// Parallel and collinear segments return `None`; use [`is_edge_on_edge`]
/// for those.
#[must_use]
pub fn segment_intersection(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
    epsilon: f32,
) -> Option<(f64, f64)> {
    let (ax0, ay0) = xy(a0);
    let (ax1, ay1) = xy(a1);
    let (bx0, by0) = xy(b0);
    let (bx1, by1) = xy(b1);
    let (dax, day) = (ax1 - ax0, ay1 - ay0);
    let (dbx, dby) = (bx1 - bx0, by1 - by0);
    let len_a = (dax * dax + day * day).sqrt();
    let len_b = (dbx * dbx + dby * dby).sqrt();
    let eps = f64::from(epsilon);
    if len_a <= eps || len_b <= eps {
        return None;
    }

    let cross = dax * dby - day * dbx;
    if cross.abs() <= eps * len_a * len_b {
        return None;
    }

    let dx = bx0 - ax0;
    let dy = by0 - ay0;
    let t = (dx * dby - dy * dbx) / cross;
    let u = (dx * day - dy * dax) / cross;

    let t_eps = eps / len_a;
    let u_eps = eps / len_b;
    if t >= -t_eps && t <= 1.0 + t_eps && u >= -u_eps && u <= 1.0 + u_eps {
        Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Returns the parameter of `p` along `a → b` if `p` lies on the segment
/// within `epsilon`.
#[must_use]
pub fn is_point_on_edge(p: &Point2, a: &Point2, b: &Point2, epsilon: f32) -> Option<f64> {
    let (px, py) = xy(p);
    let (ax, ay) = xy(a);
    let (bx, by) = xy(b);
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return None;
    }
    let t = ((px - ax) * dx + (py - ay) * dy) / len_sq;
    let len = len_sq.sqrt();
    let t_eps = f64::from(epsilon) / len;
    if t < -t_eps || t > 1.0 + t_eps {
        return None;
    }
    let dist = ((px - ax) * dy - (py - ay) * dx).abs() / len;
    (dist <= f64::from(epsilon)).then_some(t.clamp(0.0, 1.0))
}

/// Returns `true` if segment `b0 → b1` lies on the supporting line of
/// `a0 → a1` and the two segments share more than a single point.
#[must_use]
pub fn is_edge_on_edge(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2, epsilon: f32) -> bool {
    let len = distance(a0, a1);
    let eps = f64::from(epsilon);
    if len <= eps {
        return false;
    }
    if (determinant(a0, a1, b0) / len).abs() > eps || (determinant(a0, a1, b1) / len).abs() > eps
    {
        return false;
    }
    let (ax0, ay0) = xy(a0);
    let (ax1, ay1) = xy(a1);
    let (dx, dy) = ((ax1 - ax0) / len, (ay1 - ay0) / len);
    let project = |p: &Point2| {
        let (px, py) = xy(p);
        (px - ax0) * dx + (py - ay0) * dy
    };
    let (s0, s1) = (project(b0), project(b1));
    let lo = s0.min(s1).max(0.0);
    let hi = s0.max(s1).min(len);
    hi - lo > eps
}

/// Returns the minimum distance from `p` to the segment `a → b`.
#[must_use]
pub fn point_to_segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    segment_distance_xy(xy(p), xy(a), xy(b))
}

/// [`point_to_segment_distance`] on `f64` coordinates.
pub(crate) fn segment_distance_xy(
    (px, py): (f64, f64),
    (ax, ay): (f64, f64),
    (bx, by): (f64, f64),
) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }

    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    ((px - (ax + t * dx)).powi(2) + (py - (ay + t * dy)).powi(2)).sqrt()
}

/// Winding number of `p` against a set of directed segments.
///
/// Segments need not form a single loop; any set of closed loops works.
#[must_use]
pub fn winding_number<'a, I>(p: &Point2, segments: I) -> i32
where
    I: IntoIterator<Item = (&'a Point2, &'a Point2)>,
{
    winding_number_xy(xy(p), segments.into_iter().map(|(a, b)| [xy(a), xy(b)]))
}

/// [`winding_number`] on `f64` coordinates.
pub(crate) fn winding_number_xy<I>((px, py): (f64, f64), segments: I) -> i32
where
    I: IntoIterator<Item = [(f64, f64); 2]>,
{
    let mut winding = 0;
    for [(ax, ay), (bx, by)] in segments {
        let side = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
        if ay <= py {
            if by > py && side > 0.0 {
                winding += 1;
            }
        } else if by <= py && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Linear interpolation between `a` and `b`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn lerp(a: &Point2, b: &Point2, t: f64) -> Point2 {
    let (ax, ay) = xy(a);
    let (bx, by) = xy(b);
    Point2::new((ax + (bx - ax) * t) as f32, (ay + (by - ay) * t) as f32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f32, y: f32) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn determinant_sign_follows_side() {
        assert!(determinant(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.5, 1.0)) > 0.0);
        assert!(determinant(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.5, -1.0)) < 0.0);
        assert!(is_on_left_side(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.5, 1.0), 1e-6));
        assert!(!is_on_left_side(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.5, 0.0), 1e-6));
    }

    #[test]
    fn signed_area_orientation() {
        let ccw = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let cw = [p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)];
        assert_relative_eq!(signed_area(&ccw), 1.0);
        assert_relative_eq!(signed_area(&cw), -1.0);
        assert_relative_eq!(signed_area(&ccw[..2]), 0.0);
    }

    #[test]
    fn crossing_segments_intersect_in_the_middle() {
        let (t, u) =
            segment_intersection(&p(0.0, 0.0), &p(2.0, 2.0), &p(0.0, 2.0), &p(2.0, 0.0), 1e-6)
                .unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(u, 0.5);
    }

    #[test]
    fn parallel_and_disjoint_segments_do_not_intersect() {
        assert!(
            segment_intersection(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0), 1e-6)
                .is_none()
        );
        assert!(
            segment_intersection(&p(0.0, 0.0), &p(1.0, 0.0), &p(2.0, -1.0), &p(2.0, 1.0), 1e-6)
                .is_none()
        );
    }

    #[test]
    fn point_on_edge_reports_parameter() {
        let t = is_point_on_edge(&p(1.0, 0.0), &p(0.0, 0.0), &p(4.0, 0.0), 1e-6).unwrap();
        assert_relative_eq!(t, 0.25);
        assert!(is_point_on_edge(&p(1.0, 0.1), &p(0.0, 0.0), &p(4.0, 0.0), 1e-6).is_none());
        assert!(is_point_on_edge(&p(5.0, 0.0), &p(0.0, 0.0), &p(4.0, 0.0), 1e-6).is_none());
    }

    #[test]
    fn edge_on_edge_requires_shared_span() {
        let (a0, a1) = (p(0.0, 0.0), p(4.0, 0.0));
        assert!(is_edge_on_edge(&a0, &a1, &p(2.0, 0.0), &p(6.0, 0.0), 1e-6));
        assert!(!is_edge_on_edge(&a0, &a1, &p(4.0, 0.0), &p(6.0, 0.0), 1e-6));
        assert!(!is_edge_on_edge(&a0, &a1, &p(1.0, 1.0), &p(3.0, 1.0), 1e-6));
    }

    #[test]
    fn winding_of_nested_loops_adds_up() {
        let outer = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        let inner = [(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)];
        let mut segments = Vec::new();
        for ring in [outer, inner] {
            for i in 0..4 {
                segments.push([ring[i], ring[(i + 1) % 4]]);
            }
        }
        assert_eq!(winding_number_xy((2.0, 2.0), segments.iter().copied()), 2);
        assert_eq!(winding_number_xy((0.5, 2.0), segments.iter().copied()), 1);
        assert_eq!(winding_number_xy((5.0, 2.0), segments.iter().copied()), 0);
    }

    #[test]
    fn winding_number_of_square() {
        let pts = [p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)];
        let segs: Vec<_> = (0..4).map(|i| (&pts[i], &pts[(i + 1) % 4])).collect();
        assert_eq!(winding_number(&p(1.0, 1.0), segs.iter().copied()), 1);
        assert_eq!(winding_number(&p(3.0, 1.0), segs.iter().copied()), 0);
        let reversed: Vec<_> = segs.iter().map(|&(a, b)| (b, a)).collect();
        assert_eq!(winding_number(&p(1.0, 1.0), reversed), -1);
    }

    #[test]
    fn distance_to_segment_clamps() {
        assert_relative_eq!(point_to_segment_distance(&p(1.0, 1.0), &p(0.0, 0.0), &p(2.0, 0.0)), 1.0);
        assert_relative_eq!(point_to_segment_distance(&p(3.0, 0.0), &p(0.0, 0.0), &p(2.0, 0.0)), 1.0);
    }
}

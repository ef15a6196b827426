use super::predicates::lerp;
use super::Point2;

/// Maximum distance between a quadratic Bezier and its chord.
#[must_use]
pub fn quadratic_flatness(p0: &Point2, p1: &Point2, p2: &Point2) -> f64 {
    let dx = f64::from(p0.x) - 2.0 * f64::from(p1.x) + f64::from(p2.x);
    let dy = f64::from(p0.y) - 2.0 * f64::from(p1.y) + f64::from(p2.y);
    (dx * dx + dy * dy).sqrt() * 0.25
}

/// Subdivides a quadratic Bezier into line segments by recursive bisection.
///
/// Returns the points after `p0`, ending with `p2`. A half is split again
/// while its deviation from the chord exceeds `flatness` and `max_depth`
/// has not been reached.
#[must_use]
pub fn subdivide_quadratic(
    p0: &Point2,
    p1: &Point2,
    p2: &Point2,
    flatness: f32,
    max_depth: u32,
) -> Vec<Point2> {
    let mut out = Vec::new();
    subdivide(p0, p1, p2, f64::from(flatness), max_depth, &mut out);
    out
}

fn subdivide(
    p0: &Point2,
    p1: &Point2,
    p2: &Point2,
    flatness: f64,
    depth: u32,
    out: &mut Vec<Point2>,
) {
    if depth == 0 || quadratic_flatness(p0, p1, p2) <= flatness {
        out.push(*p2);
        return;
    }
    let left_ctrl = lerp(p0, p1, 0.5);
    let right_ctrl = lerp(p1, p2, 0.5);
    let mid = lerp(&left_ctrl, &right_ctrl, 0.5);
    subdivide(p0, &left_ctrl, &mid, flatness, depth - 1, out);
    subdivide(&mid, &right_ctrl, p2, flatness, depth - 1, out);
}

/// Approximates a cubic Bezier by two quadratics, split at `t = 0.5`.
///
/// Each returned triple is `(start, control, end)`.
#[must_use]
pub fn cubic_to_quadratics(
    p0: &Point2,
    c1: &Point2,
    c2: &Point2,
    p3: &Point2,
) -> [(Point2, Point2, Point2); 2] {
    let ab = lerp(p0, c1, 0.5);
    let bc = lerp(c1, c2, 0.5);
    let cd = lerp(c2, p3, 0.5);
    let abc = lerp(&ab, &bc, 0.5);
    let bcd = lerp(&bc, &cd, 0.5);
    let mid = lerp(&abc, &bcd, 0.5);
    [
        (*p0, quadratic_control(p0, &ab, &abc, &mid), mid),
        (mid, quadratic_control(&mid, &bcd, &cd, p3), *p3),
    ]
}

/// Control point of the quadratic that best matches the cubic `(a, b, c, d)`.
fn quadratic_control(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> Point2 {
    let x = (3.0 * (b.x + c.x) - a.x - d.x) * 0.25;
    let y = (3.0 * (b.y + c.y) - a.y - d.y) * 0.25;
    Point2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn straight_curve_is_not_subdivided() {
        let pts = subdivide_quadratic(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(2.0, 0.0),
            0.1,
            8,
        );
        assert_eq!(pts, vec![Point2::new(2.0, 0.0)]);
    }

    #[test]
    fn bent_curve_ends_at_end_point_and_stays_on_curve() {
        let (p0, p1, p2) = (
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 10.0),
            Point2::new(10.0, 0.0),
        );
        let pts = subdivide_quadratic(&p0, &p1, &p2, 0.1, 8);
        assert!(pts.len() > 4);
        assert_eq!(*pts.last().unwrap_or(&p0), p2);
        // The apex of this parabola is (5, 5); the flattened points never exceed it.
        assert!(pts.iter().all(|p| p.y <= 5.0 + 1e-4));
    }

    #[test]
    fn depth_limit_bounds_point_count() {
        let pts = subdivide_quadratic(
            &Point2::new(0.0, 0.0),
            &Point2::new(500.0, 1000.0),
            &Point2::new(1000.0, 0.0),
            1e-6,
            3,
        );
        assert_eq!(pts.len(), 8);
    }

    #[test]
    fn cubic_split_keeps_end_points() {
        let [first, second] = cubic_to_quadratics(
            &Point2::new(0.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 1.0),
            &Point2::new(1.0, 0.0),
        );
        assert_eq!(first.0, Point2::new(0.0, 0.0));
        assert_eq!(first.2, second.0);
        assert_eq!(second.2, Point2::new(1.0, 0.0));
        assert_relative_eq!(first.2.x, 0.5);
        assert_relative_eq!(first.2.y, 0.75);
    }
}

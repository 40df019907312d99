//! Differentiation chain for a 2D trajectory.

/// Derivative of uniformly spaced samples: central differences inside,
/// one-sided first-order differences at both ends. Fewer than two samples
/// give zeros.
pub fn gradient(f: &[f64], dt: f64) -> Vec<f64> {
    let n = f.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out = Vec::with_capacity(n);
    out.push((f[1] - f[0]) / dt);
    out.extend(f.windows(3).map(|w| (w[2] - w[0]) / (2.0 * dt)));
    out.push((f[n - 1] - f[n - 2]) / dt);
    out
}

/// Speed, acceleration and jerk magnitudes per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Kinematics {
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
    pub jerk: Vec<f64>,
}

impl Kinematics {
    pub fn from_xy(x: &[f64], y: &[f64], dt: f64) -> Self {
        let (vx, vy) = (gradient(x, dt), gradient(y, dt));
        let (ax, ay) = (gradient(&vx, dt), gradient(&vy, dt));
        let (jx, jy) = (gradient(&ax, dt), gradient(&ay, dt));
        Self {
            velocity: magnitude(&vx, &vy),
            acceleration: magnitude(&ax, &ay),
            jerk: magnitude(&jx, &jy),
        }
    }
}

fn magnitude(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(p, q)| p.hypot(*q)).collect()
}

/// Sum of consecutive Euclidean displacements.
pub fn path_length(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(wx, wy)| (wx[1] - wx[0]).hypot(wy[1] - wy[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_edges_and_interior() {
        let g = gradient(&[1.0, 2.0, 4.0, 7.0, 11.0], 0.5);
        assert_eq!(g, vec![2.0, 3.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn gradient_degenerate_lengths() {
        assert!(gradient(&[], 0.1).is_empty());
        assert_eq!(gradient(&[3.0], 0.1), vec![0.0]);
        assert_eq!(gradient(&[3.0, 4.0], 0.5), vec![2.0, 2.0]);
    }

    #[test]
    fn straight_line_at_constant_speed() {
        let x: Vec<f64> = (0..20).map(|i| 3.0 * i as f64).collect();
        let y: Vec<f64> = (0..20).map(|i| 4.0 * i as f64).collect();
        let k = Kinematics::from_xy(&x, &y, 0.01);
        assert!(k.velocity.iter().all(|v| (v - 500.0).abs() < 1e-9));
        assert!(k.acceleration.iter().all(|a| a.abs() < 1e-6));
        assert!(k.jerk.iter().all(|j| j.abs() < 1e-3));
        assert!((path_length(&x, &y) - 95.0).abs() < 1e-9);
    }
}

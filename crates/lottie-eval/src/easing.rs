//! Cubic timing curves with endpoints fixed at (0,0) and (1,1).

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::EvalConfig;

const NEWTON_MIN_SLOPE: f32 = 0.001;
const SUBDIVISION_PRECISION: f32 = 0.000_000_1;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct BezierEasing {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    // Empty for the identity curve.
    samples: Vec<f32>,
    newton_iterations: usize,
}

impl BezierEasing {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, config: &EvalConfig) -> Self {
        // x(t) must stay monotonic for the curve to be a function of time.
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let mut easing = Self {
            x1,
            y1,
            x2,
            y2,
            samples: Vec::new(),
            newton_iterations: config.newton_iterations,
        };
        if !easing.is_linear() {
            let count = config.easing_samples.max(2);
            let step = 1.0 / (count - 1) as f32;
            easing.samples = (0..count)
                .map(|i| calc_bezier(i as f32 * step, x1, x2))
                .collect();
        }
        easing
    }

    pub fn linear() -> Self {
        Self {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            samples: Vec::new(),
            newton_iterations: 0,
        }
    }

    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    pub fn get(&self, x: f32) -> f32 {
        if self.is_linear() {
            return x;
        }
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        calc_bezier(self.t_for_x(x), self.y1, self.y2)
    }

    fn t_for_x(&self, x: f32) -> f32 {
        let last = self.samples.len() - 1;
        let step = 1.0 / last as f32;

        let mut interval_start = 0.0;
        let mut current = 1;
        while current != last && self.samples[current] <= x {
            interval_start += step;
            current += 1;
        }
        current -= 1;

        let span = self.samples[current + 1] - self.samples[current];
        let dist = if span > 0.0 {
            (x - self.samples[current]) / span
        } else {
            0.0
        };
        let guess = interval_start + dist * step;

        let slope = get_slope(guess, self.x1, self.x2);
        if slope >= NEWTON_MIN_SLOPE {
            self.newton_raphson(x, guess)
        } else if slope == 0.0 {
            guess
        } else {
            binary_subdivide(x, interval_start, interval_start + step, self.x1, self.x2)
        }
    }

    fn newton_raphson(&self, x: f32, mut guess: f32) -> f32 {
        for _ in 0..self.newton_iterations {
            let slope = get_slope(guess, self.x1, self.x2);
            if slope == 0.0 {
                return guess;
            }
            let current = calc_bezier(guess, self.x1, self.x2) - x;
            guess -= current / slope;
        }
        guess
    }
}

fn a(a1: f32, a2: f32) -> f32 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

fn b(a1: f32, a2: f32) -> f32 {
    3.0 * a2 - 6.0 * a1
}

fn c(a1: f32) -> f32 {
    3.0 * a1
}

fn calc_bezier(t: f32, a1: f32, a2: f32) -> f32 {
    ((a(a1, a2) * t + b(a1, a2)) * t + c(a1)) * t
}

fn get_slope(t: f32, a1: f32, a2: f32) -> f32 {
    3.0 * a(a1, a2) * t * t + 2.0 * b(a1, a2) * t + c(a1)
}

fn binary_subdivide(x: f32, mut lo: f32, mut hi: f32, x1: f32, x2: f32) -> f32 {
    let mut t = lo;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        t = lo + (hi - lo) / 2.0;
        let current = calc_bezier(t, x1, x2) - x;
        if current.abs() <= SUBDIVISION_PRECISION {
            break;
        }
        if current > 0.0 {
            hi = t;
        } else {
            lo = t;
        }
    }
    t
}

/// Shares one solver per distinct control-point signature.
#[derive(Debug, Default)]
pub struct EasingCache {
    config: EvalConfig,
    solvers: HashMap<[u32; 4], Rc<BezierEasing>>,
}

impl EasingCache {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            solvers: HashMap::new(),
        }
    }

    pub fn get(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Rc<BezierEasing> {
        let key = [x1.to_bits(), y1.to_bits(), x2.to_bits(), y2.to_bits()];
        let config = &self.config;
        self.solvers
            .entry(key)
            .or_insert_with(|| Rc::new(BezierEasing::new(x1, y1, x2, y2, config)))
            .clone()
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_is_identity() {
        let e = BezierEasing::new(0.0, 0.0, 1.0, 1.0, &EvalConfig::default());
        for i in 0..=20 {
            let x = i as f32 / 20.0;
            assert_eq!(e.get(x), x);
        }
    }

    #[test]
    fn endpoints_are_exact() {
        let e = BezierEasing::new(0.42, 0.0, 0.58, 1.0, &EvalConfig::default());
        assert_eq!(e.get(0.0), 0.0);
        assert_eq!(e.get(1.0), 1.0);
    }

    #[test]
    fn ease_in_out_is_symmetric_and_monotonic() {
        let e = BezierEasing::new(0.42, 0.0, 0.58, 1.0, &EvalConfig::default());
        assert!((e.get(0.5) - 0.5).abs() < 1e-3);
        assert!((e.get(0.25) + e.get(0.75) - 1.0).abs() < 1e-3);
        let mut prev = 0.0;
        for i in 1..100 {
            let y = e.get(i as f32 / 100.0);
            assert!(y >= prev);
            prev = y;
        }
    }

    #[test]
    fn flat_start_uses_subdivision() {
        // Slope at t=0 is zero for x1=0, forcing the bisection path near the origin.
        let e = BezierEasing::new(0.0, 0.5, 1.0, 0.5, &EvalConfig::default());
        let y = e.get(0.01);
        assert!(y > 0.0 && y < 0.5, "{y}");
    }

    #[test]
    fn cache_shares_solvers() {
        let mut cache = EasingCache::new(EvalConfig::default());
        let a = cache.get(0.33, 0.0, 0.67, 1.0);
        let b = cache.get(0.33, 0.0, 0.67, 1.0);
        let _ = cache.get(0.1, 0.0, 0.9, 1.0);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }
}

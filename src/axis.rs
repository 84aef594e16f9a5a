use crate::models::AxisScale;

/// Headroom above the rounded maximum so bars never touch the frame.
const HEADROOM: f64 = 1.05;

/// Axis used when every plotted value is zero.
pub fn fallback() -> AxisScale {
    AxisScale {
        domain: [0.0, 5.0],
        ticks: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    }
}

/// Computes a readable `[0, max]` domain and evenly spaced ticks.
///
/// The maximum is rounded up on a half-order-of-magnitude grid, then snapped to
/// the 1/10/100/1000 band for its size, and never drops below
/// `(tick_count - 1) * min_interval`. The last tick is exactly that rounded
/// maximum; the domain adds 5% on top. Fewer than two ticks are treated as two.
pub fn scale(max_value: f64, min_interval: f64, tick_count: usize) -> AxisScale {
    if !max_value.is_finite() || max_value <= 0.0 {
        return fallback();
    }
    let tick_count = tick_count.max(2);

    let magnitude = 10f64.powf(max_value.log10().floor());
    let half = magnitude / 2.0;
    let mut nice = (max_value / half).ceil() * half;
    if nice < max_value {
        nice = (max_value / magnitude).ceil() * magnitude;
    }

    nice = if nice < 10.0 {
        max_value.ceil()
    } else if nice < 100.0 {
        (nice / 10.0).ceil() * 10.0
    } else if nice < 1000.0 {
        (nice / 100.0).ceil() * 100.0
    } else {
        (max_value / 1000.0).ceil() * 1000.0
    };

    let floor = (tick_count - 1) as f64 * min_interval;
    nice = nice.max(floor);

    let step = nice / (tick_count - 1) as f64;
    let mut ticks: Vec<f64> = (0..tick_count).map(|i| (step * i as f64).round()).collect();
    if let Some(last) = ticks.last_mut() {
        *last = nice;
    }

    AxisScale {
        domain: [0.0, nice * HEADROOM],
        ticks,
    }
}

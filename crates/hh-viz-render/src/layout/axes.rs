/// How values map onto an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log,
    /// One unit-width bin per category; ticks sit at the bin centres.
    Categorical,
}

/// Axis configuration with tick generation and data→pixel mapping.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub scale: AxisScale,
    pub label: String,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub minor_ticks: Vec<f64>,
}

impl Axis {
    /// Linear axis widened to whole multiples of a 1-2-5 step, about
    /// `target_ticks` labelled ticks, five minor divisions per step.
    pub fn auto_linear(data_min: f64, data_max: f64, target_ticks: usize) -> Self {
        let (lo, hi, step) = nice_range(data_min, data_max, target_ticks);
        let n_steps = ((hi - lo) / step).round() as usize;
        let at = |i: usize, div: f64| lo + i as f64 * step / div;

        let tick_positions: Vec<f64> = (0..=n_steps).map(|i| at(i, 1.0)).collect();
        let tick_labels = tick_positions.iter().map(|&v| format_tick(v, step)).collect();
        let minor_ticks = (0..=n_steps * MINOR_DIVISIONS)
            .filter(|i| i % MINOR_DIVISIONS != 0)
            .map(|i| at(i, MINOR_DIVISIONS as f64))
            .collect();

        Self {
            min: lo,
            max: hi,
            scale: AxisScale::Linear,
            label: String::new(),
            tick_positions,
            tick_labels,
            minor_ticks,
        }
    }

    /// Logarithmic axis over exactly `[min, max]`, labelled at the decades
    /// inside the range. Both bounds must be positive.
    pub fn log_range(min: f64, max: f64) -> Self {
        let lo = min.log10().floor() as i32;
        let hi = max.log10().ceil() as i32;
        let inside = |v: f64| v >= min * (1.0 - 1e-9) && v <= max * (1.0 + 1e-9);

        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let mut minor = Vec::new();
        for exp in lo..=hi {
            let decade = 10.0_f64.powi(exp);
            if inside(decade) {
                ticks.push(decade);
                labels.push(format_decade(exp));
            }
            for m in 2..=9 {
                let mv = m as f64 * decade;
                if inside(mv) {
                    minor.push(mv);
                }
            }
        }

        Self {
            min,
            max,
            scale: AxisScale::Log,
            label: String::new(),
            tick_positions: ticks,
            tick_labels: labels,
            minor_ticks: minor,
        }
    }

    /// Log axis padded out to whole decades around the data.
    pub fn auto_log(data_min: f64, data_max: f64) -> Self {
        let lo = data_min.max(1e-20).log10().floor();
        let hi = data_max.max(1e-20).log10().ceil().max(lo + 1.0);
        Self::log_range(10.0_f64.powf(lo), 10.0_f64.powf(hi))
    }

    /// One bin per label on `[0, n]`; minor ticks mark the inner bin edges.
    pub fn categorical(labels: &[String]) -> Self {
        let n = labels.len();
        Self {
            min: 0.0,
            max: n as f64,
            scale: AxisScale::Categorical,
            label: String::new(),
            tick_positions: (0..n).map(|i| i as f64 + 0.5).collect(),
            tick_labels: labels.to_vec(),
            minor_ticks: (1..n).map(|i| i as f64).collect(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a data value to pixel coordinate.
    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = match self.scale {
            AxisScale::Log => {
                let log_val = value.max(1e-20).ln();
                let log_min = self.min.max(1e-20).ln();
                let log_max = self.max.max(1e-20).ln();
                (log_val - log_min) / (log_max - log_min)
            }
            AxisScale::Linear | AxisScale::Categorical => (value - self.min) / (self.max - self.min),
        };
        px_min + frac * (px_max - px_min)
    }
}

const MINOR_DIVISIONS: usize = 5;

/// Range rounded outwards to the step chosen by [`nice_step`].
fn nice_range(data_min: f64, data_max: f64, target_ticks: usize) -> (f64, f64, f64) {
    let span = data_max - data_min;
    if span.abs() < 1e-15 {
        return (data_min - 1.0, data_max + 1.0, 1.0);
    }
    let step = nice_step(span / (target_ticks.max(2) - 1) as f64);
    ((data_min / step).floor() * step, (data_max / step).ceil() * step, step)
}

/// Closest 1, 2 or 5 times a power of ten.
fn nice_step(rough: f64) -> f64 {
    let decade = 10.0_f64.powf(rough.abs().log10().floor());
    let mantissa = rough / decade;
    let nice = [(1.5, 1.0), (3.5, 2.0), (7.5, 5.0)]
        .iter()
        .find(|(limit, _)| mantissa <= *limit)
        .map_or(10.0, |&(_, m)| m);
    nice * decade
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    if decimals == 0 {
        // Avoid "-0"
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v as i64)
    } else {
        format!("{:.prec$}", value, prec = decimals)
    }
}

/// ROOT labels small decades plainly and large ones as powers of ten.
fn format_decade(exp: i32) -> String {
    match exp {
        0..=4 => format!("{}", 10_i64.pow(exp as u32)),
        -2..=-1 => format!("{}", 10.0_f64.powi(exp)),
        _ => format!("10^{{{exp}}}"),
    }
}

//rolling indicators over a full series
//every output has the input's length; positions without a full window are NaN

use statrs::statistics::Statistics;

//simple moving average over `n` values
pub fn sma(values: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if n == 0 {
        return out;
    }
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= n {
            sum -= values[i - n];
        }
        if i + 1 >= n {
            out[i] = sum / n as f64;
        }
    }
    out
}

//rolling standard deviation; ddof 1 is the sample deviation, ddof 0 the population one
pub fn rolling_std(values: &[f64], n: usize, ddof: u8) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if n == 0 || (ddof == 1 && n < 2) {
        return out;
    }
    for i in (n - 1)..values.len() {
        let window = &values[i + 1 - n..=i];
        out[i] = if ddof == 0 {
            window.population_std_dev()
        } else {
            window.std_dev()
        };
    }
    out
}

//exponential moving average with alpha = 2 / (span + 1), seeded with the first value
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if span == 0 || values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut current = values[0];
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            current = alpha * value + (1.0 - alpha) * current;
        }
        if i + 1 >= span {
            out[i] = current;
        }
    }
    out
}

//middle, upper and lower bands at `k` sample deviations
#[derive(Debug, Clone)]
pub struct Bands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger(values: &[f64], n: usize, k: f64) -> Bands {
    let middle = sma(values, n);
    let std = rolling_std(values, n, 1);
    let upper = middle.iter().zip(&std).map(|(m, s)| m + k * s).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - k * s).collect();
    Bands { middle, upper, lower }
}

//series a moved from below b to above it between i - 1 and i
pub fn crossed_above(a: &[f64], b: &[f64], i: usize) -> bool {
    i > 0 && a[i - 1] < b[i - 1] && a[i] > b[i]
}

pub fn crossed_below(a: &[f64], b: &[f64], i: usize) -> bool {
    i > 0 && a[i - 1] > b[i - 1] && a[i] < b[i]
}

//change from i - 1 to i; NaN at the start
pub fn slope(values: &[f64], i: usize) -> f64 {
    if i == 0 {
        return f64::NAN;
    }
    values[i] - values[i - 1]
}

pub fn closes(bars: &[crate::data::Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

//! Human readable numbers for the dashboard

const SUFFIXES: [&str; 6] = ["", "K", "M", "G", "T", "P"];

/// Scale `num` down by thousands and append the matching suffix,
/// e.g. `1234567.0` becomes `1.2M`. NaN is shown as `-`.
pub fn convert_number_format(num: f64) -> String {
    if num.is_nan() {
        return "-".to_owned();
    }

    let mut num = num;
    let mut level = 0;
    while num.abs() >= 1000.0 && level < SUFFIXES.len() - 1 {
        num /= 1000.0;
        level += 1;
    }

    format!("{:.1}{}", num, SUFFIXES[level])
}

use std::str::FromStr;

pub fn rate_parser(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let s = s.strip_suffix("Hz").or_else(|| s.strip_suffix("hz")).unwrap_or(s).trim();
    u32::from_str(s)
        .map_err(|e| format!("Invalid sampling rate '{}': {}", s, e))
        .and_then(|v| {
            if v == 0 {
                Err("Sampling rate must be positive".to_string())
            } else {
                Ok(v)
            }
        })
}

/// Converts an interval in milliseconds to a whole number of samples, truncating.
pub fn ms_to_samples(ms: f64, rate: u32) -> usize {
    (rate as f64 * ms / 1000.0) as usize
}

/// Converts an interval in samples to whole milliseconds, truncating.
pub fn samples_to_ms(samples: usize, rate: u32) -> u64 {
    (samples as u64 * 1000) / rate as u64
}

/// Formats a time in milliseconds as `HH:MM:SS.mmm`. Hours wrap at 24.
pub fn format_time(ms: u64) -> String {
    let hr = ms / 3_600_000 % 24;
    let minute = ms / 60_000 % 60;
    let sec = ms / 1000 % 60;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hr, minute, sec, millis)
}

pub fn sample_to_time(sample: usize, rate: u32) -> String {
    format_time(samples_to_ms(sample, rate))
}

use std::time::Duration;

use anyhow::{anyhow, Result};

const MEBIBYTE: i64 = 1024 * 1024;

pub fn parse_cpu_to_millicores(q: &str) -> Option<i64> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }
    if let Some(stripped) = q.strip_suffix('n') {
        return stripped.parse::<i128>().ok().map(|nanos| (nanos / 1_000_000) as i64);
    }
    if let Some(stripped) = q.strip_suffix('u') {
        return stripped.parse::<i128>().ok().map(|micros| (micros / 1_000) as i64);
    }
    if let Some(stripped) = q.strip_suffix('m') {
        return stripped.parse::<i64>().ok();
    }
    // plain cores, integer or fractional
    q.parse::<f64>().ok().map(|cores| (cores * 1000.0).round() as i64)
}

pub fn parse_memory_to_bytes(q: &str) -> Option<i64> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }

    // Binary suffixes must be tried before their decimal prefixes ("Mi" before "M").
    const UNITS: &[(&str, i64)] = &[
        ("Ki", 1 << 10),
        ("Mi", 1 << 20),
        ("Gi", 1 << 30),
        ("Ti", 1 << 40),
        ("Pi", 1 << 50),
        ("Ei", 1 << 60),
        ("k", 1_000),
        ("K", 1_000),
        ("M", 1_000_000),
        ("G", 1_000_000_000),
        ("T", 1_000_000_000_000),
        ("P", 1_000_000_000_000_000),
        ("E", 1_000_000_000_000_000_000),
    ];

    for (suffix, multiplier) in UNITS {
        if let Some(stripped) = q.strip_suffix(suffix) {
            return stripped
                .parse::<f64>()
                .ok()
                .map(|v| (v * (*multiplier as f64)).round() as i64);
        }
    }
    q.parse::<i64>().ok()
}

/// Parses durations such as `300ms`, `45s`, `5m`, `1h30m`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow!("empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| anyhow!("missing unit in duration {:?}", s))?;
        if digits_end == 0 {
            return Err(anyhow!("invalid duration {:?}", s));
        }
        let value: f64 = rest[..digits_end]
            .parse()
            .map_err(|_| anyhow!("invalid number in duration {:?}", s))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let secs_per_unit = match &rest[..unit_end] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            other => return Err(anyhow!("unknown unit {:?} in duration {:?}", other, s)),
        };
        rest = &rest[unit_end..];
        let part = Duration::try_from_secs_f64(value * secs_per_unit)
            .map_err(|_| anyhow!("duration {:?} out of range", s))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| anyhow!("duration {:?} out of range", s))?;
    }
    Ok(total)
}

/// Renders a duration compactly for report headers, e.g. `1h30m` or `45s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{}h", h));
    }
    if m > 0 {
        out.push_str(&format!("{}m", m));
    }
    if s > 0 {
        out.push_str(&format!("{}s", s));
    }
    out
}

pub fn bytes_to_mebibytes(bytes: i64) -> i64 {
    bytes / MEBIBYTE
}

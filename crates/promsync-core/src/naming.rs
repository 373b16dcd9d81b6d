//! Exported metric naming.
//!
//! Prometheus names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`. Instrument names
//! commonly use `.` or `-` as separators, so every part is rewritten before it
//! is joined as `{namespace}_{subsystem}_{name}`.

const SEPARATOR: char = '_';

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Replace every character not allowed in a metric name with `_`.
/// Case is preserved.
pub fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if is_name_char(c) { c } else { SEPARATOR })
        .collect()
}

/// Build the fully-qualified exported name.
///
/// Empty `namespace`/`subsystem` parts are skipped. A name that would start
/// with a digit gets a leading `_`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    let mut out = String::with_capacity(namespace.len() + subsystem.len() + name.len() + 2);
    for part in [namespace, subsystem, name] {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(&sanitize(part));
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, SEPARATOR);
    }
    out
}

/// Append a statistic suffix (`_p99`, `_rate1`, ...) to an exported name.
pub fn with_suffix(fq: &str, suffix: &str) -> String {
    format!("{fq}{SEPARATOR}{suffix}")
}

/// Suffix used for a quantile: 0.5 -> `p50`, 0.999 -> `p999`.
pub fn percentile_suffix(q: f64) -> String {
    let pct = format!("{:.3}", q * 100.0);
    let digits = pct.trim_end_matches('0').trim_end_matches('.').replace('.', "");
    format!("p{digits}")
}

pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => chars.all(is_name_char),
        _ => false,
    }
}

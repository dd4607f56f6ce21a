//! Kubernetes resource quantity parsing
//!
//! Converts strings such as `250m`, `1.5`, `123456789n`, `512Mi` or `1e3` into CPU milli-units
//! and memory mebibytes.

const BYTES_PER_MI: f64 = 1024.0 * 1024.0;

/// Parse a quantity into its value in base units
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (number, multiplier) = split_suffix(s)?;
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value * multiplier)
}

/// CPU quantity in milli-units, rounded up like the API server does
pub fn cpu_milli(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|cores| (cores * 1000.0 - 1e-9).ceil().max(0.0) as u64)
}

/// Memory quantity in whole mebibytes
pub fn memory_mi(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|bytes| (bytes / BYTES_PER_MI).floor() as u64)
}

fn split_suffix(s: &str) -> Option<(&str, f64)> {
    const BINARY: [(&str, f64); 6] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
    ];
    for (suffix, factor) in BINARY {
        if let Some(number) = s.strip_suffix(suffix) {
            return Some((number, factor));
        }
    }

    // Decimal exponent form, e.g. 129e6; a trailing bare `E` is the exa suffix instead
    if let Some(pos) = s.find(['e', 'E']) {
        let (mantissa, exponent) = (&s[..pos], &s[pos + 1..]);
        if !exponent.is_empty() {
            let exp: i32 = exponent.parse().ok()?;
            return Some((mantissa, 10f64.powi(exp)));
        }
    }

    let last = s.chars().last()?;
    let decimal = match last {
        'n' => 1e-9,
        'u' => 1e-6,
        'm' => 1e-3,
        'k' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        'T' => 1e12,
        'P' => 1e15,
        'E' => 1e18,
        _ => return Some((s, 1.0)),
    };
    Some((&s[..s.len() - last.len_utf8()], decimal))
}

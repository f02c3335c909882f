use crate::currency::Currency;

/// Format a float with thousands separators and two decimals: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0 && (val * 100.0).round() != 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Amount with its currency symbol in front: -$1,234.56, €20.00
pub fn money(val: f64, currency: Currency) -> String {
    let formatted = amount(val);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-{}{rest}", currency.symbol()),
        None => format!("{}{formatted}", currency.symbol()),
    }
}

/// Blank for zero so wide currency tables stay readable.
pub fn amount_or_blank(val: f64) -> String {
    if (val * 100.0).round() == 0.0 {
        String::new()
    } else {
        amount(val)
    }
}

/// Human-readable file size.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

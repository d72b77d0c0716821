/// Currency symbol used for display
pub const CURRENCY_SYMBOL: &str = "₹";

/// Format an amount with the currency symbol, two decimals, and
/// thousands separators: `-₹1,234.50`
pub fn format_currency(amount: f64) -> String {
    let rounded = (amount.abs() * 100.0).round() / 100.0;
    let formatted = format!("{:.2}", rounded);
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && rounded > 0.0 { "-" } else { "" };
    format!("{}{}{}.{}", sign, CURRENCY_SYMBOL, grouped, fraction)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        d.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

/// Horizontal bar scaled against `max`, `width` cells at full scale.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 || !value.is_finite() {
        return String::new();
    }
    let cells = ((value / max).min(1.0) * width as f64).round() as usize;
    "█".repeat(cells.max(1))
}

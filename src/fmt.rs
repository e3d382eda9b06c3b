/// Format an amount with Indian digit grouping: ₹12,34,567.50
pub fn money(val: f64, symbol: &str) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    // Last three digits stay together, the rest group in pairs.
    let digits: Vec<char> = int_part.chars().collect();
    let split = digits.len().saturating_sub(3);
    let mut grouped = String::new();
    for (i, c) in digits[..split].iter().enumerate() {
        if i > 0 && (split - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    if split > 0 {
        grouped.push(',');
    }
    grouped.extend(&digits[split..]);

    if negative {
        format!("-{symbol}{grouped}.{dec_part}")
    } else {
        format!("{symbol}{grouped}.{dec_part}")
    }
}

/// Percentage with one decimal: 42.5%
pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}

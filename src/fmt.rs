const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Format an amount with two decimals: 1234.5 -> "1234.50"
pub fn amount(val: f64) -> String {
    let s = format!("{val:.2}");
    // -0.00 reads badly on an invoice
    if s == "-0.00" {
        "0.00".to_string()
    } else {
        s
    }
}

/// Amount followed by the euro sign: "92.50 €"
pub fn euro(val: f64) -> String {
    format!("{} \u{20ac}", amount(val))
}

/// Exchange rate as shown on detail lines (three decimals).
pub fn rate(val: f64) -> String {
    format!("{val:.3}")
}

/// Stored exchange rate as shown on market total lines, without padding.
pub fn stored_rate(val: f64) -> String {
    let s = format!("{val}");
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{s}.0")
    }
}

/// French month name for 1..=12, empty string otherwise.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTHS_FR[(month - 1) as usize],
        _ => "",
    }
}

/// Amount with thousands separators for terminal tables: 1 234 567.89
pub fn grouped(val: f64) -> String {
    let negative = val < 0.0;
    let cents = amount(val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_sep = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_sep.push(' ');
        }
        with_sep.push(c);
    }
    let with_sep: String = with_sep.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-{with_sep}.{dec_part}")
    } else {
        format!("{with_sep}.{dec_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(92.5), "92.50");
        assert_eq!(amount(0.0), "0.00");
        assert_eq!(amount(-0.001), "0.00");
        assert_eq!(amount(1234.567), "1234.57");
        assert_eq!(euro(92.5), "92.50 \u{20ac}");
    }

    #[test]
    fn test_rate_formatting() {
        assert_eq!(rate(0.925), "0.925");
        assert_eq!(rate(1.0), "1.000");
        assert_eq!(stored_rate(0.925), "0.925");
        assert_eq!(stored_rate(1.0), "1.0");
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), "janvier");
        assert_eq!(month_name(3), "mars");
        assert_eq!(month_name(12), "décembre");
        assert_eq!(month_name(0), "");
        assert_eq!(month_name(13), "");
    }

    #[test]
    fn test_grouped_formatting() {
        assert_eq!(grouped(1234.56), "1 234.56");
        assert_eq!(grouped(-500.0), "-500.00");
        assert_eq!(grouped(1000000.99), "1 000 000.99");
        assert_eq!(grouped(42.1), "42.10");
    }
}

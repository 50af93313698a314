// core/src/models/money.rs

/// Renders an amount the way the storefront prints prices: dot-grouped
/// thousands followed by the currency, e.g. `1.234.000 VND`.
pub fn format_vnd(amount: i64) -> String {
  let digits = amount.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  let sign = if amount < 0 { "-" } else { "" };
  format!("{}{} VND", sign, grouped)
}

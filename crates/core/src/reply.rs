use crate::domain::order::OrderRecord;
use crate::locale::Locale;

/// Deterministic status reply for a resolved order.
pub fn format_order_reply(order: &OrderRecord, locale: Locale) -> String {
    let status = order.status.as_deref().unwrap_or(locale.unspecified());
    let total = match order.total {
        Some(total) if !total.is_zero() => format!("{total} {}", locale.currency()),
        _ => locale.unspecified().to_string(),
    };

    let mut lines = vec![
        locale.order_heading(&order.id),
        format!("• {}: {status}", locale.status_label()),
        format!("• {}: {total}", locale.amount_label()),
    ];
    if let Some(date) = order.date.as_deref() {
        lines.push(format!("• {}: {date}", locale.date_label()));
    }

    format!("{}\n\n{}", lines.join("\n"), locale.order_closing())
}

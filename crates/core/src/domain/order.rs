use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only, request-scoped copy of an order held by the order backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub status: Option<String>,
    pub total: Option<Decimal>,
    pub date: Option<String>,
}

impl OrderRecord {
    /// Builds a record from one element of the backend's order search payload.
    ///
    /// The backend is not consistent about field shapes: `status` may be an object with a
    /// `name` or a bare string, `total` may be a number, a numeric string or an object with an
    /// `amount`, and `date` may be an object carrying `date`, a string, or missing in favour of
    /// `created_at`. Returns `None` only when the element has no usable `id`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = scalar_text(value.get("id")?)?;

        let status = match value.get("status") {
            Some(Value::Object(status)) => status.get("name").and_then(scalar_text),
            Some(other) => scalar_text(other),
            None => None,
        };

        let total = value.get("total").and_then(|total| match total {
            Value::Object(amount) => amount.get("amount").and_then(decimal_value),
            other => decimal_value(other),
        });

        let date = value
            .get("date")
            .and_then(date_text)
            .or_else(|| value.get("created_at").and_then(date_text));

        Some(Self { id, status, total, date })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn date_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(date) => date.get("date").and_then(scalar_text),
        other => scalar_text(other),
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    let decimal = match value {
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Some(Decimal::from(integer)),
            None => number.as_f64().and_then(|float| Decimal::try_from(float).ok()),
        },
        Value::String(text) => text.trim().parse::<Decimal>().ok(),
        _ => None,
    }?;
    Some(decimal.normalize())
}

//! Folds one order stream into its summary document.
//!
//! The fold works on raw JSON payloads rather than the domain's typed
//! events: it only needs a handful of fields, matches event types by suffix,
//! and looks keys up case-insensitively so that payloads written with other
//! naming conventions still project.

use common::StreamId;
use event_store::EventEnvelope;
use serde_json::Value;
use uuid::Uuid;

use crate::document::OrderSummary;
use crate::error::{ProjectionError, Result};

const ORDER_CREATED: &str = "OrderCreated";
const ORDER_LINE_ADDED: &str = "OrderLineAdded";

/// Currency of an order whose lines do not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Builds the summary of an order from its full event history.
///
/// Returns `Ok(None)` for a stream that contains no order creation, such as a
/// stream belonging to another aggregate. Events of unrelated types are
/// skipped.
pub fn project_order(
    stream_id: StreamId,
    events: &[EventEnvelope],
) -> Result<Option<OrderSummary>> {
    let mut summary: Option<OrderSummary> = None;
    let mut currency: Option<String> = None;

    for event in events {
        if event.event_type.ends_with(ORDER_CREATED) {
            if summary.is_some() {
                return Err(ProjectionError::AlreadyCreated {
                    stream_id,
                    version: event.version,
                });
            }

            let payload = event.payload_json()?;
            let customer_id = uuid_field(&payload, "customer_id", event)?;

            summary = Some(OrderSummary {
                id: stream_id,
                customer_id,
                total_amount: 0,
                currency: DEFAULT_CURRENCY.to_string(),
                line_count: 0,
            });
        } else if event.event_type.ends_with(ORDER_LINE_ADDED) {
            let doc = summary
                .as_mut()
                .ok_or(ProjectionError::OrderNotCreated {
                    stream_id,
                    version: event.version,
                })?;

            let payload = event.payload_json()?;
            let quantity = i64_field(&payload, "quantity", event)?;
            let unit_price = i64_field(&payload, "unit_price", event)?;
            let line_currency = field(&payload, "currency")
                .and_then(Value::as_str)
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

            match &currency {
                Some(expected) if *expected != line_currency => {
                    return Err(ProjectionError::CurrencyMismatch {
                        stream_id,
                        expected: expected.clone(),
                        actual: line_currency,
                    });
                }
                Some(_) => {}
                None => currency = Some(line_currency.clone()),
            }

            doc.total_amount = quantity
                .checked_mul(unit_price)
                .and_then(|line_total| doc.total_amount.checked_add(line_total))
                .ok_or(ProjectionError::AmountOverflow { stream_id })?;
            doc.line_count += 1;
            doc.currency = line_currency;
        }
    }

    Ok(summary)
}

/// Looks a key up ignoring case and underscores, so `unit_price`,
/// `UnitPrice` and `unitPrice` all match.
fn field<'a>(payload: &'a Value, name: &str) -> Option<&'a Value> {
    let wanted = normalize(name);
    payload
        .as_object()?
        .iter()
        .find(|(key, _)| normalize(key) == wanted)
        .map(|(_, value)| value)
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn i64_field(payload: &Value, name: &'static str, event: &EventEnvelope) -> Result<i64> {
    field(payload, name)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing(name, event))
}

fn uuid_field(payload: &Value, name: &'static str, event: &EventEnvelope) -> Result<Uuid> {
    field(payload, name)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| missing(name, event))
}

fn missing(field: &'static str, event: &EventEnvelope) -> ProjectionError {
    ProjectionError::MissingField {
        stream_id: event.stream_id,
        version: event.version,
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::Version;
    use serde_json::json;

    fn envelope(
        stream_id: StreamId,
        version: i64,
        event_type: &str,
        payload: Value,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .stream_id(stream_id)
            .version(Version::new(version))
            .event_type(event_type)
            .payload(&payload)
            .unwrap()
            .try_build()
            .unwrap()
    }

    fn created(stream_id: StreamId, customer_id: Uuid) -> EventEnvelope {
        envelope(
            stream_id,
            1,
            "sales.orders.OrderCreated",
            json!({
                "order_id": stream_id,
                "customer_id": customer_id,
                "created_at_utc": "2024-01-01T00:00:00Z",
            }),
        )
    }

    fn line(
        stream_id: StreamId,
        version: i64,
        quantity: i64,
        unit_price: i64,
        currency: &str,
    ) -> EventEnvelope {
        envelope(
            stream_id,
            version,
            "sales.orders.OrderLineAdded",
            json!({
                "order_id": stream_id,
                "product_id": Uuid::new_v4(),
                "quantity": quantity,
                "unit_price": unit_price,
                "currency": currency,
            }),
        )
    }

    #[test]
    fn sums_lines() {
        let id = StreamId::new();
        let customer = Uuid::new_v4();
        let events = vec![
            created(id, customer),
            line(id, 2, 2, 1000, "USD"),
            line(id, 3, 1, 550, "USD"),
        ];

        let doc = project_order(id, &events).unwrap().unwrap();

        assert_eq!(
            doc,
            OrderSummary {
                id,
                customer_id: customer,
                total_amount: 2550,
                currency: "USD".to_string(),
                line_count: 2,
            }
        );
    }

    #[test]
    fn order_without_lines_is_zero_usd() {
        let id = StreamId::new();
        let doc = project_order(id, &[created(id, Uuid::new_v4())]).unwrap().unwrap();

        assert_eq!(doc.total_amount, 0);
        assert_eq!(doc.currency, DEFAULT_CURRENCY);
        assert_eq!(doc.line_count, 0);
    }

    #[test]
    fn first_line_fixes_currency() {
        let id = StreamId::new();
        let events = vec![created(id, Uuid::new_v4()), line(id, 2, 1, 300, "eur")];

        let doc = project_order(id, &events).unwrap().unwrap();
        assert_eq!(doc.currency, "EUR");
    }

    #[test]
    fn mixed_currencies_fail() {
        let id = StreamId::new();
        let events = vec![
            created(id, Uuid::new_v4()),
            line(id, 2, 1, 300, "EUR"),
            line(id, 3, 1, 300, "USD"),
        ];

        assert!(matches!(
            project_order(id, &events),
            Err(ProjectionError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn pascal_case_payloads_project() {
        let id = StreamId::new();
        let customer = Uuid::new_v4();
        let events = vec![
            envelope(id, 1, "Sales.OrderCreated", json!({"OrderId": id, "CustomerId": customer})),
            envelope(id, 2, "Sales.OrderLineAdded", json!({"Quantity": 3, "UnitPrice": 200})),
        ];

        let doc = project_order(id, &events).unwrap().unwrap();
        assert_eq!(doc.customer_id, customer);
        assert_eq!(doc.total_amount, 600);
        assert_eq!(doc.currency, DEFAULT_CURRENCY);
    }

    #[test]
    fn unrelated_events_are_skipped() {
        let id = StreamId::new();
        let events = vec![
            created(id, Uuid::new_v4()),
            envelope(id, 2, "sales.orders.OrderNoteAdded", json!({"note": "hi"})),
            line(id, 3, 1, 100, "USD"),
        ];

        let doc = project_order(id, &events).unwrap().unwrap();
        assert_eq!(doc.line_count, 1);
    }

    #[test]
    fn stream_without_creation_yields_nothing() {
        let id = StreamId::new();
        let events = vec![envelope(id, 1, "billing.InvoiceIssued", json!({}))];

        assert_eq!(project_order(id, &events).unwrap(), None);
        assert_eq!(project_order(id, &[]).unwrap(), None);
    }

    #[test]
    fn second_creation_fails() {
        let id = StreamId::new();
        let first_customer = Uuid::new_v4();
        let events = vec![
            created(id, first_customer),
            line(id, 2, 1, 100, "USD"),
            envelope(
                id,
                3,
                "sales.orders.OrderCreated",
                json!({"order_id": id, "customer_id": Uuid::new_v4()}),
            ),
        ];

        match project_order(id, &events) {
            Err(ProjectionError::AlreadyCreated { stream_id, version }) => {
                assert_eq!(stream_id, id);
                assert_eq!(version, Version::new(3));
            }
            other => panic!("expected AlreadyCreated, got {other:?}"),
        }
    }

    #[test]
    fn line_before_creation_fails() {
        let id = StreamId::new();
        let events = vec![line(id, 1, 1, 100, "USD")];

        assert!(matches!(
            project_order(id, &events),
            Err(ProjectionError::OrderNotCreated { .. })
        ));
    }

    #[test]
    fn missing_quantity_is_reported() {
        let id = StreamId::new();
        let events = vec![
            created(id, Uuid::new_v4()),
            envelope(id, 2, "sales.orders.OrderLineAdded", json!({"unit_price": 100})),
        ];

        match project_order(id, &events) {
            Err(ProjectionError::MissingField { field, version, .. }) => {
                assert_eq!(field, "quantity");
                assert_eq!(version, Version::new(2));
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_fails() {
        let id = StreamId::new();
        let mut bad = created(id, Uuid::new_v4());
        bad.payload = b"not json".to_vec();

        assert!(matches!(
            project_order(id, &[bad]),
            Err(ProjectionError::Deserialization(_))
        ));
    }
}

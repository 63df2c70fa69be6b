//! Detects the wire style of an inbound payload and converts REST answers
//! into the `vads_*` field set the rest of the pipeline works on.

use chrono::{DateTime, NaiveDateTime};
use lyra_core::{fields, find_currency, FieldSet, IS_REST_FIELD};
use serde_json::Value;

use crate::error::{NotifyError, NotifyResult};
use crate::types::{
    InboundNotification, RestEnvelope, REST_ANSWER_FIELD, REST_HASH_ALGORITHM_FIELD,
    REST_HASH_FIELD, REST_HASH_KEY_FIELD,
};

/// Classify a raw form payload and normalize it.
///
/// A payload carrying `kr-answer` and `kr-hash` is REST style, even if it
/// also has stray `vads_*` keys. Otherwise it must carry at least one
/// `vads_*` key and is passed through unchanged.
pub fn classify_and_normalize(raw: &FieldSet) -> NotifyResult<InboundNotification> {
    if let (Some(answer), Some(hash)) = (raw.get(REST_ANSWER_FIELD), raw.get(REST_HASH_FIELD)) {
        let fields = normalize_rest_answer(answer)?;
        let envelope = RestEnvelope {
            answer: answer.to_string(),
            hash: hash.to_string(),
            hash_algorithm: raw.get(REST_HASH_ALGORITHM_FIELD).map(str::to_string),
            hash_key: raw.get(REST_HASH_KEY_FIELD).map(str::to_string),
        };
        return Ok(InboundNotification::Rest { fields, envelope });
    }

    if raw.has_signed_fields() {
        return Ok(InboundNotification::Legacy {
            fields: raw.clone(),
        });
    }

    Err(NotifyError::NotificationParseError(
        "payload has neither vads_ fields nor a REST envelope".into(),
    ))
}

/// Convert a `kr-answer` JSON document to `vads_*` fields.
fn normalize_rest_answer(answer: &str) -> NotifyResult<FieldSet> {
    let answer: Value = serde_json::from_str(answer)
        .map_err(|e| NotifyError::NotificationParseError(format!("kr-answer is not JSON: {e}")))?;
    if !answer.is_object() {
        return Err(NotifyError::NotificationParseError(
            "kr-answer is not a JSON object".into(),
        ));
    }

    let order_id = text(&answer["orderDetails"]["orderId"]);
    if order_id.is_empty() {
        return Err(NotifyError::NotificationParseError(
            "kr-answer has no orderDetails.orderId".into(),
        ));
    }

    // Only the first transaction of the answer is reported.
    let tx = &answer["transactions"][0];
    let card = &tx["transactionDetails"]["cardDetails"];

    let currency = text(&tx["currency"]);
    let currency_numeric = find_currency(&currency)
        .map(|c| c.numeric.to_string())
        .unwrap_or_default();

    let result = match text(&tx["errorCode"]) {
        code if code.is_empty() => "00".to_string(),
        code => code,
    };

    let mut out = FieldSet::new();
    out.insert(fields::TRANS_STATUS, text(&tx["detailedStatus"]));
    out.insert(fields::TRANS_UUID, text(&tx["uuid"]));
    out.insert(fields::AMOUNT, text(&tx["amount"]));
    out.insert(fields::CURRENCY, currency_numeric);
    out.insert(fields::ORDER_ID, order_id);
    out.insert(fields::ORDER_STATUS, text(&answer["orderStatus"]));
    out.insert(fields::ORDER_CYCLE, text(&answer["orderCycle"]));
    out.insert(fields::TRANS_ID, text(&card["legacyTransId"]));
    out.insert(fields::TRANS_DATE, gateway_date(&text(&tx["creationDate"])));
    out.insert(fields::RESULT, result);
    out.insert(fields::EXTRA_RESULT, text(&tx["detailedErrorCode"]));
    out.insert(fields::OPERATION_TYPE, text(&tx["operationType"]));
    out.insert(fields::CARD_BRAND, text(&card["effectiveBrand"]));
    out.insert(fields::CARD_NUMBER, text(&card["pan"]));
    out.insert(
        fields::AUTH_NUMBER,
        text(&card["authorizationResponse"]["authorizationNumber"]),
    );
    out.insert(fields::CUST_EMAIL, text(&answer["customer"]["email"]));
    out.insert(fields::PAYMENT_CONFIG, "SINGLE");
    out.insert(IS_REST_FIELD, "1");
    Ok(out)
}

/// JSON leaf as a field value. Null, missing leaves and containers give `""`.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// REST dates are ISO 8601; `vads_trans_date` is `YYYYMMDDHHMMSS` UTC.
/// Anything unparseable is kept as received.
fn gateway_date(raw: &str) -> String {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date.naive_utc().format("%Y%m%d%H%M%S").to_string();
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return date.format("%Y%m%d%H%M%S").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer() -> Value {
        json!({
            "shopId": "12345678",
            "orderCycle": "CLOSED",
            "orderStatus": "PAID",
            "orderDetails": { "orderId": "S00042", "orderTotalAmount": 1999 },
            "customer": { "email": "rosa@example.pe" },
            "transactions": [{
                "uuid": "5b2b8a0c3f6f4a1e9b1c2d3e4f5a6b7c",
                "amount": 1999,
                "currency": "PEN",
                "detailedStatus": "AUTHORISED",
                "operationType": "DEBIT",
                "creationDate": "2024-03-09T14:05:07+00:00",
                "errorCode": null,
                "detailedErrorCode": null,
                "transactionDetails": {
                    "cardDetails": {
                        "legacyTransId": "000042",
                        "pan": "497010XXXXXX0055",
                        "effectiveBrand": "VISA",
                        "authorizationResponse": { "authorizationNumber": "3fe4c1" }
                    }
                }
            }]
        })
    }

    fn rest_payload(answer: &Value) -> FieldSet {
        [
            ("kr-answer", answer.to_string()),
            ("kr-hash", "abc".to_string()),
            ("kr-hash-algorithm", "sha256_hmac".to_string()),
            ("kr-hash-key", "password".to_string()),
            ("kr-answer-type", "V4/Payment".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_legacy_payload_passes_through() {
        let raw: FieldSet = [
            ("vads_order_id", "S00042"),
            ("vads_trans_status", "AUTHORISED"),
            ("signature", "abc"),
        ]
        .into_iter()
        .collect();

        let notification = classify_and_normalize(&raw).unwrap();
        assert!(!notification.is_rest());
        assert_eq!(notification.fields(), &raw);
        assert!(!notification.fields().contains_key("is_rest"));
    }

    #[test]
    fn test_rest_payload_is_normalized() {
        let notification = classify_and_normalize(&rest_payload(&answer())).unwrap();
        assert!(notification.is_rest());

        let f = notification.fields();
        assert_eq!(f.get("is_rest"), Some("1"));
        assert_eq!(f.get("vads_trans_status"), Some("AUTHORISED"));
        assert_eq!(f.get("vads_trans_uuid"), Some("5b2b8a0c3f6f4a1e9b1c2d3e4f5a6b7c"));
        assert_eq!(f.get("vads_amount"), Some("1999"));
        assert_eq!(f.get("vads_currency"), Some("604"));
        assert_eq!(f.get("vads_order_id"), Some("S00042"));
        assert_eq!(f.get("vads_order_status"), Some("PAID"));
        assert_eq!(f.get("vads_order_cycle"), Some("CLOSED"));
        assert_eq!(f.get("vads_trans_id"), Some("000042"));
        assert_eq!(f.get("vads_trans_date"), Some("20240309140507"));
        assert_eq!(f.get("vads_result"), Some("00"));
        assert_eq!(f.get("vads_extra_result"), Some(""));
        assert_eq!(f.get("vads_operation_type"), Some("DEBIT"));
        assert_eq!(f.get("vads_card_brand"), Some("VISA"));
        assert_eq!(f.get("vads_card_number"), Some("497010XXXXXX0055"));
        assert_eq!(f.get("vads_auth_number"), Some("3fe4c1"));
        assert_eq!(f.get("vads_cust_email"), Some("rosa@example.pe"));
        assert_eq!(f.get("vads_payment_config"), Some("SINGLE"));
        assert!(!f.contains_key("kr-answer"));
    }

    #[test]
    fn test_rest_envelope_keeps_raw_answer() {
        let answer = answer();
        let raw = rest_payload(&answer);
        match classify_and_normalize(&raw).unwrap() {
            InboundNotification::Rest { envelope, .. } => {
                assert_eq!(envelope.answer, answer.to_string());
                assert_eq!(envelope.hash, "abc");
                assert_eq!(envelope.hash_algorithm.as_deref(), Some("sha256_hmac"));
                assert_eq!(envelope.hash_key.as_deref(), Some("password"));
            }
            other => panic!("expected REST notification, got {other:?}"),
        }
    }

    #[test]
    fn test_rest_error_code_is_kept() {
        let mut answer = answer();
        answer["transactions"][0]["errorCode"] = json!("149");
        answer["transactions"][0]["detailedErrorCode"] = json!("51");
        let notification = classify_and_normalize(&rest_payload(&answer)).unwrap();
        assert_eq!(notification.fields().get("vads_result"), Some("149"));
        assert_eq!(notification.fields().get("vads_extra_result"), Some("51"));
    }

    #[test]
    fn test_rest_without_transactions_yields_empty_values() {
        let answer = json!({
            "orderCycle": "OPEN",
            "orderStatus": "UNPAID",
            "orderDetails": { "orderId": "S7" }
        });
        let notification = classify_and_normalize(&rest_payload(&answer)).unwrap();
        let f = notification.fields();
        assert_eq!(f.get("vads_order_id"), Some("S7"));
        assert_eq!(f.get("vads_trans_status"), Some(""));
        assert_eq!(f.get("vads_currency"), Some(""));
        assert_eq!(f.get("vads_cust_email"), Some(""));
    }

    #[test]
    fn test_rest_missing_order_id_is_parse_error() {
        let mut answer = answer();
        answer["orderDetails"]["orderId"] = Value::Null;
        let err = classify_and_normalize(&rest_payload(&answer)).unwrap_err();
        assert!(matches!(err, NotifyError::NotificationParseError(_)));
    }

    #[test]
    fn test_rest_malformed_json_is_parse_error() {
        let raw: FieldSet = [("kr-answer", "{not json"), ("kr-hash", "abc")]
            .into_iter()
            .collect();
        let err = classify_and_normalize(&raw).unwrap_err();
        assert!(matches!(err, NotifyError::NotificationParseError(_)));
    }

    #[test]
    fn test_answer_without_hash_is_not_rest() {
        let raw: FieldSet = [("kr-answer", answer().to_string())].into_iter().collect();
        let err = classify_and_normalize(&raw).unwrap_err();
        assert!(matches!(err, NotifyError::NotificationParseError(_)));
    }

    #[test]
    fn test_empty_payload_is_parse_error() {
        let raw: FieldSet = [("foo", "bar")].into_iter().collect();
        assert!(matches!(
            classify_and_normalize(&raw),
            Err(NotifyError::NotificationParseError(_))
        ));
    }

    #[test]
    fn test_gateway_date_formats() {
        assert_eq!(gateway_date("2024-03-09T14:05:07+00:00"), "20240309140507");
        assert_eq!(gateway_date("2024-03-09T09:05:07-05:00"), "20240309140507");
        assert_eq!(gateway_date("2024-03-09T14:05:07"), "20240309140507");
        assert_eq!(gateway_date("yesterday"), "yesterday");
    }
}

//! Conversion of raw upstream products into [`CanonicalProduct`] records.
//!
//! Pure functions only. The one fatal condition is a record without a usable
//! identity (or with a price that cannot be read as a number); everything
//! else degrades to a default.

use super::error::SyncError;
use super::payload::RawProductPayload;
use crate::models::CanonicalProduct;
use chrono::NaiveDateTime;

/// Upstream status code for an active product.
pub const ACTIVE_STATUS: &str = "A";

/// Timestamp layout used by upstream: `31/12/2024 23:59:59`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub fn normalize(raw: RawProductPayload) -> Result<CanonicalProduct, SyncError> {
    let id = parse_id(raw.id.as_deref())?;
    let price = parse_price(id, "preco", raw.price.as_deref())?;
    let cost_price = parse_price(id, "preco_custo", raw.cost_price.as_deref())?;

    Ok(CanonicalProduct {
        id,
        name: raw.name.map(|name| name.trim().to_string()).unwrap_or_default(),
        sku: non_blank(raw.code),
        gtin: non_blank(raw.gtin),
        price,
        cost_price,
        unit: non_blank(raw.unit),
        active: raw.status.as_deref() == Some(ACTIVE_STATUS),
        created_at: parse_timestamp(id, raw.created_at.as_deref()),
        updated_at: parse_timestamp(id, raw.updated_at.as_deref()),
    })
}

fn parse_id(value: Option<&str>) -> Result<i64, SyncError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SyncError::Normalization("product payload has no id".to_string()))?;

    value.parse::<i64>().map_err(|_| {
        SyncError::Normalization(format!("product id '{value}' is not an integer"))
    })
}

/// Parse a locale-formatted decimal such as `10,50` or `1.234,56`.
///
/// A comma is the decimal separator; when one is present any dots are
/// thousands separators. Absent or blank values are zero.
fn parse_price(id: i64, field: &str, value: Option<&str>) -> Result<f64, SyncError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(0.0);
    };

    let canonical = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.to_string()
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| {
            SyncError::Normalization(format!(
                "product {id}: {field} '{value}' is not a decimal number"
            ))
        })
}

fn parse_timestamp(id: i64, value: Option<&str>) -> Option<NaiveDateTime> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;
    match NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::debug!("product {}: ignoring timestamp '{}': {}", id, value, err);
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(id: &str) -> RawProductPayload {
        RawProductPayload {
            id: Some(id.to_string()),
            name: Some("Caderno 96 folhas".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_comma_decimal_price() {
        let product = normalize(RawProductPayload {
            price: Some("10,50".to_string()),
            cost_price: Some("4,25".to_string()),
            ..raw("1")
        })
        .unwrap();

        assert_eq!(product.price, 10.50);
        assert_eq!(product.cost_price, 4.25);
    }

    #[test]
    fn test_thousands_separator_and_point_decimal() {
        let grouped = normalize(RawProductPayload {
            price: Some("1.234,56".to_string()),
            ..raw("1")
        })
        .unwrap();
        assert_eq!(grouped.price, 1234.56);

        let numeric = normalize(RawProductPayload {
            price: Some("10.5".to_string()),
            ..raw("1")
        })
        .unwrap();
        assert_eq!(numeric.price, 10.5);
    }

    #[test]
    fn test_missing_price_defaults_to_zero() {
        let product = normalize(raw("7")).unwrap();
        assert_eq!(product.price, 0.0);
        assert_eq!(product.cost_price, 0.0);

        let blank = normalize(RawProductPayload {
            price: Some("  ".to_string()),
            ..raw("7")
        })
        .unwrap();
        assert_eq!(blank.price, 0.0);
    }

    #[test]
    fn test_unparsable_price_is_fatal() {
        let err = normalize(RawProductPayload {
            price: Some("R$ abc".to_string()),
            ..raw("9")
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Normalization(_)));
    }

    #[test]
    fn test_active_only_for_exact_marker() {
        let with_status = |status: Option<&str>| {
            normalize(RawProductPayload {
                status: status.map(str::to_string),
                ..raw("3")
            })
            .unwrap()
            .active
        };

        assert!(with_status(Some("A")));
        assert!(!with_status(Some("I")));
        assert!(!with_status(Some("E")));
        assert!(!with_status(Some("a")));
        assert!(!with_status(Some("A ")));
        assert!(!with_status(None));
    }

    #[test]
    fn test_missing_or_invalid_id_is_fatal() {
        let missing = normalize(RawProductPayload {
            id: None,
            ..raw("1")
        })
        .unwrap_err();
        assert!(matches!(missing, SyncError::Normalization(_)));

        let invalid = normalize(raw("12a")).unwrap_err();
        assert!(invalid.to_string().contains("12a"));
    }

    #[test]
    fn test_timestamps() {
        let product = normalize(RawProductPayload {
            created_at: Some("05/03/2024 14:30:00".to_string()),
            updated_at: Some("2024-03-05".to_string()),
            ..raw("5")
        })
        .unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(product.created_at, Some(expected));
        assert_eq!(product.updated_at, None);
    }

    #[test]
    fn test_optional_fields() {
        let product = normalize(RawProductPayload {
            code: Some(" CAD-96 ".to_string()),
            gtin: Some(String::new()),
            unit: Some("UN".to_string()),
            ..raw(" 11 ")
        })
        .unwrap();

        assert_eq!(product.id, 11);
        assert_eq!(product.sku.as_deref(), Some("CAD-96"));
        assert_eq!(product.gtin, None);
        assert_eq!(product.unit.as_deref(), Some("UN"));
        assert_eq!(product.name, "Caderno 96 folhas");
    }
}

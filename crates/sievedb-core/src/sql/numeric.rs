//! Numeric range validation for compare values.

use sievedb_ir::Value;

use crate::error::Error;
use crate::schema::FieldType;

/// Reject compare values outside the field's declared numeric range.
///
/// Bounds per type: 32-bit integers at `±(2³¹ − 1)`, bigints at `±(2⁶³ − 1)`,
/// decimals at `10^(precision − scale) − 10^(−scale)`, floats unbounded.
/// Out-of-range literals are rejected here, before any SQL is emitted.
/// Non-numeric field types pass through untouched.
pub fn validate_numeric_bounds(
    field_name: &str,
    field_type: &FieldType,
    value: &Value,
) -> Result<(), Error> {
    if !field_type.is_numeric() {
        return Ok(());
    }
    if value.is_null() {
        return Ok(());
    }

    let Some(number) = value.numeric() else {
        return Err(Error::InvalidQuery(format!(
            "non-numeric compare value for numeric field '{field_name}'"
        )));
    };

    let bound = match field_type {
        FieldType::Integer => (i32::MAX as f64, "a 32-bit integer"),
        FieldType::BigInt => (i64::MAX as f64, "a 64-bit integer"),
        FieldType::Decimal { precision, scale } => {
            if scale > precision {
                return Err(Error::InvalidQuery(format!(
                    "field '{field_name}' declares scale {scale} larger than precision {precision}"
                )));
            }
            let digits = i32::from(*precision) - i32::from(*scale);
            let max = 10f64.powi(digits) - 10f64.powi(-i32::from(*scale));
            (max, "the declared precision")
        }
        FieldType::Float => return Ok(()),
        _ => return Ok(()),
    };

    if number.abs() > bound.0 {
        return Err(Error::InvalidQuery(format!(
            "compare value {number} for field '{field_name}' exceeds {}",
            bound.1
        )));
    }
    Ok(())
}

//! Scalar values bound as statement parameters.
//!
//! [`Scalar`] is the closed set of values a [`Value`](crate::value) fragment
//! may carry: text, finite numbers, booleans, null, and (possibly nested)
//! ordered lists of scalars. Arbitrary structs are not representable, which
//! is the point.
//!
//! The [`ToSql`] implementation bridges compiled values straight into
//! `tokio-postgres` without this crate executing anything itself.

use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::error::{FragError, FragResult};

/// A value that can be bound as a `$n` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<Scalar>),
}

impl Scalar {
    /// Reject non-finite numbers anywhere in the value, including nested
    /// lists. NaN and infinities have no portable SQL literal or wire form.
    pub(crate) fn check_finite(&self) -> FragResult<()> {
        match self {
            Scalar::Float(f) if !f.is_finite() => Err(FragError::InvalidValue(format!(
                "non-finite number {f} cannot be bound as a parameter"
            ))),
            Scalar::List(items) => items.iter().try_for_each(Scalar::check_finite),
            _ => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<i16> for Scalar {
    fn from(v: i16) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Scalar::Null,
        }
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Scalar {
    fn from(v: Vec<T>) -> Self {
        Scalar::List(v.into_iter().map(Into::into).collect())
    }
}

impl ToSql for Scalar {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Scalar::Text(v) => v.to_sql(ty, out),
            Scalar::Int(v) => v.to_sql(ty, out),
            Scalar::Float(v) => v.to_sql(ty, out),
            Scalar::Bool(v) => v.to_sql(ty, out),
            Scalar::Null => Ok(IsNull::Yes),
            Scalar::List(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The concrete wire encoding is only known per variant; mismatches
        // surface from the delegated `to_sql` call.
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_cover_scalar_kinds() {
        assert_eq!(Scalar::from("x"), Scalar::Text("x".to_string()));
        assert_eq!(Scalar::from(7_i32), Scalar::Int(7));
        assert_eq!(Scalar::from(0.5_f64), Scalar::Float(0.5));
        assert_eq!(Scalar::from(true), Scalar::Bool(true));
        assert_eq!(Scalar::from(None::<i64>), Scalar::Null);
        assert_eq!(
            Scalar::from(vec![1_i64, 2]),
            Scalar::List(vec![Scalar::Int(1), Scalar::Int(2)])
        );
    }

    #[test]
    fn nested_lists_are_representable() {
        let nested = Scalar::from(vec![vec![1_i64], vec![2, 3]]);
        assert_eq!(
            nested,
            Scalar::List(vec![
                Scalar::List(vec![Scalar::Int(1)]),
                Scalar::List(vec![Scalar::Int(2), Scalar::Int(3)]),
            ])
        );
        assert!(nested.check_finite().is_ok());
    }

    #[test]
    fn check_finite_rejects_nan_and_infinity() {
        assert!(Scalar::Float(f64::NAN).check_finite().is_err());
        assert!(Scalar::Float(f64::INFINITY).check_finite().is_err());
        assert!(Scalar::Float(f64::NEG_INFINITY).check_finite().is_err());
        assert!(Scalar::Float(1.5).check_finite().is_ok());
    }

    #[test]
    fn check_finite_descends_into_lists() {
        let bad = Scalar::List(vec![Scalar::Int(1), Scalar::List(vec![Scalar::Float(f64::NAN)])]);
        assert!(bad.check_finite().is_err());
    }
}

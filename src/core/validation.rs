//! Candidate value validation.

use crate::core::ConfigValue;
use crate::error::ValidationError;
use std::fmt;
use std::sync::Arc;

/// Type alias for validator functions attached to a slot.
///
/// A validator runs on every fetched candidate before it is stored. A
/// rejected candidate leaves the slot at its previous value.
pub type Validator<T> = Arc<dyn Fn(&T) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// Numeric kinds that can carry inclusive bounds.
pub trait Bounded: ConfigValue + PartialOrd + Copy + fmt::Display {}

impl Bounded for i32 {}
impl Bounded for u32 {}
impl Bounded for f32 {}
impl Bounded for f64 {}

/// Inclusive `[lower, upper]` bounds for a numeric slot.
///
/// # Examples
///
/// ```rust
/// use hotswap_registry::core::Bounds;
///
/// let bounds = Bounds::new(0, 10);
/// assert!(bounds.check(&10).is_ok());
/// assert!(bounds.check(&42).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    /// Smallest accepted value
    pub lower: T,
    /// Largest accepted value
    pub upper: T,
}

impl<T: Bounded> Bounds<T> {
    /// Create inclusive bounds.
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    /// True when `upper < lower`, which rejects every value.
    pub fn is_inverted(&self) -> bool {
        self.upper < self.lower
    }

    /// Check a candidate value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] if the value lies outside
    /// the bounds or is not comparable (NaN).
    pub fn check(&self, value: &T) -> std::result::Result<(), ValidationError> {
        if self.lower <= *value && *value <= self.upper {
            Ok(())
        } else {
            Err(ValidationError::out_of_bounds(value, self.lower, self.upper))
        }
    }

    /// Turn these bounds into a slot validator.
    pub fn into_validator(self) -> Validator<T> {
        Arc::new(move |value: &T| self.check(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = Bounds::new(0, 10);
        assert!(bounds.check(&0).is_ok());
        assert!(bounds.check(&10).is_ok());
        assert!(bounds.check(&-1).is_err());
        assert!(bounds.check(&11).is_err());
    }

    #[test]
    fn test_inverted_bounds() {
        let bounds = Bounds::new(10u32, 0u32);
        assert!(bounds.is_inverted());
        assert!(bounds.check(&5).is_err());
    }

    #[test]
    fn test_nan_is_rejected() {
        let bounds = Bounds::new(0.0f64, 1.0);
        assert!(bounds.check(&f64::NAN).is_err());
    }

    #[test]
    fn test_validator_reports_value() {
        let validator = Bounds::new(0.5f32, 1.5).into_validator();
        let err = validator(&2.0).unwrap_err();
        assert_eq!(err, ValidationError::out_of_bounds(2.0f32, 0.5f32, 1.5f32));
    }

    proptest! {
        #[test]
        fn prop_check_matches_range(lower in -1000i32..1000, width in 0i32..1000, value in -3000i32..3000) {
            let upper = lower + width;
            let bounds = Bounds::new(lower, upper);
            prop_assert_eq!(bounds.check(&value).is_ok(), (lower..=upper).contains(&value));
        }
    }
}

//! Input validation
//!
//! Pure predicates run before anything touches the network. A failed
//! check keeps the corresponding attempt in Idle.

use crate::types::StudentForm;

/// Student identifiers are strictly positive
pub fn is_valid_id(id: i64) -> bool {
    id > 0
}

/// Birth years are strictly positive
pub fn is_valid_year(year: i64) -> bool {
    year > 0
}

/// Non-empty after trimming surrounding whitespace
pub fn is_non_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Accept the add form iff id > 0, name non-blank, year > 0, class non-blank
pub fn validate_student_form(form: &StudentForm) -> bool {
    is_valid_id(form.id)
        && is_non_blank(&form.name)
        && is_valid_year(form.birth_year)
        && is_non_blank(&form.class_label)
}

/// Accept a rename iff id > 0 and the new name is non-blank
pub fn validate_name_update(id: i64, new_name: &str) -> bool {
    is_valid_id(id) && is_non_blank(new_name)
}

/// Convert a JS number to an integer; fractional, infinite and NaN values
/// (what an empty or garbled numeric input produces) are rejected
pub fn integer_from_js(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

//! Rust to JavaScript value conversion
//!
//! Records and attempt snapshots are handed to JS as plain objects. Counts
//! and identifiers become Numbers while they fit the safe integer range
//! and BigInts beyond it.

use crate::types::Record;
use wasm_bindgen::prelude::*;

/// Largest integer a JS Number represents exactly (2^53 - 1)
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Error type for JS conversion failures
#[derive(Debug, Clone)]
pub struct JsConversionError(String);

impl JsConversionError {
    pub fn new(msg: &str) -> Self {
        JsConversionError(msg.to_string())
    }
}

impl std::fmt::Display for JsConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JsConversionError> for JsValue {
    fn from(err: JsConversionError) -> Self {
        js_sys::Error::new(&err.0).into()
    }
}

/// Trait for converting Rust types to JavaScript values
pub trait TryIntoJsValue {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError>;
}

impl TryIntoJsValue for String {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        Ok(JsValue::from_str(self))
    }
}

impl TryIntoJsValue for bool {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        Ok(JsValue::from_bool(*self))
    }
}

impl TryIntoJsValue for u64 {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        if *self <= MAX_SAFE_INTEGER {
            Ok(JsValue::from_f64(*self as f64))
        } else {
            Ok(js_sys::BigInt::from(*self).into())
        }
    }
}

impl<T: TryIntoJsValue> TryIntoJsValue for Option<T> {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        match self {
            Some(v) => v.try_to_js_value(),
            None => Ok(JsValue::undefined()),
        }
    }
}

impl<T: TryIntoJsValue> TryIntoJsValue for Vec<T> {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        let arr = js_sys::Array::new();
        for item in self {
            arr.push(&item.try_to_js_value()?);
        }
        Ok(arr.into())
    }
}

impl TryIntoJsValue for Record {
    fn try_to_js_value(&self) -> Result<JsValue, JsConversionError> {
        crate::js_obj!(
            "id" => self.id,
            "name" => self.name.clone(),
            "birthYear" => self.birth_year,
            "classLabel" => self.class_label.clone(),
            "exists" => self.exists,
            "completedCourses" => self.completed_courses.clone()
        )
    }
}

/// Macro for building JavaScript objects
#[macro_export]
macro_rules! js_obj {
    ( $( $key:expr => $value:expr ),* $(,)? ) => {{
        use $crate::wasm::try_into_js_value::{TryIntoJsValue, JsConversionError};
        let obj = js_sys::Object::new();
        $(
            js_sys::Reflect::set(
                &obj,
                &wasm_bindgen::JsValue::from_str($key),
                &TryIntoJsValue::try_to_js_value(&$value)?
            ).map_err(|_| JsConversionError::new(&format!("Failed to set property: {}", $key)))?;
        )*
        Ok::<wasm_bindgen::JsValue, JsConversionError>(obj.into())
    }};
}

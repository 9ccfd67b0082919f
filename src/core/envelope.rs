//! Purpose: The `{status, result, error}` shape every native call returns.
//! Exports: `Envelope`, `STATUS_KEY`, `RESULT_KEY`, `ERROR_KEY`.
//! Role: Splits native outcomes into typed results, business errors, and protocol errors.
//! Invariants: A populated `error` means the call failed; the result is never decoded then.
//! Invariants: `status == true` with an error, or `status == false` without one, is a protocol error.
//! Invariants: A missing or non-bool `status` is a protocol error (binding/library skew).
use crate::core::error::{Error, ErrorInfo};
use crate::core::mapper::{DecodeContext, Decode, Encode, decode};
use crate::core::value::DynamicValue;

pub const STATUS_KEY: &str = "status";
pub const RESULT_KEY: &str = "result";
pub const ERROR_KEY: &str = "error";

crate::record!(ErrorInfo {
    Code(required) => code,
    Name(required) => name,
    Scope => scope,
    Message => message,
    Description => description,
    Full => full,
});

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    pub status: bool,
    pub result: Option<T>,
    pub error: Option<ErrorInfo>,
}

impl<T> Envelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            status: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            status: false,
            result: None,
            error: Some(error),
        }
    }

    /// Success for calls whose result is structurally absent.
    pub fn empty() -> Self {
        Self {
            status: true,
            result: None,
            error: None,
        }
    }

    /// Business errors become `ErrorKind::Native`; otherwise the (possibly absent) result.
    pub fn resolve(self) -> Result<Option<T>, Error> {
        match self.error {
            Some(info) => Err(Error::native(info)),
            None => Ok(self.result),
        }
    }
}

impl<T: Decode> Envelope<T> {
    pub fn decode(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error> {
        if value.as_object().is_err() {
            return Err(Error::protocol(format!(
                "envelope must be an object, found {:?}",
                value.tag()
            )));
        }
        let status = match value.get(STATUS_KEY) {
            Some(DynamicValue::Bool(status)) => *status,
            Some(other) => {
                return Err(Error::protocol(format!(
                    "envelope status must be Bool, found {:?}",
                    other.tag()
                ))
                .with_key(STATUS_KEY));
            }
            None => return Err(Error::protocol("envelope is missing status").with_key(STATUS_KEY)),
        };

        let error = match value.get(ERROR_KEY) {
            None | Some(DynamicValue::Null) => None,
            Some(raw) => Some(
                decode::<ErrorInfo>(raw, cx)
                    .map_err(|err| err.with_key(ERROR_KEY).into_protocol("malformed envelope error"))?,
            ),
        };

        match (status, &error) {
            (true, Some(_)) => {
                return Err(Error::protocol("envelope reports success with an error"));
            }
            (false, None) => {
                return Err(Error::protocol("envelope reports failure without an error"));
            }
            _ => {}
        }

        let result = match (status, value.get(RESULT_KEY)) {
            (true, Some(raw)) if !raw.is_null() => {
                Some(decode::<T>(raw, cx).map_err(|err| err.with_key(RESULT_KEY))?)
            }
            _ => None,
        };

        Ok(Self {
            status,
            result,
            error,
        })
    }
}

impl<T: Encode> Encode for Envelope<T> {
    fn encode(&self) -> DynamicValue {
        let mut entries = vec![(STATUS_KEY.to_string(), DynamicValue::Bool(self.status))];
        if let Some(result) = &self.result {
            entries.push((RESULT_KEY.to_string(), result.encode()));
        }
        if let Some(error) = &self.error {
            entries.push((ERROR_KEY.to_string(), error.encode()));
        }
        DynamicValue::Object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::Envelope;
    use crate::core::error::{ErrorInfo, ErrorKind};
    use crate::core::json::from_json;
    use crate::core::mapper::{DecodeContext, Encode};
    use crate::core::value::DynamicValue;
    use serde_json::json;

    #[test]
    fn failure_envelope_never_decodes_result() {
        let cx = DecodeContext::detached();
        // result has the wrong shape for i64, which would fail if it were decoded
        let value = from_json(&json!({
            "status": false,
            "result": "garbage",
            "error": {"code": 100, "name": "InvalidArgument", "message": "bad limit"}
        }));
        let envelope = Envelope::<i64>::decode(&value, &cx).expect("envelope");
        assert!(envelope.result.is_none());
        let err = envelope.resolve().expect_err("native error");
        assert_eq!(err.kind(), ErrorKind::Native);
        let info = err.native_info().expect("info");
        assert_eq!(info.code, 100);
        assert_eq!(info.name, "InvalidArgument");
        assert_eq!(info.full, None);
    }

    #[test]
    fn missing_status_is_protocol_error() {
        let cx = DecodeContext::detached();
        let value = from_json(&json!({"result": 1}));
        let err = Envelope::<i64>::decode(&value, &cx).expect_err("no status");
        assert!(err.is_protocol());
        assert_eq!(err.key(), Some("status"));

        let err = Envelope::<i64>::decode(&DynamicValue::Int32(1), &cx).expect_err("scalar");
        assert!(err.is_protocol());
    }

    #[test]
    fn contradictory_envelopes_are_protocol_errors() {
        let cx = DecodeContext::detached();
        let ok_with_error = from_json(&json!({
            "status": true,
            "error": {"code": 1, "name": "X", "message": "y"}
        }));
        assert!(Envelope::<()>::decode(&ok_with_error, &cx).unwrap_err().is_protocol());

        let failed_silently = from_json(&json!({"status": false}));
        assert!(Envelope::<()>::decode(&failed_silently, &cx).unwrap_err().is_protocol());
    }

    #[test]
    fn encoded_envelopes_decode_back() {
        let cx = DecodeContext::detached();
        let value = Envelope::success(42i64).encode();
        let envelope = Envelope::<i64>::decode(&value, &cx).expect("decode");
        assert_eq!(envelope.resolve().expect("ok"), Some(42));

        let info = ErrorInfo {
            code: 7,
            name: "Denied".to_string(),
            scope: "thread".to_string(),
            message: "no access".to_string(),
            description: "user lacks access".to_string(),
            full: Some("Denied: no access".to_string()),
        };
        let value = Envelope::<()>::failure(info.clone()).encode();
        assert_eq!(
            value.get("error").and_then(|e| e.get("full")),
            Some(&DynamicValue::string("Denied: no access"))
        );
        let err = Envelope::<()>::decode(&value, &cx)
            .expect("decode")
            .resolve()
            .expect_err("failure");
        assert_eq!(err.native_info(), Some(&info));
    }

    #[test]
    fn void_envelope_has_no_result() {
        let cx = DecodeContext::detached();
        let value = Envelope::<()>::empty().encode();
        assert!(value.get("result").is_none());
        let envelope = Envelope::<()>::decode(&value, &cx).expect("decode");
        assert_eq!(envelope.resolve().expect("ok"), None);
    }

    #[test]
    fn error_without_code_or_name_is_protocol_error() {
        let cx = DecodeContext::detached();
        let value = from_json(&json!({
            "status": false,
            "error": {"name": "InvalidArgument", "message": "bad limit"}
        }));
        let err = Envelope::<()>::decode(&value, &cx).expect_err("no code");
        assert!(err.is_protocol());
        assert_eq!(err.key(), Some("code"));
    }
}

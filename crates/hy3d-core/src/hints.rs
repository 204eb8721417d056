//! Explanations for remote error codes
//!
//! The table is plain data: adding a code never touches the polling logic.
//! Codes are matched exactly first, then by the segment before the first
//! `.` so that sub-codes like `AuthFailure.SignatureFailure` pick up the
//! `AuthFailure` entry.

/// A human-readable explanation for one remote error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHint {
    pub code: &'static str,
    pub title: &'static str,
    pub hint: &'static str,
}

pub static ERROR_HINTS: &[ErrorHint] = &[
    ErrorHint {
        code: "ResourceInsufficient",
        title: "Resource insufficient",
        hint: "Likely causes:
  1. Account quota used up: the daily or monthly free quota is exhausted.
     Check the quota in the Tencent Cloud international console.
  2. Insufficient balance: the API is billed and the account has no credit left.
  3. Hunyuan 3D (Pro) access is not activated for this account.
  4. Too many concurrent jobs: wait a moment and try again.
Console: https://console.intl.cloud.tencent.com/ (Billing & Cost Management)",
    },
    ErrorHint {
        code: "AuthFailure",
        title: "Authentication failed",
        hint: "Check the Secret ID and Secret Key, and make sure they were issued \
for the international (Global) API.",
    },
    ErrorHint {
        code: "LimitExceeded",
        title: "Rate limit exceeded",
        hint: "The API call limit was exceeded. Wait a few minutes and try again.",
    },
    ErrorHint {
        code: "InvalidParameter",
        title: "Invalid parameter",
        hint: "Check the submitted parameters: face_count must be within \
40000-1500000 and generate_type one of Normal/LowPoly/Geometry/Sketch.",
    },
];

/// Look up the hint for a remote error code
pub fn hint_for(code: &str) -> Option<&'static ErrorHint> {
    ERROR_HINTS.iter().find(|h| h.code == code).or_else(|| {
        let family = code.split('.').next()?;
        ERROR_HINTS.iter().find(|h| h.code == family)
    })
}

/// Format a remote error as `[code] message`, followed by the expanded
/// explanation when the code is known
pub fn describe(code: Option<&str>, message: &str) -> String {
    match code {
        Some(code) if !code.is_empty() => match hint_for(code) {
            Some(h) => format!("[{}] {}\n{} ({}):\n{}", code, message, h.title, h.code, h.hint),
            None => format!("[{}] {}", code, message),
        },
        _ => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_hints() {
        for code in ["ResourceInsufficient", "AuthFailure", "LimitExceeded", "InvalidParameter"] {
            assert!(hint_for(code).is_some(), "missing hint for {}", code);
        }
    }

    #[test]
    fn test_sub_code_matches_family() {
        let hint = hint_for("AuthFailure.SecretIdNotFound").unwrap();
        assert_eq!(hint.code, "AuthFailure");
    }

    #[test]
    fn test_unknown_code_has_no_hint() {
        assert!(hint_for("InternalError").is_none());
        assert_eq!(describe(Some("InternalError"), "boom"), "[InternalError] boom");
    }

    #[test]
    fn test_describe_expands_known_code() {
        let text = describe(Some("LimitExceeded"), "too many requests");
        assert!(text.starts_with("[LimitExceeded] too many requests\n"));
        assert!(text.contains("Wait a few minutes"));
    }

    #[test]
    fn test_describe_without_code() {
        assert_eq!(describe(None, "plain"), "plain");
        assert_eq!(describe(Some(""), "plain"), "plain");
    }
}

//! TC3-HMAC-SHA256 request signing for Tencent Cloud API v3

use crate::config::Credentials;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use hy3d_core::{Hy3dError, Result};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const SERVICE: &str = "hunyuan";
pub const API_VERSION: &str = "2023-09-01";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";

type HmacSha256 = Hmac<Sha256>;

/// Headers to attach to one signed POST request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub authorization: String,
    pub headers: Vec<(&'static str, String)>,
}

/// Sign a JSON POST to `host` for `service`/`action`, as of unix `timestamp`
pub fn sign_request(
    credentials: &Credentials,
    service: &str,
    host: &str,
    action: &str,
    body: &str,
    timestamp: i64,
) -> Result<SignedRequest> {
    let date = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| Hy3dError::Transport(format!("Invalid request timestamp {}", timestamp)))?
        .format("%Y-%m-%d")
        .to_string();

    let canonical = canonical_request(host, action, body);
    let signature = signature(&credentials.secret_key, service, &date, timestamp, &canonical)?;

    let authorization = format!(
        "{} Credential={}/{}/{}/tc3_request, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.secret_id, date, service, SIGNED_HEADERS, signature
    );

    let headers = vec![
        ("Authorization", authorization.clone()),
        ("Content-Type", CONTENT_TYPE.to_string()),
        ("Host", host.to_string()),
        ("X-TC-Action", action.to_string()),
        ("X-TC-Timestamp", timestamp.to_string()),
        ("X-TC-Version", API_VERSION.to_string()),
        ("X-TC-Region", credentials.region.clone()),
    ];

    Ok(SignedRequest {
        authorization,
        headers,
    })
}

fn canonical_request(host: &str, action: &str, body: &str) -> String {
    format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\nx-tc-action:{}\n\n{}\n{}",
        CONTENT_TYPE,
        host,
        action.to_lowercase(),
        SIGNED_HEADERS,
        sha256_hex(body.as_bytes())
    )
}

/// Hex signature of `canonical_request` under the derived TC3 key
fn signature(
    secret_key: &str,
    service: &str,
    date: &str,
    timestamp: i64,
    canonical_request: &str,
) -> Result<String> {
    let string_to_sign = format!(
        "{}\n{}\n{}/{}/tc3_request\n{}",
        ALGORITHM,
        timestamp,
        date,
        service,
        sha256_hex(canonical_request.as_bytes())
    );

    let secret_date = hmac_sha256(format!("TC3{}", secret_key).as_bytes(), date)?;
    let secret_service = hmac_sha256(&secret_date, service)?;
    let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
    Ok(to_hex(&hmac_sha256(&secret_signing, &string_to_sign)?))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Hy3dError::Transport(format!("Failed to initialise request signer: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret-key", "ap-singapore").unwrap()
    }

    const TS: i64 = 1_700_000_000; // 2023-11-14T22:13:20Z

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_request(&creds(), SERVICE, "hunyuan.intl.tencentcloudapi.com", "QueryHunyuanTo3DProJob", r#"{"JobId":"1"}"#, TS).unwrap();
        let b = sign_request(&creds(), SERVICE, "hunyuan.intl.tencentcloudapi.com", "QueryHunyuanTo3DProJob", r#"{"JobId":"1"}"#, TS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_authorization_format() {
        let signed = sign_request(&creds(), SERVICE, "hunyuan.intl.tencentcloudapi.com", "SubmitHunyuanTo3DProJob", "{}", TS).unwrap();
        let prefix = "TC3-HMAC-SHA256 Credential=AKIDEXAMPLE/2023-11-14/hunyuan/tc3_request, SignedHeaders=content-type;host;x-tc-action, Signature=";
        assert!(signed.authorization.starts_with(prefix), "{}", signed.authorization);
        let sig = &signed.authorization[prefix.len()..];
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_body_and_key() {
        let host = "hunyuan.intl.tencentcloudapi.com";
        let base = sign_request(&creds(), SERVICE, host, "QueryHunyuanTo3DProJob", r#"{"JobId":"1"}"#, TS).unwrap();
        let other_body = sign_request(&creds(), SERVICE, host, "QueryHunyuanTo3DProJob", r#"{"JobId":"2"}"#, TS).unwrap();
        let other_key = Credentials::new("AKIDEXAMPLE", "another-key", "ap-singapore").unwrap();
        let other_key = sign_request(&other_key, SERVICE, host, "QueryHunyuanTo3DProJob", r#"{"JobId":"1"}"#, TS).unwrap();
        assert_ne!(base.authorization, other_body.authorization);
        assert_ne!(base.authorization, other_key.authorization);
    }

    #[test]
    fn test_headers_present() {
        let signed = sign_request(&creds(), SERVICE, "example.com", "QueryHunyuanTo3DProJob", "{}", TS).unwrap();
        let get = |name: &str| {
            signed
                .headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("X-TC-Action"), Some("QueryHunyuanTo3DProJob"));
        assert_eq!(get("X-TC-Timestamp"), Some("1700000000"));
        assert_eq!(get("X-TC-Version"), Some(API_VERSION));
        assert_eq!(get("X-TC-Region"), Some("ap-singapore"));
        assert_eq!(get("Host"), Some("example.com"));
    }

    // Worked example from the Tencent Cloud API v3 signing guide
    const GUIDE_SECRET_ID: &str = "AKIDz8krbsJ5yKBZQpn74WFkmLPx3EXAMPLE";
    const GUIDE_SECRET_KEY: &str = "Gu5t9xGARNpq86cd98joQYCN3EXAMPLE";
    const GUIDE_TS: i64 = 1_551_113_065;
    const GUIDE_HOST: &str = "cvm.tencentcloudapi.com";
    const GUIDE_BODY: &str =
        r#"{"Limit": 1, "Filters": [{"Values": ["\u672a\u547d\u540d"], "Name": "instance-name"}]}"#;

    #[test]
    fn test_guide_payload_and_signature() {
        assert_eq!(
            sha256_hex(GUIDE_BODY.as_bytes()),
            "35e9c5b0e3ae67532d3c9f17ead6c90222632e5b1ff7f6e89887f1398934f064"
        );

        // The guide signs content-type and host only
        let canonical = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\ncontent-type;host\n{}",
            CONTENT_TYPE,
            GUIDE_HOST,
            sha256_hex(GUIDE_BODY.as_bytes())
        );
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "5ffe6a04c0664d6b969fab9a13bdab201d63ee709638e2749d62a09ca18d7031"
        );
        assert_eq!(
            signature(GUIDE_SECRET_KEY, "cvm", "2019-02-25", GUIDE_TS, &canonical).unwrap(),
            "72e494ea809ad7a8c8f7a4507b9bddcbaa8e581f516e8da2f66e2c5a96525168"
        );
    }

    #[test]
    fn test_guide_request_with_action_header() {
        let creds = Credentials::new(GUIDE_SECRET_ID, GUIDE_SECRET_KEY, "ap-guangzhou").unwrap();
        let signed =
            sign_request(&creds, "cvm", GUIDE_HOST, "DescribeInstances", GUIDE_BODY, GUIDE_TS).unwrap();
        assert_eq!(
            signed.authorization,
            "TC3-HMAC-SHA256 Credential=AKIDz8krbsJ5yKBZQpn74WFkmLPx3EXAMPLE/2019-02-25/cvm/tc3_request, \
             SignedHeaders=content-type;host;x-tc-action, \
             Signature=644be983de9a8a3f00db8eadaba61467c3b429e2215758ba897b738ca469fd26"
        );
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha256(b"Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            to_hex(&mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}

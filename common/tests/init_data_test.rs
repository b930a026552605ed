// common/tests/init_data_test.rs
use common::init_data::{self, data_check_string, DEFAULT_MAX_AGE_SECONDS};
use common::{InvalidReason, SecretString, Verifier};
use serde_json::json;

const SECRET: &str = "test-secret";
const NOW: i64 = 1_700_000_010;
const KNOWN_HASH: &str = "103828cd277834def3fadd5e0c89501ffb3828a3cc4df6dc6177e539118d3331";

fn verifier() -> Verifier {
    Verifier::new(&SecretString::from(SECRET)).unwrap()
}

fn sample_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("auth_date", "1700000000"),
        ("query_id", "AAA"),
        ("user", "{\"id\":1,\"first_name\":\"Ann\",\"username\":\"ann\",\"language_code\":\"en\"}"),
        ("start_param", "promo"),
        ("chat_type", "private"),
    ]
}

#[test]
fn test_known_payload_is_valid() {
    let encoded = format!(
        "auth_date=1700000000&query_id=AAA&user=%7B%22id%22%3A1%7D&hash={}",
        KNOWN_HASH
    );
    let secret = SecretString::from(SECRET);
    let data = init_data::verify(&encoded, &secret, NOW, DEFAULT_MAX_AGE_SECONDS).unwrap();

    assert_eq!(data.user, Some(json!({ "id": 1 })));
    assert_eq!(data.auth_date, 1_700_000_000);
    assert_eq!(data.query_id.as_deref(), Some("AAA"));
    assert_eq!(data.start_param, None);
}

#[test]
fn test_known_payload_with_zero_hash_is_rejected() {
    let encoded = format!(
        "auth_date=1700000000&query_id=AAA&user=%7B%22id%22%3A1%7D&hash={}",
        "0".repeat(64)
    );
    assert_eq!(
        verifier().verify(&encoded, NOW),
        Err(InvalidReason::BadSignature)
    );
}

#[test]
fn test_signed_payload_is_valid() {
    let v = verifier();
    let encoded = v.sign_encoded(&sample_fields());
    let data = v.verify(&encoded, NOW).unwrap();

    assert_eq!(data.user_id(), Some(1));
    assert_eq!(data.start_param.as_deref(), Some("promo"));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let encoded = verifier().sign_encoded(&sample_fields());
    let other = Verifier::new(&SecretString::from("another-secret")).unwrap();
    assert_eq!(other.verify(&encoded, NOW), Err(InvalidReason::BadSignature));
}

#[test]
fn test_flipping_any_hash_character_is_rejected() {
    let v = verifier();
    let fields = sample_fields();
    let hash = v.sign(&fields);
    let body = v.sign_encoded(&fields);
    let prefix = body.trim_end_matches(hash.as_str());

    for i in 0..hash.len() {
        let mut flipped = hash.clone().into_bytes();
        flipped[i] = if flipped[i] == b'0' { b'1' } else { b'0' };
        let encoded = format!("{}{}", prefix, String::from_utf8(flipped).unwrap());
        assert_eq!(
            v.verify(&encoded, NOW),
            Err(InvalidReason::BadSignature),
            "flipped position {}",
            i
        );
    }
}

#[test]
fn test_removing_hash_is_missing_signature() {
    let v = verifier();
    let fields = sample_fields();
    let encoded = v.sign_encoded(&fields);
    let without_hash: Vec<&str> = encoded
        .split('&')
        .filter(|pair| !pair.starts_with("hash="))
        .collect();

    assert_eq!(
        v.verify(&without_hash.join("&"), NOW),
        Err(InvalidReason::MissingSignature)
    );
}

#[test]
fn test_tampering_with_any_field_is_rejected() {
    let v = verifier();
    let fields = sample_fields();
    let hash = v.sign(&fields);

    for i in 0..fields.len() {
        let mut tampered: Vec<(String, String)> = fields
            .iter()
            .map(|(k, val)| (k.to_string(), val.to_string()))
            .collect();
        tampered[i].1.push('x');
        tampered.push(("hash".to_string(), hash.clone()));

        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(tampered.iter())
            .finish();
        assert_eq!(
            v.verify(&encoded, NOW),
            Err(InvalidReason::BadSignature),
            "tampered field {}",
            fields[i].0
        );
    }
}

#[test]
fn test_field_order_does_not_matter() {
    let v = verifier();
    let fields = sample_fields();
    let hash = v.sign(&fields);

    let mut reversed = fields.clone();
    reversed.reverse();
    assert_eq!(v.sign(&reversed), hash);

    let mut shuffled = vec![("hash", hash.as_str())];
    shuffled.extend(reversed.iter().copied());
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(shuffled)
        .finish();
    assert!(v.verify(&encoded, NOW).is_ok());
}

#[test]
fn test_freshness_boundary() {
    let v = verifier();
    let now = 1_800_000_000;

    for (age, fresh) in [(86_399, true), (86_400, true), (86_401, false)] {
        let auth_date = (now - age).to_string();
        let encoded = v.sign_encoded(&[("auth_date", auth_date.as_str())]);
        let result = v.verify(&encoded, now);
        if fresh {
            assert!(result.is_ok(), "age {} should be fresh", age);
        } else {
            assert_eq!(result, Err(InvalidReason::Stale), "age {} should be stale", age);
        }
    }
}

#[test]
fn test_empty_values_are_not_signed() {
    let v = verifier();
    let with_empty = [("auth_date", "1700000000"), ("foo", ""), ("query_id", "AAA")];
    let without = [("auth_date", "1700000000"), ("query_id", "AAA")];

    assert_eq!(data_check_string(&with_empty), data_check_string(&without));
    assert_eq!(v.sign(&with_empty), v.sign(&without));

    let encoded = format!("auth_date=1700000000&foo=&query_id=AAA&hash={}", v.sign(&without));
    assert!(v.verify(&encoded, NOW).is_ok());
}

#[test]
fn test_malformed_user_does_not_block_verification() {
    let v = verifier();
    let encoded = v.sign_encoded(&[("auth_date", "1700000000"), ("user", "{\"id\":")]);
    let data = v.verify(&encoded, NOW).unwrap();
    assert_eq!(data.user, None);
    assert_eq!(data.auth_date, 1_700_000_000);
}

#[test]
fn test_user_with_escaped_json_is_decoded_twice() {
    let v = verifier();
    // The host may percent-encode the JSON inside the form value
    let encoded = v.sign_encoded(&[("auth_date", "1700000000"), ("user", "%7B%22id%22%3A5%7D")]);
    assert_eq!(v.verify(&encoded, NOW).unwrap().user_id(), Some(5));
}

#[test]
fn test_verifier_is_shareable_between_threads() {
    let v = std::sync::Arc::new(verifier());
    let encoded = v.sign_encoded(&sample_fields());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let v = v.clone();
            let encoded = encoded.clone();
            std::thread::spawn(move || v.verify(&encoded, NOW).is_ok())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

//! HMAC-SHA256 signing and verification.

#[cfg(test)]
mod tests {
    use sigil_auth::canonical::build_canonical_string;
    use sigil_auth::keys::load_symmetric;
    use sigil_auth::{
        AuthErrorKind, QueryParams, SignatureAlgorithm, SigningRequest, sign, verify,
    };

    use crate::{NOW, authenticator, hmac_key, submit_request};

    const ALG: SignatureAlgorithm = SignatureAlgorithm::HmacSha256;

    fn bare_submit() -> SigningRequest {
        SigningRequest::new(ALG, "POST", "/api/v1/workflows/submit").with_timestamp(NOW)
    }

    #[test]
    fn test_should_sign_and_verify_known_scenario() {
        let key = hmac_key();
        let request = bare_submit();

        assert_eq!(
            build_canonical_string(ALG, &request, NOW, None),
            "POST\n/api/v1/workflows/submit\n\n1700000000"
        );

        let envelope = sign(&request, &key).unwrap();
        assert_eq!(
            envelope.signature,
            "3e76156ae2762668c3fc0ddab33d57644bc2eef93c9d8f8fead56d43f883ddef"
        );
        assert!(verify(&request, &envelope, &key).is_ok());

        let wrong = load_symmetric("wrong").unwrap();
        let err = verify(&request, &envelope, &wrong).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
    }

    #[test]
    fn test_should_reject_single_field_tampering() {
        let key = hmac_key();
        let query: QueryParams = [("priority", "high"), ("queue", "gpu")].into_iter().collect();
        let signed = bare_submit().with_query(query);
        let envelope = sign(&signed, &key).unwrap();
        assert!(verify(&signed, &envelope, &key).is_ok());

        let mut tampered_query = signed.clone();
        tampered_query.query_mut().insert("priority", "low");

        let tampered = [
            SigningRequest::new(ALG, "PUT", "/api/v1/workflows/submit")
                .with_query(signed.query().clone()),
            SigningRequest::new(ALG, "POST", "/api/v1/workflows/submit/")
                .with_query(signed.query().clone()),
            tampered_query,
        ];
        for request in &tampered {
            let err = verify(request, &envelope, &key).unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch, "{request:?}");
        }

        let mut shifted = envelope.clone();
        shifted.timestamp = (NOW + 1).to_string();
        let err = verify(&signed, &shifted, &key).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
    }

    #[test]
    fn test_should_leave_body_out_of_hmac_signature() {
        let key = hmac_key();
        let envelope = sign(&submit_request(ALG, NOW), &key).unwrap();
        let other_body = bare_submit().with_body(br#"{"prompt":"dog"}"#.to_vec());
        assert!(verify(&other_body, &envelope, &key).is_ok());
    }

    #[test]
    fn test_should_normalize_method_case() {
        let key = hmac_key();
        let lower = SigningRequest::new(ALG, "post", "/api/v1/workflows/submit").with_timestamp(NOW);
        let envelope = sign(&lower, &key).unwrap();
        assert!(verify(&bare_submit(), &envelope, &key).is_ok());

        let envelope = sign(&bare_submit(), &key).unwrap();
        assert!(verify(&lower, &envelope, &key).is_ok());
    }

    #[test]
    fn test_should_sign_identically_regardless_of_query_order() {
        let key = hmac_key();
        let forward: QueryParams = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        let backward: QueryParams = [("c", "3"), ("b", "2"), ("a", "1")].into_iter().collect();

        let first = sign(&bare_submit().with_query(forward), &key).unwrap();
        let second = sign(&bare_submit().with_query(backward), &key).unwrap();
        assert_eq!(first.signature, second.signature);
    }

    #[test]
    fn test_should_accept_fresh_request_through_authenticator() {
        let key = hmac_key();
        let auth = authenticator(ALG, &key);
        let envelope = sign(&submit_request(ALG, NOW), &key).unwrap();
        assert!(auth.authenticate_at(&submit_request(ALG, 0), &envelope, NOW + 30).is_ok());
    }
}

//! RSA-PSS-SHA256 signing and verification.

#[cfg(test)]
mod tests {
    use std::fs;

    use sigil_auth::canonical::build_canonical_string;
    use sigil_auth::keys::generate_keypair;
    use sigil_auth::{
        AuthError, AuthErrorKind, KeyMaterial, QueryParams, RequestAuthenticator,
        SignatureAlgorithm, SignatureConfig, SigningRequest, sign, verify,
    };

    use crate::{NOW, queue_status_request, rsa_keys, submit_request};

    const ALG: SignatureAlgorithm = SignatureAlgorithm::RsaPssSha256;

    #[test]
    fn test_should_verify_queue_status_scenario() {
        let keys = rsa_keys();
        let request = queue_status_request(ALG, NOW);
        let envelope = sign(&request, &keys.private).unwrap();

        assert_eq!(envelope.nonce.as_deref().map(str::len), Some(32));
        assert!(verify(&request, &envelope, &keys.public).is_ok());

        let err = verify(&request, &envelope, &keys.other_public).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
    }

    #[test]
    fn test_should_reject_every_single_field_tamper() {
        let keys = rsa_keys();
        let signed = submit_request(ALG, NOW).with_query(
            [("priority", "high")].into_iter().collect::<QueryParams>(),
        );
        let envelope = sign(&signed, &keys.private).unwrap();
        assert!(verify(&signed, &envelope, &keys.public).is_ok());

        let rebuild = |method: &str, path: &str, query: QueryParams, body: &[u8]| {
            SigningRequest::new(ALG, method, path.to_owned())
                .with_query(query)
                .with_body(body.to_vec())
        };
        let query = signed.query().clone();
        let body = signed.body().unwrap_or_default();
        let low: QueryParams = [("priority", "low")].into_iter().collect();

        let tampered = [
            rebuild("PATCH", "/api/v1/workflows/submit", query.clone(), body),
            rebuild("POST", "/api/v1/workflows/cancel", query.clone(), body),
            rebuild("POST", "/api/v1/workflows/submit", low, body),
            rebuild("POST", "/api/v1/workflows/submit", query, br#"{"prompt":"dog"}"#),
        ];
        for request in &tampered {
            let err = verify(request, &envelope, &keys.public).unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch, "{request:?}");
        }

        let mut new_timestamp = envelope.clone();
        new_timestamp.timestamp = (NOW - 1).to_string();
        let mut new_nonce = envelope.clone();
        new_nonce.nonce = Some("0".repeat(32));

        for envelope in [new_timestamp, new_nonce] {
            let err = verify(&signed, &envelope, &keys.public).unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
        }
    }

    #[test]
    fn test_should_produce_distinct_but_verifiable_signatures() {
        let keys = rsa_keys();
        let forward: QueryParams = [("a", "1"), ("b", "2")].into_iter().collect();
        let backward: QueryParams = [("b", "2"), ("a", "1")].into_iter().collect();
        let first = queue_status_request(ALG, NOW).with_query(forward).with_nonce("n-1");
        let second = queue_status_request(ALG, NOW).with_query(backward).with_nonce("n-1");

        assert_eq!(
            build_canonical_string(ALG, &first, NOW, Some("n-1")),
            build_canonical_string(ALG, &second, NOW, Some("n-1"))
        );

        let first_env = sign(&first, &keys.private).unwrap();
        let second_env = sign(&second, &keys.private).unwrap();
        assert_ne!(first_env.signature, second_env.signature);
        assert!(verify(&second, &first_env, &keys.public).is_ok());
        assert!(verify(&first, &second_env, &keys.public).is_ok());
    }

    #[test]
    fn test_should_normalize_method_case() {
        let keys = rsa_keys();
        let lower = SigningRequest::new(ALG, "get", "/api/v1/queue/status").with_timestamp(NOW);
        let upper = SigningRequest::new(ALG, "GET", "/api/v1/queue/status").with_timestamp(NOW);
        let envelope = sign(&lower, &keys.private).unwrap();
        assert!(verify(&upper, &envelope, &keys.public).is_ok());
    }

    #[test]
    fn test_should_treat_missing_and_empty_body_alike() {
        let keys = rsa_keys();
        let no_body = queue_status_request(ALG, NOW);
        let empty_body = queue_status_request(ALG, NOW).with_body(Vec::new());
        let envelope = sign(&no_body, &keys.private).unwrap();
        assert!(verify(&empty_body, &envelope, &keys.public).is_ok());
    }

    #[test]
    fn test_should_refuse_to_sign_with_public_key_only() {
        let keys = rsa_keys();
        let err = sign(&queue_status_request(ALG, NOW), &keys.public).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn test_should_load_keys_from_files_in_config() {
        let keys = rsa_keys();
        let dir = tempfile::tempdir().unwrap();
        let private_path = dir.path().join("private.pem");
        let public_path = dir.path().join("public.pem");
        fs::write(&private_path, &keys.private_pem).unwrap();
        fs::write(&public_path, &keys.public_pem).unwrap();

        let client = KeyMaterial::from_config(&SignatureConfig {
            algorithm: ALG,
            private_key_file: Some(private_path),
            ..SignatureConfig::default()
        })
        .unwrap();
        let gateway = RequestAuthenticator::from_config(&SignatureConfig {
            algorithm: ALG,
            public_key_file: Some(public_path),
            ..SignatureConfig::default()
        })
        .unwrap();

        let request = queue_status_request(ALG, NOW);
        let envelope = sign(&request, &client).unwrap();
        assert!(gateway.authenticate_at(&request, &envelope, NOW).is_ok());
    }

    #[test]
    fn test_should_reject_undersized_key_generation() {
        let err = generate_keypair(1024).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::Configuration);
    }
}

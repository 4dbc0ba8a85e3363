//! Replay window enforcement, independent of the signature check.

#[cfg(test)]
mod tests {
    use sigil_auth::replay::is_fresh_at;
    use sigil_auth::{
        AuthError, AuthErrorKind, ReplayGuard, RequestAuthenticator, SignatureAlgorithm,
        SignatureConfig, sign,
    };

    use crate::{NOW, SECRET, TOLERANCE_SECS, authenticator, hmac_key, rsa_keys, submit_request};

    const ALG: SignatureAlgorithm = SignatureAlgorithm::HmacSha256;

    #[test]
    fn test_should_accept_exactly_at_window_edges() {
        let tol = i64::try_from(TOLERANCE_SECS).unwrap();
        assert!(is_fresh_at(NOW - tol, TOLERANCE_SECS, NOW));
        assert!(is_fresh_at(NOW + tol, TOLERANCE_SECS, NOW));
        assert!(!is_fresh_at(NOW - tol - 1, TOLERANCE_SECS, NOW));
        assert!(!is_fresh_at(NOW + tol + 1, TOLERANCE_SECS, NOW));
    }

    #[test]
    fn test_should_reject_valid_signature_outside_window() {
        let key = hmac_key();
        let auth = authenticator(ALG, &key);
        let envelope = sign(&submit_request(ALG, NOW - 301), &key).unwrap();
        let request = submit_request(ALG, NOW);

        // The signature itself is fine; only the window rejects it.
        assert!(sigil_auth::verify(&request, &envelope, &key).is_ok());
        let err = auth.authenticate_at(&request, &envelope, NOW).unwrap_err();
        assert!(matches!(
            err,
            AuthError::ReplayWindowExceeded { tolerance_secs: 300 }
        ));
    }

    #[test]
    fn test_should_reject_fresh_timestamp_with_bad_signature() {
        let key = hmac_key();
        let auth = authenticator(ALG, &key);
        let mut envelope = sign(&submit_request(ALG, NOW), &key).unwrap();
        envelope.signature = envelope.signature.replace(|c: char| c.is_ascii_digit(), "f");

        let err = auth
            .authenticate_at(&submit_request(ALG, NOW), &envelope, NOW)
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
    }

    #[test]
    fn test_should_keep_exact_match_for_zero_tolerance_freshness() {
        assert!(is_fresh_at(NOW, 0, NOW));
        assert!(!is_fresh_at(NOW, 0, NOW + 1));
    }

    #[test]
    fn test_should_turn_off_window_when_configured_tolerance_is_zero() {
        let config = SignatureConfig::from_lookup(|key| match key {
            "SIGNATURE_SECRET" => Some(SECRET.to_owned()),
            "SIGNATURE_TIMESTAMP_TOLERANCE" => Some("0".to_owned()),
            _ => None,
        })
        .unwrap();
        let auth = RequestAuthenticator::from_config(&config).unwrap();
        let key = hmac_key();
        let envelope = sign(&submit_request(ALG, NOW), &key).unwrap();
        let request = submit_request(ALG, NOW);

        assert!(auth.authenticate_at(&request, &envelope, NOW + 1).is_ok());
        assert!(auth.authenticate_at(&request, &envelope, NOW - 3_600).is_ok());

        let guarded = RequestAuthenticator::new(ALG, key, ReplayGuard::new(1)).unwrap();
        let err = guarded.authenticate_at(&request, &envelope, NOW + 2).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::ReplayWindowExceeded);
    }

    #[test]
    fn test_should_accept_verbatim_replay_within_window() {
        // No seen-nonce set is kept: the same triple passes twice.
        let keys = rsa_keys();
        let alg = SignatureAlgorithm::RsaPssSha256;
        let auth = authenticator(alg, &keys.public);
        let request = submit_request(alg, NOW);
        let envelope = sign(&request, &keys.private).unwrap();

        assert!(auth.authenticate_at(&request, &envelope, NOW).is_ok());
        assert!(auth.authenticate_at(&request, &envelope, NOW + 10).is_ok());
    }
}

//! Key material loading and provisioning.
//!
//! [`KeyMaterial`] is process-wide configuration: it is loaded once at startup,
//! shared read-only (typically behind an `Arc`) and never mutated. A failure to
//! load it is a fatal [`AuthError::Configuration`], not a per-request error.
//!
//! Asymmetric keys are PEM-encoded: PKCS#8 (`PRIVATE KEY`) for the private half
//! and SubjectPublicKeyInfo (`PUBLIC KEY`) for the public half. The algorithm
//! identifier inside the PEM is checked before the key is decoded, so an
//! elliptic-curve or Ed25519 key presented where RSA is expected fails closed
//! with a message naming the key kind.

use std::fmt;
use std::fs;
use std::path::Path;

use rsa::pkcs8::{
    Document, EncodePrivateKey, EncodePublicKey, LineEnding, ObjectIdentifier, PrivateKeyInfo,
    SecretDocument, SubjectPublicKeyInfoRef,
};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey, pss};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::algorithm::SignatureAlgorithm;
use crate::config::SignatureConfig;
use crate::error::{AuthError, AuthResult};
use crate::signer::{PssDigest, max_pss_salt_len};

/// Default modulus size for generated keypairs.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest RSA modulus accepted when loading or generating keys.
pub const MIN_KEY_BITS: usize = 2048;

const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const RSASSA_PSS_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");
const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const ED25519_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const ED448_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.113");

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// The key family found in a PEM document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// `rsaEncryption`.
    Rsa,
    /// `id-RSASSA-PSS` restricted keys, which this engine does not load.
    RsaPssRestricted,
    /// `id-ecPublicKey`.
    EllipticCurve,
    /// Ed25519 or Ed448.
    EdwardsCurve,
    /// Any other algorithm identifier.
    Other(String),
}

impl KeyKind {
    fn from_oid(oid: ObjectIdentifier) -> Self {
        if oid == RSA_ENCRYPTION_OID {
            Self::Rsa
        } else if oid == RSASSA_PSS_OID {
            Self::RsaPssRestricted
        } else if oid == EC_PUBLIC_KEY_OID {
            Self::EllipticCurve
        } else if oid == ED25519_OID || oid == ED448_OID {
            Self::EdwardsCurve
        } else {
            Self::Other(oid.to_string())
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::RsaPssRestricted => f.write_str("RSASSA-PSS restricted RSA"),
            Self::EllipticCurve => f.write_str("elliptic-curve"),
            Self::EdwardsCurve => f.write_str("Edwards-curve"),
            Self::Other(oid) => write!(f, "unknown ({oid})"),
        }
    }
}

/// Shared HMAC secret. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    /// Raw secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// RSA keypair halves. Either half may be absent, but not both.
///
/// The PSS signing and verifying keys are built once here, with the maximal
/// salt length for the modulus, and reused for every request.
#[derive(Clone)]
pub struct AsymmetricKey {
    private: Option<RsaPrivateKey>,
    public: Option<RsaPublicKey>,
    signing_key: Option<pss::SigningKey<PssDigest>>,
    verifying_key: Option<pss::VerifyingKey<PssDigest>>,
}

impl AsymmetricKey {
    fn new(private: Option<RsaPrivateKey>, public: RsaPublicKey) -> Self {
        let salt_len = max_pss_salt_len(public.n().bits());
        let signing_key = private
            .clone()
            .map(|key| pss::SigningKey::<PssDigest>::new_with_salt_len(key, salt_len));
        let verifying_key = pss::VerifyingKey::<PssDigest>::new_with_salt_len(public.clone(), salt_len);
        Self {
            private,
            public: Some(public),
            signing_key,
            verifying_key: Some(verifying_key),
        }
    }

    /// The key family. Always [`KeyKind::Rsa`] once loaded.
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        KeyKind::Rsa
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn modulus_bits(&self) -> usize {
        self.public.as_ref().map_or(0, |key| key.n().bits())
    }

    /// The private half, if loaded.
    #[must_use]
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    /// The public half. Present whenever the private half is.
    #[must_use]
    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public.as_ref()
    }

    pub(crate) fn pss_signing_key(&self) -> Option<&pss::SigningKey<PssDigest>> {
        self.signing_key.as_ref()
    }

    pub(crate) fn pss_verifying_key(&self) -> Option<&pss::VerifyingKey<PssDigest>> {
        self.verifying_key.as_ref()
    }
}

impl fmt::Debug for AsymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricKey")
            .field("kind", &self.kind())
            .field("modulus_bits", &self.modulus_bits())
            .field("has_private", &self.private.is_some())
            .finish()
    }
}

/// Loaded, validated key material.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Shared secret for HMAC-SHA256.
    Symmetric(SymmetricKey),
    /// RSA keypair (or one half of it) for RSA-PSS.
    Asymmetric(AsymmetricKey),
}

impl KeyMaterial {
    /// Whether this key can be used with `algorithm`.
    #[must_use]
    pub fn supports(&self, algorithm: SignatureAlgorithm) -> bool {
        matches!(
            (self, algorithm),
            (Self::Symmetric(_), SignatureAlgorithm::HmacSha256)
                | (Self::Asymmetric(_), SignatureAlgorithm::RsaPssSha256)
        )
    }

    /// Load the key material required by `config.algorithm`.
    ///
    /// For HMAC this reads `secret`. For RSA-PSS it reads whichever PEM halves
    /// are configured, inline or from a file; at least one must be present.
    pub fn from_config(config: &SignatureConfig) -> AuthResult<Self> {
        match config.algorithm {
            SignatureAlgorithm::HmacSha256 => {
                let secret = config.secret.as_deref().ok_or_else(|| {
                    AuthError::config("shared secret is not configured (SIGNATURE_SECRET)")
                })?;
                load_symmetric(secret)
            }
            SignatureAlgorithm::RsaPssSha256 => {
                let private_pem = resolve_pem(
                    config.private_key_pem.as_deref(),
                    config.private_key_file.as_deref(),
                )?;
                let public_pem = resolve_pem(
                    config.public_key_pem.as_deref(),
                    config.public_key_file.as_deref(),
                )?;

                match (private_pem, public_pem) {
                    (Some(private), Some(public)) => load_asymmetric_pair(&private, &public),
                    (Some(private), None) => load_asymmetric_private(&private),
                    (None, Some(public)) => load_asymmetric_public(&public),
                    (None, None) => Err(AuthError::config(
                        "RSA key is not configured (SIGNATURE_PUBLIC_KEY or SIGNATURE_PRIVATE_KEY)",
                    )),
                }
            }
        }
    }
}

/// Load a shared HMAC secret.
///
/// # Examples
///
/// ```
/// use sigil_auth::keys::{KeyMaterial, load_symmetric};
///
/// let key = load_symmetric("s3cr3t").unwrap();
/// assert!(matches!(key, KeyMaterial::Symmetric(_)));
/// assert!(load_symmetric("").is_err());
/// ```
pub fn load_symmetric(secret: &str) -> AuthResult<KeyMaterial> {
    if secret.is_empty() {
        return Err(AuthError::config("shared secret must not be empty"));
    }
    Ok(KeyMaterial::Symmetric(SymmetricKey(secret.as_bytes().to_vec())))
}

/// Load a PKCS#8 PEM RSA private key. The public half is derived from it.
pub fn load_asymmetric_private(pem: &str) -> AuthResult<KeyMaterial> {
    let private = parse_private_key(pem)?;
    let public = private.to_public_key();
    debug!(modulus_bits = public.n().bits(), "Loaded RSA private key");
    Ok(KeyMaterial::Asymmetric(AsymmetricKey::new(Some(private), public)))
}

/// Load a SubjectPublicKeyInfo PEM RSA public key.
pub fn load_asymmetric_public(pem: &str) -> AuthResult<KeyMaterial> {
    let public = parse_public_key(pem)?;
    debug!(modulus_bits = public.n().bits(), "Loaded RSA public key");
    Ok(KeyMaterial::Asymmetric(AsymmetricKey::new(None, public)))
}

/// Load both halves of an RSA keypair and check that they belong together.
pub fn load_asymmetric_pair(private_pem: &str, public_pem: &str) -> AuthResult<KeyMaterial> {
    let private = parse_private_key(private_pem)?;
    let public = parse_public_key(public_pem)?;
    if private.to_public_key() != public {
        return Err(AuthError::config(
            "configured RSA public key does not match the private key",
        ));
    }
    Ok(KeyMaterial::Asymmetric(AsymmetricKey::new(Some(private), public)))
}

/// Generate a fresh RSA keypair for out-of-band provisioning.
///
/// Uses the operating system CSPRNG and public exponent 65537. Returns
/// `(private_pem, public_pem)` as PKCS#8 and SubjectPublicKeyInfo PEM strings.
/// Slow; never call this on the request path.
pub fn generate_keypair(bits: usize) -> AuthResult<(String, String)> {
    if bits < MIN_KEY_BITS {
        return Err(AuthError::config(format!(
            "RSA modulus of {bits} bits is below the minimum of {MIN_KEY_BITS}"
        )));
    }

    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| AuthError::config(format!("RSA key generation failed: {e}")))?;
    let public = private.to_public_key();

    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AuthError::config(format!("failed to encode private key: {e}")))?;
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AuthError::config(format!("failed to encode public key: {e}")))?;

    info!(bits, "Generated RSA keypair");
    Ok((private_pem.to_string(), public_pem))
}

fn parse_private_key(pem: &str) -> AuthResult<RsaPrivateKey> {
    let (label, document) = SecretDocument::from_pem(pem)
        .map_err(|e| AuthError::config(format!("invalid private key PEM: {e}")))?;
    if label != PRIVATE_KEY_LABEL {
        return Err(AuthError::config(format!(
            "expected a PKCS#8 \"{PRIVATE_KEY_LABEL}\" PEM block, found \"{label}\""
        )));
    }

    let info = PrivateKeyInfo::try_from(document.as_bytes())
        .map_err(|e| AuthError::config(format!("invalid PKCS#8 private key: {e}")))?;
    expect_rsa(KeyKind::from_oid(info.algorithm.oid))?;

    let key = RsaPrivateKey::try_from(info)
        .map_err(|e| AuthError::config(format!("invalid RSA private key: {e}")))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

fn parse_public_key(pem: &str) -> AuthResult<RsaPublicKey> {
    let (label, document) = Document::from_pem(pem)
        .map_err(|e| AuthError::config(format!("invalid public key PEM: {e}")))?;
    if label != PUBLIC_KEY_LABEL {
        return Err(AuthError::config(format!(
            "expected a SubjectPublicKeyInfo \"{PUBLIC_KEY_LABEL}\" PEM block, found \"{label}\""
        )));
    }

    let info = SubjectPublicKeyInfoRef::try_from(document.as_bytes())
        .map_err(|e| AuthError::config(format!("invalid SubjectPublicKeyInfo: {e}")))?;
    expect_rsa(KeyKind::from_oid(info.algorithm.oid))?;

    let key = RsaPublicKey::try_from(info)
        .map_err(|e| AuthError::config(format!("invalid RSA public key: {e}")))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

fn expect_rsa(kind: KeyKind) -> AuthResult<()> {
    if kind == KeyKind::Rsa {
        Ok(())
    } else {
        Err(AuthError::config(format!(
            "expected an RSA key, found {kind} key"
        )))
    }
}

fn check_modulus(bits: usize) -> AuthResult<()> {
    if bits < MIN_KEY_BITS {
        return Err(AuthError::config(format!(
            "RSA modulus of {bits} bits is below the minimum of {MIN_KEY_BITS}"
        )));
    }
    Ok(())
}

/// Pick the inline PEM, or read it from `file`.
fn resolve_pem(inline: Option<&str>, file: Option<&Path>) -> AuthResult<Option<String>> {
    if let Some(pem) = inline.filter(|pem| !pem.trim().is_empty()) {
        return Ok(Some(pem.to_owned()));
    }
    let Some(path) = file else {
        return Ok(None);
    };
    fs::read_to_string(path).map(Some).map_err(|e| {
        AuthError::config(format!("failed to read key file {}: {e}", path.display()))
    })
}

use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};

use crate::error::{Result, VerifyError};

/// Verify an ed25519 detached signature over `message`.
///
/// `public_key` is the raw 32-byte key, `signature` the raw 64-byte
/// detached signature, both typically shipped hex-encoded in the title
/// catalog and alongside the artifact respectively.
pub fn verify_detached_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<()> {
    let key_bytes: &[u8; PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| VerifyError::InvalidPublicKey(format!("{} bytes", public_key.len())))?;
    let key = VerifyingKey::from_bytes(key_bytes)
        .map_err(|e| VerifyError::InvalidPublicKey(e.to_string()))?;

    let signature = Signature::from_slice(signature)
        .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;

    key.verify(message, &signature)
        .map_err(|_| VerifyError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn valid_signature_verifies() {
        let key = keypair();
        let message = b"SHA256SUMS content";
        let sig = key.sign(message);
        verify_detached_signature(
            message,
            &sig.to_bytes(),
            key.verifying_key().as_bytes(),
        )
        .unwrap();
    }

    #[test]
    fn tampered_message_fails() {
        let key = keypair();
        let sig = key.sign(b"original");
        let err = verify_detached_signature(
            b"tampered",
            &sig.to_bytes(),
            key.verifying_key().as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::SignatureInvalid));
    }

    #[test]
    fn wrong_key_fails() {
        let key = keypair();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let sig = key.sign(b"message");
        let err = verify_detached_signature(
            b"message",
            &sig.to_bytes(),
            other.verifying_key().as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::SignatureInvalid));
    }

    #[test]
    fn malformed_key_rejected() {
        let err = verify_detached_signature(b"m", &[0u8; 64], &[1u8; 16]).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidPublicKey(_)));
    }
}

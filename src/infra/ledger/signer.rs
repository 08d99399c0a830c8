//! Custodial ed25519 signer for verification transactions.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::domain::strkey::{self, StrKeyKind};
use crate::domain::transaction::DecoratedSignature;
use crate::domain::transaction::xdr::{BytesM, Signature, SignatureHint};
use crate::domain::{
    AppError, LedgerError, PreparedTransaction, SignedTransaction, TransactionSigner,
};

/// Holds the single custodial keypair of the service.
pub struct CustodialSigner {
    signing_key: SigningKey,
    ephemeral: bool,
}

impl CustodialSigner {
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            ephemeral: false,
        }
    }

    /// Generate a throwaway keypair. It holds no funds and cannot custody any.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            ephemeral: true,
        }
    }

    /// Resolve the signer from a configured `S...` secret seed, falling back to
    /// an ephemeral keypair when none is configured.
    pub fn from_secret(secret: Option<&SecretString>) -> Result<Self, AppError> {
        match secret {
            Some(secret) => {
                let signer = Self::new(signing_key_from_strkey(secret)?);
                info!(public_key = %signer.public_key(), "Loaded custodial signing key");
                Ok(signer)
            }
            None => {
                let signer = Self::ephemeral();
                warn!(
                    public_key = %signer.public_key(),
                    "ADMIN_SECRET_KEY not set: using an EPHEMERAL keypair. \
                     It cannot custody real funds and verification transactions \
                     will fail until the account is funded. Do not run like this in production."
                );
                Ok(signer)
            }
        }
    }

    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

impl std::fmt::Debug for CustodialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodialSigner")
            .field("public_key", &self.public_key())
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for CustodialSigner {
    fn public_key(&self) -> String {
        strkey::encode(
            StrKeyKind::AccountId,
            self.signing_key.verifying_key().as_bytes(),
        )
    }

    fn sign(&self, tx: PreparedTransaction) -> Result<SignedTransaction, AppError> {
        let transaction = tx.into_transaction();
        let payload = transaction.signature_payload()?;
        let signature = self.signing_key.sign(&payload);

        let public_key = self.signing_key.verifying_key().to_bytes();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&public_key[28..]);

        let signature: BytesM<64> = signature
            .to_bytes()
            .to_vec()
            .try_into()
            .map_err(|e| LedgerError::Build(format!("signature encoding failed: {e}")))?;

        Ok(SignedTransaction {
            transaction,
            signatures: vec![DecoratedSignature {
                hint: SignatureHint(hint),
                signature: Signature(signature),
            }],
        })
    }
}

/// Parse a StrKey-encoded (`S...`) ed25519 secret seed into a SigningKey
pub fn signing_key_from_strkey(secret: &SecretString) -> Result<SigningKey, AppError> {
    let seed = strkey::decode(StrKeyKind::SecretSeed, secret.expose_secret().trim())
        // never echo the secret in the error
        .map_err(|_| LedgerError::InvalidKey("malformed secret seed".to_string()))?;
    Ok(SigningKey::from_bytes(&seed))
}

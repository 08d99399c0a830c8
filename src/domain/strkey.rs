//! StrKey handling for ledger addresses and keys.
//!
//! Account ids start with `G`, contract ids with `C` and secret seeds with
//! `S`. The encoding itself comes from `stellar-strkey`; this module pins the
//! kinds the service accepts and maps failures onto [`LedgerError`].

use stellar_strkey::{Contract, ed25519};

use super::error::LedgerError;

/// Length of the raw key payload carried by every supported StrKey kind.
pub const PAYLOAD_LEN: usize = 32;

/// The kinds of StrKey understood by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKeyKind {
    /// Ed25519 public key of an account (`G...`)
    AccountId,
    /// Soroban contract id (`C...`)
    Contract,
    /// Ed25519 secret seed (`S...`)
    SecretSeed,
}

impl StrKeyKind {
    fn label(self) -> &'static str {
        match self {
            Self::AccountId => "account id",
            Self::Contract => "contract id",
            Self::SecretSeed => "secret seed",
        }
    }

    fn invalid(self, message: String) -> LedgerError {
        match self {
            Self::SecretSeed => LedgerError::InvalidKey(message),
            Self::AccountId | Self::Contract => LedgerError::InvalidAddress(message),
        }
    }
}

/// Encode a 32-byte payload as a StrKey of the given kind.
#[must_use]
pub fn encode(kind: StrKeyKind, payload: &[u8; PAYLOAD_LEN]) -> String {
    match kind {
        StrKeyKind::AccountId => ed25519::PublicKey(*payload).to_string(),
        StrKeyKind::Contract => Contract(*payload).to_string(),
        StrKeyKind::SecretSeed => ed25519::PrivateKey(*payload).to_string(),
    }
}

/// Decode a StrKey of the expected kind into its 32-byte payload.
///
/// # Errors
/// `InvalidKey` for secret seeds and `InvalidAddress` otherwise, when the
/// string is not a well-formed StrKey of that kind.
pub fn decode(kind: StrKeyKind, encoded: &str) -> Result<[u8; PAYLOAD_LEN], LedgerError> {
    let decoded = match kind {
        StrKeyKind::AccountId => ed25519::PublicKey::from_string(encoded).map(|key| key.0),
        StrKeyKind::Contract => Contract::from_string(encoded).map(|contract| contract.0),
        StrKeyKind::SecretSeed => ed25519::PrivateKey::from_string(encoded).map(|key| key.0),
    };
    // the input may be a secret, so it is never echoed
    decoded.map_err(|_| kind.invalid(format!("malformed {}", kind.label())))
}

/// Returns true if `encoded` is a well-formed StrKey of the given kind.
#[must_use]
pub fn is_valid(kind: StrKeyKind, encoded: &str) -> bool {
    decode(kind, encoded).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ACCOUNT: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
    const ZERO_CONTRACT: &str = "CAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABSC4";
    const SEQUENTIAL_CONTRACT: &str = "CAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6N4O";
    const SEQUENTIAL_SEED: &str = "SAAQEAYEAUDAOCAJBIFQYDIOB4IBCEQTCQKRMFYYDENBWHA5DYPSBF5K";

    fn sequential(start: u8) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, b) in out.iter_mut().enumerate() {
            *b = start + i as u8;
        }
        out
    }

    #[test]
    fn test_encode_known_vectors() {
        assert_eq!(encode(StrKeyKind::AccountId, &[0u8; 32]), ZERO_ACCOUNT);
        assert_eq!(encode(StrKeyKind::Contract, &[0u8; 32]), ZERO_CONTRACT);
        assert_eq!(
            encode(StrKeyKind::Contract, &sequential(0)),
            SEQUENTIAL_CONTRACT
        );
        assert_eq!(
            encode(StrKeyKind::SecretSeed, &sequential(1)),
            SEQUENTIAL_SEED
        );
    }

    #[test]
    fn test_decode_known_vectors() {
        assert_eq!(decode(StrKeyKind::AccountId, ZERO_ACCOUNT).unwrap(), [0u8; 32]);
        assert_eq!(
            decode(StrKeyKind::Contract, SEQUENTIAL_CONTRACT).unwrap(),
            sequential(0)
        );
        assert_eq!(
            decode(StrKeyKind::SecretSeed, SEQUENTIAL_SEED).unwrap(),
            sequential(1)
        );
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let result = decode(StrKeyKind::Contract, ZERO_ACCOUNT);
        assert!(matches!(result, Err(LedgerError::InvalidAddress(_))));

        let result = decode(StrKeyKind::SecretSeed, ZERO_CONTRACT);
        assert!(matches!(result, Err(LedgerError::InvalidKey(_))));
    }

    #[test]
    fn test_decode_error_does_not_echo_input() {
        let Err(LedgerError::InvalidKey(message)) = decode(StrKeyKind::SecretSeed, "SECRETISH")
        else {
            panic!("expected InvalidKey");
        };
        assert!(!message.contains("SECRETISH"));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut tampered = ZERO_ACCOUNT.to_string();
        tampered.replace_range(54..55, "G");
        assert!(!is_valid(StrKeyKind::AccountId, &tampered));
    }

    #[test]
    fn test_decode_rejects_bad_length_and_alphabet() {
        assert!(!is_valid(StrKeyKind::AccountId, ""));
        assert!(!is_valid(StrKeyKind::AccountId, "GAAAA"));
        let lowercase = ZERO_ACCOUNT.to_lowercase();
        assert!(!is_valid(StrKeyKind::AccountId, &lowercase));
        let with_digit_one = ZERO_ACCOUNT.replacen('A', "1", 1);
        assert!(!is_valid(StrKeyKind::AccountId, &with_digit_one));
    }
}

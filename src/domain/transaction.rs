//! Ledger transaction model and builder for contract invocations.
//!
//! A [`Transaction`] binds its XDR body to the network id
//! (`sha256(passphrase)`), so the hash that gets signed differs per network and
//! a signature cannot be replayed elsewhere. Transactions move through three
//! owned stages: built ([`Transaction`]), simulated ([`PreparedTransaction`])
//! and signed ([`SignedTransaction`]). Each stage consumes the previous one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, Hash, HostFunction, Int128Parts, InvokeContractArgs, InvokeHostFunctionOp, Limits,
    Memo, MuxedAccount, Operation, OperationBody, Preconditions, PublicKey, ReadXdr, ScAddress,
    ScString, ScSymbol, ScVal, SequenceNumber, SorobanAuthorizationEntry,
    SorobanTransactionData, TimeBounds, TimePoint, TransactionEnvelope, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, Uint256, VecM, WriteXdr,
};

pub use stellar_xdr::curr as xdr;
pub use stellar_xdr::curr::DecoratedSignature;

use super::error::LedgerError;
use super::strkey::{self, StrKeyKind};
use super::types::{LedgerAccount, VerificationRequest};

/// Base fee in stroops; high enough to leave room for contract resource fees
pub const DEFAULT_BASE_FEE: u32 = 100_000;

/// Validity window of a freshly built transaction
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point of the payment verification contract
pub const VERIFY_PAYMENT_FN: &str = "verify_payment";

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Hash of a network passphrase
pub type NetworkId = [u8; 32];

#[must_use]
pub fn network_id(passphrase: &str) -> NetworkId {
    Sha256::digest(passphrase.as_bytes()).into()
}

fn encoding_error(err: xdr::Error) -> LedgerError {
    LedgerError::Build(format!("xdr encoding failed: {err}"))
}

/// Parse a `G...` account id or `C...` contract id into a contract address.
pub fn sc_address(address: &str) -> Result<ScAddress, LedgerError> {
    match address.chars().next() {
        Some('G') => {
            let key = strkey::decode(StrKeyKind::AccountId, address)?;
            Ok(ScAddress::Account(AccountId(
                PublicKey::PublicKeyTypeEd25519(Uint256(key)),
            )))
        }
        Some('C') => Ok(ScAddress::Contract(Hash(strkey::decode(
            StrKeyKind::Contract,
            address,
        )?))),
        _ => Err(LedgerError::InvalidAddress(format!(
            "not an account or contract address: {address:?}"
        ))),
    }
}

fn sc_string(value: &str) -> Result<ScVal, LedgerError> {
    let value = value.try_into().map_err(encoding_error)?;
    Ok(ScVal::String(ScString(value)))
}

fn sc_i128(value: i128) -> ScVal {
    ScVal::I128(Int128Parts {
        hi: (value >> 64) as i64,
        lo: value as u64,
    })
}

/// Resource data returned by simulation, still in wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorobanData {
    /// Base64 `SorobanTransactionData` (footprint and resources)
    pub transaction_data: String,
    /// Minimum resource fee in stroops
    pub resource_fee: u32,
    /// Base64 `SorobanAuthorizationEntry` values the invocation needs
    pub auth: Vec<String>,
}

/// Unsigned transaction bound to a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub network_id: NetworkId,
    pub body: xdr::Transaction,
}

impl Transaction {
    /// Total fee in stroops
    #[must_use]
    pub fn fee(&self) -> u32 {
        self.body.fee
    }

    #[must_use]
    pub fn sequence(&self) -> i64 {
        self.body.seq_num.0
    }

    /// Source account as a `G...` strkey
    #[must_use]
    pub fn source_account(&self) -> String {
        match &self.body.source_account {
            MuxedAccount::Ed25519(Uint256(key)) => strkey::encode(StrKeyKind::AccountId, key),
            MuxedAccount::MuxedEd25519(muxed) => {
                strkey::encode(StrKeyKind::AccountId, &muxed.ed25519.0)
            }
        }
    }

    /// Upper end of the validity window in unix seconds, if bounded
    #[must_use]
    pub fn max_time(&self) -> Option<u64> {
        match &self.body.cond {
            Preconditions::Time(bounds) => Some(bounds.max_time.0),
            _ => None,
        }
    }

    #[must_use]
    pub fn soroban_data(&self) -> Option<&SorobanTransactionData> {
        match &self.body.ext {
            TransactionExt::V1(data) => Some(data),
            TransactionExt::V0 => None,
        }
    }

    /// XDR `TransactionSignaturePayload`: network id, envelope type and body.
    pub fn signature_payload_xdr(&self) -> Result<Vec<u8>, LedgerError> {
        TransactionSignaturePayload {
            network_id: Hash(self.network_id),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(
                self.body.clone(),
            ),
        }
        .to_xdr(Limits::none())
        .map_err(encoding_error)
    }

    /// `sha256` of the signature payload, the bytes that get signed.
    pub fn signature_payload(&self) -> Result<[u8; 32], LedgerError> {
        Ok(Sha256::digest(self.signature_payload_xdr()?).into())
    }

    /// Hex transaction hash as reported by the network.
    pub fn hash(&self) -> Result<String, LedgerError> {
        Ok(hex::encode(self.signature_payload()?))
    }

    /// Base64 envelope without signatures, as sent for simulation.
    pub fn to_envelope_base64(&self) -> Result<String, LedgerError> {
        encode_envelope(&self.body, Vec::new())
    }
}

/// Simulation-resolved transaction. Owned by exactly one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    transaction: Transaction,
}

impl PreparedTransaction {
    /// Attach the simulated resources and authorizations, and add the resource
    /// fee on top of the base fee.
    ///
    /// # Errors
    /// `Simulation` when the simulation output is not valid XDR.
    pub fn from_simulation(
        mut transaction: Transaction,
        data: SorobanData,
    ) -> Result<Self, LedgerError> {
        let resources =
            SorobanTransactionData::from_xdr_base64(data.transaction_data.as_str(), Limits::none())
                .map_err(|e| {
                    LedgerError::Simulation(format!("invalid transaction data: {e}"))
                })?;

        if !data.auth.is_empty() {
            let entries = data
                .auth
                .iter()
                .map(|entry| {
                    SorobanAuthorizationEntry::from_xdr_base64(entry.as_str(), Limits::none())
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| LedgerError::Simulation(format!("invalid auth entry: {e}")))?;
            let auth: VecM<SorobanAuthorizationEntry> = entries
                .try_into()
                .map_err(|e| LedgerError::Simulation(format!("too many auth entries: {e}")))?;

            let mut operations = transaction.body.operations.to_vec();
            for operation in &mut operations {
                if let OperationBody::InvokeHostFunction(invoke) = &mut operation.body {
                    if invoke.auth.is_empty() {
                        invoke.auth = auth.clone();
                    }
                }
            }
            transaction.body.operations = operations.try_into().map_err(encoding_error)?;
        }

        transaction.body.fee = transaction.body.fee.saturating_add(data.resource_fee);
        transaction.body.ext = TransactionExt::V1(resources);
        Ok(Self { transaction })
    }

    #[must_use]
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    #[must_use]
    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl SignedTransaction {
    pub fn hash(&self) -> Result<String, LedgerError> {
        self.transaction.hash()
    }

    pub fn to_envelope_base64(&self) -> Result<String, LedgerError> {
        encode_envelope(&self.transaction.body, self.signatures.clone())
    }
}

fn encode_envelope(
    body: &xdr::Transaction,
    signatures: Vec<DecoratedSignature>,
) -> Result<String, LedgerError> {
    TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: body.clone(),
        signatures: signatures.try_into().map_err(encoding_error)?,
    })
    .to_xdr_base64(Limits::none())
    .map_err(encoding_error)
}

/// Builds an unsigned transaction against a source account.
pub struct TransactionBuilder<'a> {
    account: &'a LedgerAccount,
    network_passphrase: &'a str,
    base_fee: u32,
    timeout: Duration,
    operations: Vec<Operation>,
}

impl<'a> TransactionBuilder<'a> {
    #[must_use]
    pub fn new(account: &'a LedgerAccount, network_passphrase: &'a str) -> Self {
        Self {
            account,
            network_passphrase,
            base_fee: DEFAULT_BASE_FEE,
            timeout: DEFAULT_TX_TIMEOUT,
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn base_fee(mut self, fee: u32) -> Self {
        self.base_fee = fee;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn build(self) -> Result<Transaction, LedgerError> {
        self.build_at(Utc::now())
    }

    /// Build with the validity window starting at `now`.
    pub fn build_at(self, now: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        if self.network_passphrase.is_empty() {
            return Err(LedgerError::Build("network passphrase is empty".to_string()));
        }
        if self.operations.is_empty() {
            return Err(LedgerError::Build("transaction has no operations".to_string()));
        }
        let source = strkey::decode(StrKeyKind::AccountId, &self.account.account_id)?;

        let sequence = self
            .account
            .sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::Build("sequence number overflow".to_string()))?;
        let fee = u32::try_from(self.operations.len())
            .ok()
            .and_then(|count| self.base_fee.checked_mul(count))
            .ok_or_else(|| LedgerError::Build("fee overflow".to_string()))?;
        let max_time = u64::try_from(now.timestamp())
            .map_err(|_| LedgerError::Build("clock before unix epoch".to_string()))?
            + self.timeout.as_secs();

        Ok(Transaction {
            network_id: network_id(self.network_passphrase),
            body: xdr::Transaction {
                source_account: MuxedAccount::Ed25519(Uint256(source)),
                fee,
                seq_num: SequenceNumber(sequence),
                cond: Preconditions::Time(TimeBounds {
                    min_time: TimePoint(0),
                    max_time: TimePoint(max_time),
                }),
                memo: Memo::None,
                operations: self.operations.try_into().map_err(encoding_error)?,
                ext: TransactionExt::V0,
            },
        })
    }
}

/// Assemble the `verify_payment(payment_id, tx_hash, payer, amount)` call.
pub fn verify_payment_call(
    contract_id: &str,
    request: &VerificationRequest,
    stroops: i128,
) -> Result<Operation, LedgerError> {
    let contract = ScAddress::Contract(Hash(strkey::decode(StrKeyKind::Contract, contract_id)?));
    let payer = sc_address(&request.payer_address)?;

    let args: VecM<ScVal> = vec![
        sc_string(&request.payment_id)?,
        sc_string(&request.transaction_hash)?,
        ScVal::Address(payer),
        sc_i128(stroops),
    ]
    .try_into()
    .map_err(encoding_error)?;

    Ok(Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::InvokeContract(InvokeContractArgs {
                contract_address: contract,
                function_name: ScSymbol(VERIFY_PAYMENT_FN.try_into().map_err(encoding_error)?),
                args,
            }),
            auth: VecM::default(),
        }),
    })
}

/// The contract call carried by an operation, if it is one.
#[must_use]
pub fn contract_call(operation: &Operation) -> Option<&InvokeContractArgs> {
    match &operation.body {
        OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::InvokeContract(call),
            ..
        }) => Some(call),
        _ => None,
    }
}

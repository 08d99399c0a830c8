//! Test doubles shared by unit and integration tests.

pub mod mocks;

pub use mocks::{
    MOCK_RESOURCE_FEE, MOCK_TRANSACTION_DATA, MockLedgerClient, MockPaymentStore, RecordingReporter, SubmitScript,
    VirtualTicker,
};

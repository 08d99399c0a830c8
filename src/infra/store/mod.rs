//! In-memory payment store.
//!
//! A thread-safe `DashMap` keyed by payment id. Suitable for a single
//! process; listing is a full scan followed by filter, sort and paging.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    AppError, CreatePaymentRequest, PageMeta, Payment, PaymentFilter, PaymentPage, PaymentStatus,
    PaymentStore, StoreError, TimelineEvent,
};

#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: DashMap<String, Payment>,
}

impl InMemoryPaymentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Insert a fully-formed payment, replacing any with the same id.
    pub fn insert(&self, payment: Payment) {
        self.payments.insert(payment.id.clone(), payment);
    }

    fn matching(&self, filter: &PaymentFilter) -> Vec<Payment> {
        let mut items: Vec<Payment> = self
            .payments
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| filter.compare(a, b).then_with(|| a.id.cmp(&b.id)));
        items
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, AppError> {
        let payment = Payment::new(Uuid::now_v7().to_string(), request);
        if self.payments.contains_key(&payment.id) {
            return Err(AppError::Store(StoreError::Duplicate(payment.id)));
        }
        self.payments.insert(payment.id.clone(), payment.clone());
        info!(id = %payment.id, merchant_id = %payment.merchant_id, "Payment created");
        Ok(payment)
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError> {
        Ok(self.payments.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: u32,
        limit: u32,
    ) -> Result<PaymentPage, AppError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let items = self.matching(filter);
        let total = items.len() as u64;
        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let data = items.into_iter().skip(skip).take(limit as usize).collect();

        Ok(PaymentPage {
            data,
            meta: PageMeta { total, page, limit },
        })
    }

    async fn export_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        Ok(self.matching(filter))
    }

    async fn record_verification(
        &self,
        id: &str,
        status: PaymentStatus,
        transaction_hash: Option<&str>,
        payer_address: Option<&str>,
        event: TimelineEvent,
    ) -> Result<Payment, AppError> {
        let mut entry = self
            .payments
            .get_mut(id)
            .ok_or_else(|| AppError::Store(StoreError::NotFound(id.to_string())))?;

        let payment = entry.value_mut();
        if !payment.status.accepts_confirmation() {
            return Err(AppError::Store(StoreError::InvalidState(format!(
                "Payment {id} is already {}",
                payment.status
            ))));
        }
        payment.status = status;
        if let Some(hash) = transaction_hash {
            payment.transaction_hash = Some(hash.to_string());
        }
        if let Some(payer) = payer_address {
            payment.payer_address = Some(payer.to_string());
        }
        payment.timeline.push(event);
        payment.updated_at = Utc::now();

        debug!(id = %id, status = %status, "Payment status recorded");
        Ok(payment.clone())
    }
}

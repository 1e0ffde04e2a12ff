mod billing_tags;

use std::sync::Arc;

pub use billing_tags::{BillingTagReport, BillingTagService};

use crate::db::DbPool;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub billing_tags: BillingTagService,
}

impl Services {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            billing_tags: BillingTagService::new(db),
        }
    }
}

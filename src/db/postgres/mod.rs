mod billing_tags;

pub use billing_tags::PostgresBillingTagRepo;

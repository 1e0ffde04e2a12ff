mod billing_tag;

pub use billing_tag::*;

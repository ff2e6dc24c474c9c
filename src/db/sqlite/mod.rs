mod billing;
mod resources;

pub use billing::SqliteBillingRepo;
pub use resources::SqliteResourceRepo;

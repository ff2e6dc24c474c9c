mod billing;
mod resources;

pub use billing::BillingRepo;
pub use resources::ResourceRepo;

pub mod audit_logs;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod push_subscriptions;

pub use audit_logs::Entity as AuditLogs;
pub use coupons::Entity as Coupons;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use push_subscriptions::Entity as PushSubscriptions;

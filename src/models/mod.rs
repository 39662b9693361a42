pub mod agreement;
pub mod customer;
pub mod phone;
pub mod phone_assignment;
pub mod phone_history;
pub mod sales_target;
pub mod sales_transaction;
pub mod seller_performance;
pub mod user;

pub use agreement::Entity as Agreement;
pub use customer::Entity as Customer;
pub use phone::Entity as Phone;
pub use phone_assignment::Entity as PhoneAssignment;
pub use phone_history::Entity as PhoneHistory;
pub use sales_target::Entity as SalesTarget;
pub use sales_transaction::Entity as SalesTransaction;
pub use seller_performance::Entity as SellerPerformance;
pub use user::Entity as User;

//! Account Service - registration, login, seller approval and suspension

use chrono::Datelike;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::{PhoneStatus, Role, TransactionStatus};
use crate::infrastructure::auth::{create_jwt, hash_password, role_claim, verify_password};
use crate::models::agreement::Entity as Agreement;
use crate::models::phone::{self, Entity as Phone};
use crate::models::sales_transaction::{self, Entity as SalesTransaction};
use crate::models::user::{self, Entity as User};
use crate::modules::media::{self, MediaStore};
use crate::services::agreement_service::{self, AgreementSummary};
use crate::services::sales_service::{self, SellerTotals, TransactionSummary};
use crate::services::{day_start, now, require_manager, require_superuser, required, today, ServiceError};

pub const PENDING_APPROVAL_REASON: &str = "New account pending manager approval";
pub const DEFAULT_REJECT_REASON: &str = "Account rejected by manager";
pub const DEFAULT_SUSPEND_REASON: &str = "Suspended by manager";

pub const HOLD_ROUTE: &str = "/api/hold";
pub const HOME_ROUTE: &str = "/api/home";
pub const LOGIN_ROUTE: &str = "/api/auth/login";
pub const ADMIN_ROUTE: &str = "/api/admin";
pub const MANAGER_DASHBOARD_ROUTE: &str = "/api/manager/dashboard";
pub const INVENTORY_ROUTE: &str = "/api/phones";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateManagerInput {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub national_id: String,
    /// New signature capture as a data URL; the stored one is kept when absent
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerStatusFilter {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub redirect: &'static str,
    pub user: user::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldInfo {
    pub username: String,
    pub suspended_at: Option<String>,
    pub suspended_reason: String,
    pub pending_approval: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerStats {
    pub total_sellers: u64,
    pub active_sellers: u64,
    pub suspended_sellers: u64,
    pub pending_approval: u64,
    pub total_phones: u64,
    pub available_phones: u64,
    pub sold_phones: u64,
    pub assigned_phones: u64,
    pub total_agreements: u64,
    pub total_transactions: u64,
    pub monthly_revenue: Decimal,
    pub monthly_profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerDashboard {
    pub stats: ManagerStats,
    pub pending_sellers: Vec<user::Model>,
    pub recent_agreements: Vec<AgreementSummary>,
    pub recent_transactions: Vec<TransactionSummary>,
    pub top_sellers: Vec<SellerTotals>,
}

/// `+250` followed by nine digits.
pub fn is_valid_phone_number(phone_number: &str) -> bool {
    phone_number.len() == 13
        && phone_number
            .strip_prefix("+250")
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}

/// Where a freshly logged-in user should go.
pub fn landing_route(user: &user::Model) -> &'static str {
    if user.is_held() {
        HOLD_ROUTE
    } else {
        home_route(user)
    }
}

/// Role-based entry point for active accounts.
pub fn home_route(user: &user::Model) -> &'static str {
    if user.is_superuser {
        ADMIN_ROUTE
    } else if user.is_manager() {
        MANAGER_DASHBOARD_ROUTE
    } else {
        INVENTORY_ROUTE
    }
}

async fn username_taken<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<bool, ServiceError> {
    Ok(User::find()
        .filter(user::Column::Username.eq(username))
        .count(db)
        .await?
        > 0)
}

async fn email_taken<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except: Option<i32>,
) -> Result<bool, ServiceError> {
    if email.is_empty() {
        return Ok(false);
    }
    let mut query = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

fn new_account(
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    first_name: String,
    last_name: String,
    phone_number: String,
) -> user::ActiveModel {
    let now = now();
    user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(Some(role.as_str().to_string())),
        is_superuser: Set(false),
        first_name: Set(first_name),
        last_name: Set(last_name),
        phone_number: Set(phone_number),
        address: Set(String::new()),
        national_id: Set(String::new()),
        signature: Set(None),
        is_suspended: Set(false),
        suspended_at: Set(None),
        suspended_reason: Set(String::new()),
        suspended_by: Set(None),
        date_joined: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Seller self-registration. The account starts suspended until a manager
/// approves it.
pub async fn register(
    db: &DatabaseConnection,
    input: RegisterInput,
) -> Result<user::Model, ServiceError> {
    let username = required(&input.username, "Username is required.")?;
    let email = input.email.trim().to_string();
    let phone_number = input.phone_number.trim().to_string();

    // 1. Validate in the order the registration form reports problems
    if input.password1 != input.password2 {
        return Err(ServiceError::Validation("Passwords do not match.".to_string()));
    }
    if input.password1.is_empty() {
        return Err(ServiceError::Validation("Password is required.".to_string()));
    }
    if username_taken(db, &username).await? {
        return Err(ServiceError::Validation("Username already exists.".to_string()));
    }
    if email_taken(db, &email, None).await? {
        return Err(ServiceError::Validation("Email already exists.".to_string()));
    }
    if !is_valid_phone_number(&phone_number) {
        return Err(ServiceError::Validation(
            "Phone number must be in format +250XXXXXXXXX".to_string(),
        ));
    }

    // 2. Create the seller, already on hold
    let password_hash = hash_password(&input.password1).map_err(ServiceError::Database)?;
    let mut account = new_account(
        username,
        email,
        password_hash,
        Role::Seller,
        input.first_name.trim().to_string(),
        input.last_name.trim().to_string(),
        phone_number,
    );
    account.is_suspended = Set(true);
    account.suspended_at = Set(Some(now()));
    account.suspended_reason = Set(PENDING_APPROVAL_REASON.to_string());

    let user = account.insert(db).await?;
    tracing::info!("Registered seller {} (pending approval)", user.username);
    Ok(user)
}

pub async fn login(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, ServiceError> {
    let invalid = || ServiceError::Unauthorized("Invalid username or password.".to_string());

    let user = match User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    {
        Some(u) => u,
        None => {
            tracing::warn!("Login attempt for unknown user: {}", username);
            return Err(invalid());
        }
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {}
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.username);
            return Err(invalid());
        }
    }

    let token =
        create_jwt(user.id, &user.username, &role_claim(&user)).map_err(ServiceError::Database)?;
    let redirect = landing_route(&user);
    tracing::info!("User {} logged in, landing on {}", user.username, redirect);

    Ok(LoginOutcome {
        token,
        redirect,
        user,
    })
}

/// Suspension details, or `None` when the account is not on hold.
pub fn hold_info(user: &user::Model) -> Option<HoldInfo> {
    if !user.is_suspended {
        return None;
    }
    Some(HoldInfo {
        username: user.username.clone(),
        suspended_at: user.suspended_at.clone(),
        suspended_reason: user.suspended_reason.clone(),
        pending_approval: user.is_pending_approval(),
    })
}

pub async fn suspend(
    db: &DatabaseConnection,
    target: user::Model,
    reason: &str,
    suspended_by: Option<i32>,
) -> Result<user::Model, ServiceError> {
    let now = now();
    let mut account: user::ActiveModel = target.into();
    account.is_suspended = Set(true);
    account.suspended_at = Set(Some(now.clone()));
    account.suspended_reason = Set(reason.to_string());
    account.suspended_by = Set(suspended_by);
    account.updated_at = Set(now);
    let user = account.update(db).await?;
    tracing::info!("Suspended {}: {}", user.username, reason);
    Ok(user)
}

pub async fn activate(
    db: &DatabaseConnection,
    target: user::Model,
) -> Result<user::Model, ServiceError> {
    let mut account: user::ActiveModel = target.into();
    account.is_suspended = Set(false);
    account.suspended_at = Set(None);
    account.suspended_reason = Set(String::new());
    account.suspended_by = Set(None);
    account.updated_at = Set(now());
    let user = account.update(db).await?;
    tracing::info!("Activated {}", user.username);
    Ok(user)
}

async fn find_seller(db: &DatabaseConnection, seller_id: i32) -> Result<user::Model, ServiceError> {
    User::find_by_id(seller_id)
        .filter(user::Column::Role.eq(Role::Seller.as_str()))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Seller"))
}

fn pending_condition() -> Condition {
    Condition::all()
        .add(user::Column::Role.eq(Role::Seller.as_str()))
        .add(user::Column::IsSuspended.eq(true))
        .add(user::Column::SuspendedReason.contains("pending"))
}

pub async fn pending_sellers(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<Vec<user::Model>, ServiceError> {
    require_manager(actor)?;
    Ok(User::find()
        .filter(pending_condition())
        .order_by_desc(user::Column::DateJoined)
        .all(db)
        .await?)
}

pub async fn manage_sellers(
    db: &DatabaseConnection,
    actor: &user::Model,
    status: Option<SellerStatusFilter>,
) -> Result<Vec<user::Model>, ServiceError> {
    require_manager(actor)?;

    let mut query = User::find().filter(user::Column::Role.eq(Role::Seller.as_str()));
    match status {
        Some(SellerStatusFilter::Active) => query = query.filter(user::Column::IsSuspended.eq(false)),
        Some(SellerStatusFilter::Suspended) => {
            query = query.filter(user::Column::IsSuspended.eq(true))
        }
        None => {}
    }

    Ok(query.order_by_desc(user::Column::DateJoined).all(db).await?)
}

pub async fn approve_seller(
    db: &DatabaseConnection,
    actor: &user::Model,
    seller_id: i32,
    decision: SellerDecision,
    reason: Option<String>,
) -> Result<user::Model, ServiceError> {
    require_manager(actor)?;
    let seller = find_seller(db, seller_id).await?;

    match decision {
        SellerDecision::Approve => activate(db, seller).await,
        SellerDecision::Reject => {
            let reason = reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string());
            suspend(db, seller, &reason, Some(actor.id)).await
        }
    }
}

pub async fn toggle_seller_status(
    db: &DatabaseConnection,
    actor: &user::Model,
    seller_id: i32,
    reason: Option<String>,
) -> Result<user::Model, ServiceError> {
    require_manager(actor)?;
    let seller = find_seller(db, seller_id).await?;

    if seller.is_suspended {
        activate(db, seller).await
    } else {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUSPEND_REASON.to_string());
        suspend(db, seller, &reason, Some(actor.id)).await
    }
}

pub async fn update_profile(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    current: user::Model,
    update: ProfileUpdate,
) -> Result<user::Model, ServiceError> {
    let email = update.email.trim().to_string();
    let phone_number = update.phone_number.trim().to_string();

    if email_taken(db, &email, Some(current.id)).await? {
        return Err(ServiceError::Validation("Email already exists.".to_string()));
    }
    if !phone_number.is_empty() && !is_valid_phone_number(&phone_number) {
        return Err(ServiceError::Validation(
            "Phone number must be in format +250XXXXXXXXX".to_string(),
        ));
    }

    let signature = match update.signature.as_deref().map(str::trim) {
        Some(data) if !data.is_empty() => {
            Some(media::store_data_url(media, media::SIGNATURES, data).await?)
        }
        _ => None,
    };

    let mut account: user::ActiveModel = current.into();
    account.first_name = Set(update.first_name.trim().to_string());
    account.last_name = Set(update.last_name.trim().to_string());
    account.email = Set(email);
    account.phone_number = Set(phone_number);
    account.address = Set(update.address.trim().to_string());
    account.national_id = Set(update.national_id.trim().to_string());
    if let Some(path) = signature {
        account.signature = Set(Some(path));
    }
    account.updated_at = Set(now());

    let user = account.update(db).await?;
    tracing::info!("Profile updated for {}", user.username);
    Ok(user)
}

pub async fn create_manager(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: CreateManagerInput,
) -> Result<user::Model, ServiceError> {
    require_superuser(actor)?;

    let username = required(&input.username, "Username is required.")?;
    if input.password.is_empty() {
        return Err(ServiceError::Validation("Password is required.".to_string()));
    }
    let email = input.email.trim().to_string();
    if username_taken(db, &username).await? {
        return Err(ServiceError::Validation("Username already exists.".to_string()));
    }
    if email_taken(db, &email, None).await? {
        return Err(ServiceError::Validation("Email already exists.".to_string()));
    }

    let password_hash = hash_password(&input.password).map_err(ServiceError::Database)?;
    let manager = new_account(
        username,
        email,
        password_hash,
        Role::Manager,
        input.first_name.trim().to_string(),
        input.last_name.trim().to_string(),
        input.phone_number.trim().to_string(),
    )
    .insert(db)
    .await?;

    tracing::info!("Manager {} created by {}", manager.username, actor.username);
    Ok(manager)
}

/// Manager accounts, for the superuser landing page.
pub async fn managers(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<Vec<user::Model>, ServiceError> {
    require_superuser(actor)?;
    Ok(User::find()
        .filter(user::Column::Role.eq(Role::Manager.as_str()))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

pub async fn manager_dashboard(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<ManagerDashboard, ServiceError> {
    require_manager(actor)?;

    let sellers = || User::find().filter(user::Column::Role.eq(Role::Seller.as_str()));
    let phones_with = |status: PhoneStatus| Phone::find().filter(phone::Column::Status.eq(status.as_str()));

    let mut stats = ManagerStats {
        total_sellers: sellers().count(db).await?,
        active_sellers: sellers()
            .filter(user::Column::IsSuspended.eq(false))
            .count(db)
            .await?,
        suspended_sellers: sellers()
            .filter(user::Column::IsSuspended.eq(true))
            .count(db)
            .await?,
        pending_approval: User::find().filter(pending_condition()).count(db).await?,
        total_phones: Phone::find().count(db).await?,
        available_phones: phones_with(PhoneStatus::Available).count(db).await?,
        sold_phones: phones_with(PhoneStatus::Sold).count(db).await?,
        assigned_phones: phones_with(PhoneStatus::Assigned).count(db).await?,
        total_agreements: Agreement::find().count(db).await?,
        total_transactions: SalesTransaction::find()
            .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
            .count(db)
            .await?,
        ..Default::default()
    };

    // Month to date
    let month_start = today().with_day(1).unwrap_or_else(today);
    let monthly = SalesTransaction::find()
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .filter(sales_transaction::Column::SaleDate.gte(day_start(month_start)))
        .all(db)
        .await?;
    stats.monthly_revenue = monthly.iter().map(|t| t.sale_price).sum();
    stats.monthly_profit = monthly.iter().map(|t| t.profit).sum();

    let pending_sellers = User::find()
        .filter(pending_condition())
        .order_by_desc(user::Column::DateJoined)
        .limit(5)
        .all(db)
        .await?;

    Ok(ManagerDashboard {
        stats,
        pending_sellers,
        recent_agreements: agreement_service::recent_agreements(db, 10).await?,
        recent_transactions: sales_service::recent_completed(db, 10).await?,
        top_sellers: sales_service::rank_sellers(db, &monthly, 5).await?,
    })
}

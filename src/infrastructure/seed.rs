use chrono::Local;
use rust_decimal_macros::dec;
use sea_orm::*;

use crate::domain::{AgreementType, HistoryAction, PhoneStatus, Role};
use crate::infrastructure::auth::hash_password;
use crate::models::{agreement, phone, phone_history, user};
use crate::services::account_service::PENDING_APPROVAL_REASON;

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn hashed(password: &str) -> Result<String, DbErr> {
    hash_password(password).map_err(DbErr::Custom)
}

/// Create the bootstrap superuser, or promote an existing account with that
/// username.
pub async fn ensure_superuser(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model, DbErr> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    if let Some(found) = existing {
        if found.is_superuser && !found.is_suspended {
            return Ok(found);
        }
        let mut account: user::ActiveModel = found.into();
        account.is_superuser = Set(true);
        account.is_suspended = Set(false);
        account.updated_at = Set(timestamp());
        let account = account.update(db).await?;
        tracing::info!("Promoted {} to superuser", account.username);
        return Ok(account);
    }

    let now = timestamp();
    let account = user::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(String::new()),
        password_hash: Set(hashed(password)?),
        role: Set(None),
        is_superuser: Set(true),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        phone_number: Set(String::new()),
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
    .insert(db)
    .await?;

    tracing::info!("Created superuser {}", account.username);
    Ok(account)
}

struct DemoUser {
    username: &'static str,
    role: Role,
    first_name: &'static str,
    last_name: &'static str,
    phone_number: &'static str,
    national_id: &'static str,
    pending: bool,
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "manager",
        role: Role::Manager,
        first_name: "Grace",
        last_name: "Mukamana",
        phone_number: "+250788100100",
        national_id: "1198870012345671",
        pending: false,
    },
    DemoUser {
        username: "alice",
        role: Role::Seller,
        first_name: "Alice",
        last_name: "Uwase",
        phone_number: "+250788200200",
        national_id: "1199570012345672",
        pending: false,
    },
    DemoUser {
        username: "bob",
        role: Role::Seller,
        first_name: "Bob",
        last_name: "Habimana",
        phone_number: "+250788300300",
        national_id: "1199670012345673",
        pending: false,
    },
    DemoUser {
        username: "newcomer",
        role: Role::Seller,
        first_name: "Eric",
        last_name: "Nshuti",
        phone_number: "+250788400400",
        national_id: "1200070012345674",
        pending: true,
    },
];

/// Demo accounts (password = username) and a few phones in Alice's stock.
/// Does nothing if the demo manager already exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    if user::Entity::find()
        .filter(user::Column::Username.eq("manager"))
        .one(db)
        .await?
        .is_some()
    {
        tracing::info!("Demo data already present, skipping");
        return Ok(());
    }

    let now = timestamp();
    let txn = db.begin().await?;

    // 1. Accounts
    let mut alice_id = None;
    for demo in DEMO_USERS {
        let account = user::ActiveModel {
            username: Set(demo.username.to_owned()),
            email: Set(format!("{}@phonedesk.local", demo.username)),
            password_hash: Set(hashed(demo.username)?),
            role: Set(Some(demo.role.as_str().to_owned())),
            is_superuser: Set(false),
            first_name: Set(demo.first_name.to_owned()),
            last_name: Set(demo.last_name.to_owned()),
            phone_number: Set(demo.phone_number.to_owned()),
            address: Set("Kigali".to_owned()),
            national_id: Set(demo.national_id.to_owned()),
            signature: Set(None),
            is_suspended: Set(demo.pending),
            suspended_at: Set(demo.pending.then(|| now.clone())),
            suspended_reason: Set(if demo.pending {
                PENDING_APPROVAL_REASON.to_owned()
            } else {
                String::new()
            }),
            suspended_by: Set(None),
            date_joined: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        if demo.username == "alice" {
            alice_id = Some(account.id);
        }
    }
    let alice = alice_id.ok_or_else(|| DbErr::Custom("demo seller missing".to_owned()))?;

    // 2. Stock bought from walk-in suppliers
    let stock = [
        ("356938035643809", "R58T20ABCDE", "Samsung", "Galaxy A14", "Black", dec!(120000)),
        ("353918106789012", "F2LXK0QWERTY", "Apple", "iPhone 11", "White", dec!(310000)),
        ("861234050987654", "TECNO7X9Y8Z", "Tecno", "Spark 10", "Blue", dec!(85000)),
    ];

    for (imei, serial, brand, model, color, price) in stock {
        let phone = phone::ActiveModel {
            imei: Set(imei.to_owned()),
            serial_number: Set(serial.to_owned()),
            brand: Set(brand.to_owned()),
            model_name: Set(model.to_owned()),
            color: Set(color.to_owned()),
            condition: Set("used".to_owned()),
            status: Set(PhoneStatus::Available.as_str().to_owned()),
            purchase_price: Set(Some(price)),
            current_owner_id: Set(alice),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let agreement = agreement::ActiveModel {
            agreement_type: Set(AgreementType::Buy.as_str().to_owned()),
            phone_id: Set(phone.id),
            seller_id: Set(alice),
            customer_name: Set("Walk-in Supplier".to_owned()),
            customer_national_id: Set("1199080000000000".to_owned()),
            customer_phone: Set("+250788999999".to_owned()),
            customer_address: Set("Kigali".to_owned()),
            id_photo: Set(None),
            passport_photo: Set(None),
            signature: Set(String::new()),
            signature_photo: Set(None),
            price: Set(price),
            notes: Set("Demo stock".to_owned()),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        phone_history::ActiveModel {
            phone_id: Set(phone.id),
            action: Set(HistoryAction::Buy.as_str().to_owned()),
            from_user_id: Set(Some(alice)),
            to_user_id: Set(None),
            agreement_id: Set(Some(agreement.id)),
            notes: Set("Phone purchased from Walk-in Supplier".to_owned()),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::info!("Seeded {} demo accounts and {} phones", DEMO_USERS.len(), 3);
    Ok(())
}

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Accounts
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            role TEXT,
            is_superuser BOOLEAN NOT NULL DEFAULT 0,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            phone_number TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            national_id TEXT NOT NULL DEFAULT '',
            signature TEXT,
            is_suspended BOOLEAN NOT NULL DEFAULT 0,
            suspended_at TEXT,
            suspended_reason TEXT NOT NULL DEFAULT '',
            suspended_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            date_joined TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Inventory
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS phones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            imei TEXT NOT NULL UNIQUE,
            serial_number TEXT NOT NULL UNIQUE,
            brand TEXT NOT NULL,
            model_name TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '',
            condition TEXT NOT NULL DEFAULT 'used',
            status TEXT NOT NULL DEFAULT 'available',
            purchase_price REAL,
            current_owner_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (current_owner_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS agreements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agreement_type TEXT NOT NULL,
            phone_id INTEGER NOT NULL,
            seller_id INTEGER NOT NULL,
            customer_name TEXT NOT NULL,
            customer_national_id TEXT NOT NULL,
            customer_phone TEXT NOT NULL,
            customer_address TEXT NOT NULL,
            id_photo TEXT,
            passport_photo TEXT,
            signature TEXT NOT NULL DEFAULT '',
            signature_photo TEXT,
            price REAL NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY (phone_id) REFERENCES phones(id) ON DELETE CASCADE,
            FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS phone_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            from_user_id INTEGER,
            to_user_id INTEGER,
            agreement_id INTEGER,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY (phone_id) REFERENCES phones(id) ON DELETE CASCADE,
            FOREIGN KEY (from_user_id) REFERENCES users(id) ON DELETE SET NULL,
            FOREIGN KEY (to_user_id) REFERENCES users(id) ON DELETE SET NULL,
            FOREIGN KEY (agreement_id) REFERENCES agreements(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS phone_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_id INTEGER NOT NULL,
            from_seller_id INTEGER NOT NULL,
            to_seller_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            message TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (phone_id) REFERENCES phones(id) ON DELETE CASCADE,
            FOREIGN KEY (from_seller_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (to_seller_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Audit records refuse changes even when written around the ORM
    execute(
        db,
        r#"
        CREATE TRIGGER IF NOT EXISTS phone_history_no_update
        BEFORE UPDATE ON phone_history
        BEGIN
            SELECT RAISE(ABORT, 'phone history is append-only');
        END
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TRIGGER IF NOT EXISTS agreements_no_update
        BEFORE UPDATE ON agreements
        BEGIN
            SELECT RAISE(ABORT, 'agreements cannot be modified');
        END
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TRIGGER IF NOT EXISTS phone_history_no_delete
        BEFORE DELETE ON phone_history
        BEGIN
            SELECT RAISE(ABORT, 'phone history is append-only');
        END
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TRIGGER IF NOT EXISTS agreements_no_delete
        BEFORE DELETE ON agreements
        BEGIN
            SELECT RAISE(ABORT, 'agreements cannot be deleted');
        END
        "#,
    )
    .await?;

    // Sales
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS sales_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL UNIQUE,
            seller_id INTEGER NOT NULL,
            phone_id INTEGER NOT NULL,
            agreement_id INTEGER UNIQUE,
            customer_name TEXT NOT NULL,
            customer_phone TEXT NOT NULL,
            customer_email TEXT NOT NULL DEFAULT '',
            sale_price REAL NOT NULL,
            cost_price REAL NOT NULL,
            profit REAL NOT NULL DEFAULT 0,
            commission_rate REAL NOT NULL DEFAULT 0,
            commission_amount REAL NOT NULL DEFAULT 0,
            payment_method TEXT NOT NULL DEFAULT 'cash',
            payment_reference TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'completed',
            notes TEXT NOT NULL DEFAULT '',
            sale_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (phone_id) REFERENCES phones(id) ON DELETE RESTRICT,
            FOREIGN KEY (agreement_id) REFERENCES agreements(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS seller_performance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            seller_id INTEGER NOT NULL,
            period_type TEXT NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            total_sales INTEGER NOT NULL DEFAULT 0,
            total_revenue REAL NOT NULL DEFAULT 0,
            total_cost REAL NOT NULL DEFAULT 0,
            total_profit REAL NOT NULL DEFAULT 0,
            total_commission REAL NOT NULL DEFAULT 0,
            average_sale_price REAL NOT NULL DEFAULT 0,
            average_profit_margin REAL NOT NULL DEFAULT 0,
            rank_in_period INTEGER,
            calculated_at TEXT NOT NULL,
            UNIQUE (seller_id, period_type, period_start),
            FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS sales_targets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            seller_id INTEGER NOT NULL,
            target_type TEXT NOT NULL,
            target_value REAL NOT NULL,
            achieved_value REAL NOT NULL DEFAULT 0,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            is_achieved BOOLEAN NOT NULL DEFAULT 0,
            achievement_date TEXT,
            incentive_amount REAL NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            national_id TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            total_purchases INTEGER NOT NULL DEFAULT 0,
            total_spent REAL NOT NULL DEFAULT 0,
            average_purchase_value REAL NOT NULL DEFAULT 0,
            registered_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            notes TEXT NOT NULL DEFAULT '',
            first_purchase_date TEXT,
            last_purchase_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Indexes
    for sql in [
        // Email is optional, but two accounts never share one
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email) WHERE email <> ''",
        "CREATE INDEX IF NOT EXISTS idx_phones_status_owner ON phones(status, current_owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_agreements_type_seller ON agreements(agreement_type, seller_id)",
        "CREATE INDEX IF NOT EXISTS idx_agreements_created ON agreements(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_phone_history_phone ON phone_history(phone_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_assignments_status_to ON phone_assignments(status, to_seller_id)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_seller_date ON sales_transactions(seller_id, sale_date)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_status_date ON sales_transactions(status, sale_date)",
        "CREATE INDEX IF NOT EXISTS idx_targets_seller_active ON sales_targets(seller_id, is_active)",
        "CREATE INDEX IF NOT EXISTS idx_customers_last_purchase ON customers(last_purchase_date)",
    ] {
        execute(db, sql).await?;
    }

    tracing::debug!("Database schema is up to date");

    Ok(())
}

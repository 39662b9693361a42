//! Sales Service - dashboards, reports and seller performance
//!
//! Aggregates are computed in Rust over the matching transactions; a shop's
//! volume keeps these sets small.

use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::finance;
use crate::domain::{PeriodType, Role, TransactionStatus};
use crate::models::phone::Entity as Phone;
use crate::models::sales_target::{self, Entity as SalesTarget};
use crate::models::sales_transaction::{self, Entity as SalesTransaction};
use crate::models::seller_performance::{self, Entity as SellerPerformance};
use crate::models::user::{self, Entity as User};
use crate::services::{
    day_end, day_start, now, page_index, parse_date, require_manager, today, Page, ServiceError,
};

pub const DASHBOARD_PAGE_SIZE: u64 = 20;
pub const TRANSACTIONS_PER_PAGE: u64 = 25;
pub const REPORT_ROW_LIMIT: usize = 100;

/// Dashboard period selector. `All` applies no date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardPeriod {
    #[default]
    All,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: DashboardPeriod,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<String>,
    pub seller: Option<i32>,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    Summary,
    SellerPerformance,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub report_type: ReportType,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceInput {
    pub seller_id: i32,
    pub period_type: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesStats {
    pub total_sales: u64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub avg_sale_price: Decimal,
    /// Profit as a percentage of revenue
    pub profit_margin: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub revenue: Vec<Decimal>,
    pub profit: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    #[serde(flatten)]
    pub transaction: sales_transaction::Model,
    pub seller_name: Option<String>,
    pub phone_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerTotals {
    pub seller_id: i32,
    pub username: String,
    pub full_name: String,
    pub total_sales: u64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub total_commission: Decimal,
    /// Profit as a percentage of cost
    pub average_profit_margin: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
    #[serde(flatten)]
    pub performance: seller_performance::Model,
    pub seller_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesDashboard {
    pub period: DashboardPeriod,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub stats: SalesStats,
    pub recent_transactions: Vec<TransactionSummary>,
    pub top_performers: Vec<PerformanceView>,
    pub active_targets: Vec<sales_target::Model>,
    pub chart: ChartSeries,
    pub transactions: Page<TransactionSummary>,
    /// Active sellers, for the manager's filter
    pub sellers: Vec<user::Model>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub total_transactions: u64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_commission: Decimal,
    /// Profit as a percentage of revenue
    pub profit_margin: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub report_type: ReportType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub report: ReportTotals,
    pub transactions: Vec<TransactionSummary>,
    pub seller_performances: Vec<SellerTotals>,
    pub generated_at: String,
}

/// Calendar day of a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn sale_day(sale_date: &str) -> Option<NaiveDate> {
    sale_date
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = ((date.month() - 1) / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

fn last_day_of_span(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .map(|d| d - Duration::days(1))
        .unwrap_or(start)
}

/// Inclusive date window selected by a dashboard period.
pub fn period_range(period: DashboardPeriod, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = match period {
        DashboardPeriod::All => return None,
        DashboardPeriod::Daily => today,
        DashboardPeriod::Weekly => today - Duration::days(7),
        DashboardPeriod::Monthly => month_start(today),
        DashboardPeriod::Quarterly => quarter_start(today),
        DashboardPeriod::Yearly => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
    };
    Some((start, today))
}

/// One point on the dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Chart buckets for a period, oldest first.
pub fn chart_buckets(period: DashboardPeriod, today: NaiveDate) -> Vec<ChartBucket> {
    match period {
        DashboardPeriod::All | DashboardPeriod::Monthly => (0..6)
            .rev()
            .map(|i| {
                let start = months_back(month_start(today), i);
                ChartBucket {
                    label: start.format("%b %Y").to_string(),
                    start,
                    end: last_day_of_span(start, 1),
                }
            })
            .collect(),
        DashboardPeriod::Daily => (0..7)
            .rev()
            .map(|i| {
                let day = today - Duration::days(i);
                ChartBucket {
                    label: day.format("%b %d").to_string(),
                    start: day,
                    end: day,
                }
            })
            .collect(),
        DashboardPeriod::Weekly => (0..4)
            .rev()
            .map(|i| {
                let end = today - Duration::days(7 * i);
                let start = end - Duration::days(6);
                ChartBucket {
                    label: format!("{} - {}", start.format("%b %d"), end.format("%b %d")),
                    start,
                    end,
                }
            })
            .collect(),
        DashboardPeriod::Quarterly => (0..4)
            .rev()
            .map(|i| {
                let start = months_back(quarter_start(today), 3 * i);
                ChartBucket {
                    label: format!("Q{} {}", (start.month() - 1) / 3 + 1, start.year()),
                    start,
                    end: last_day_of_span(start, 3),
                }
            })
            .collect(),
        DashboardPeriod::Yearly => (0..3)
            .rev()
            .filter_map(|i| {
                let year = today.year() - i;
                Some(ChartBucket {
                    label: year.to_string(),
                    start: NaiveDate::from_ymd_opt(year, 1, 1)?,
                    end: NaiveDate::from_ymd_opt(year, 12, 31)?,
                })
            })
            .collect(),
    }
}

pub fn chart_series(buckets: &[ChartBucket], transactions: &[sales_transaction::Model]) -> ChartSeries {
    let mut series = ChartSeries::default();
    for bucket in buckets {
        let inside = transactions.iter().filter(|t| {
            sale_day(&t.sale_date).is_some_and(|d| d >= bucket.start && d <= bucket.end)
        });
        let (revenue, profit) = inside.fold((Decimal::ZERO, Decimal::ZERO), |(r, p), t| {
            (r + t.sale_price, p + t.profit)
        });
        series.labels.push(bucket.label.clone());
        series.revenue.push(finance::money(revenue));
        series.profit.push(finance::money(profit));
    }
    series
}

pub fn sales_stats(transactions: &[sales_transaction::Model]) -> SalesStats {
    let total_revenue: Decimal = transactions.iter().map(|t| t.sale_price).sum();
    let total_profit: Decimal = transactions.iter().map(|t| t.profit).sum();
    let count = transactions.len() as u64;
    SalesStats {
        total_sales: count,
        total_revenue: finance::money(total_revenue),
        total_profit: finance::money(total_profit),
        avg_sale_price: finance::average(total_revenue, count),
        profit_margin: finance::percentage(total_profit, total_revenue),
    }
}

pub fn report_totals(transactions: &[sales_transaction::Model]) -> ReportTotals {
    let sum = |f: fn(&sales_transaction::Model) -> Decimal| -> Decimal {
        finance::money(transactions.iter().map(f).sum())
    };
    let total_revenue = sum(|t| t.sale_price);
    let total_profit = sum(|t| t.profit);
    ReportTotals {
        total_transactions: transactions.len() as u64,
        total_revenue,
        total_cost: sum(|t| t.cost_price),
        total_profit,
        total_commission: sum(|t| t.commission_amount),
        profit_margin: finance::percentage(total_profit, total_revenue),
    }
}

fn scope(actor: &user::Model, range: Option<(NaiveDate, NaiveDate)>) -> Condition {
    let mut condition = Condition::all();
    if !actor.can_manage() {
        condition = condition.add(sales_transaction::Column::SellerId.eq(actor.id));
    }
    if let Some((start, end)) = range {
        condition = condition.add(
            sales_transaction::Column::SaleDate.between(day_start(start), day_end(end)),
        );
    }
    condition
}

async fn seller_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, user::Model>, ServiceError> {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(User::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

async fn summaries(
    db: &DatabaseConnection,
    rows: Vec<(sales_transaction::Model, Option<crate::models::phone::Model>)>,
) -> Result<Vec<TransactionSummary>, ServiceError> {
    let sellers = seller_names(db, rows.iter().map(|(t, _)| t.seller_id)).await?;
    Ok(rows
        .into_iter()
        .map(|(transaction, phone)| TransactionSummary {
            seller_name: sellers.get(&transaction.seller_id).map(|u| u.full_name()),
            phone_name: phone.map(|p| p.display_name()),
            transaction,
        })
        .collect())
}

async fn summarize_models(
    db: &DatabaseConnection,
    transactions: &[sales_transaction::Model],
) -> Result<Vec<TransactionSummary>, ServiceError> {
    let phone_ids: Vec<i32> = transactions.iter().map(|t| t.phone_id).collect();
    let phones: HashMap<i32, crate::models::phone::Model> = if phone_ids.is_empty() {
        HashMap::new()
    } else {
        Phone::find()
            .filter(crate::models::phone::Column::Id.is_in(phone_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };
    let rows = transactions
        .iter()
        .map(|t| (t.clone(), phones.get(&t.phone_id).cloned()))
        .collect();
    summaries(db, rows).await
}

/// Group transactions per seller, highest revenue first.
pub async fn rank_sellers(
    db: &DatabaseConnection,
    transactions: &[sales_transaction::Model],
    limit: usize,
) -> Result<Vec<SellerTotals>, ServiceError> {
    let mut grouped: HashMap<i32, Vec<&sales_transaction::Model>> = HashMap::new();
    for t in transactions {
        grouped.entry(t.seller_id).or_default().push(t);
    }

    let sellers = seller_names(db, grouped.keys().copied()).await?;

    let mut totals: Vec<SellerTotals> = grouped
        .into_iter()
        .map(|(seller_id, rows)| {
            let revenue: Decimal = rows.iter().map(|t| t.sale_price).sum();
            let cost: Decimal = rows.iter().map(|t| t.cost_price).sum();
            let profit: Decimal = rows.iter().map(|t| t.profit).sum();
            let commission: Decimal = rows.iter().map(|t| t.commission_amount).sum();
            let seller = sellers.get(&seller_id);
            SellerTotals {
                seller_id,
                username: seller.map(|u| u.username.clone()).unwrap_or_default(),
                full_name: seller.map(|u| u.full_name()).unwrap_or_default(),
                total_sales: rows.len() as u64,
                total_revenue: finance::money(revenue),
                total_profit: finance::money(profit),
                total_commission: finance::money(commission),
                average_profit_margin: finance::percentage(profit, cost),
            }
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then(a.seller_id.cmp(&b.seller_id))
    });
    totals.truncate(limit);
    Ok(totals)
}

pub async fn recent_completed(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<TransactionSummary>, ServiceError> {
    let rows = SalesTransaction::find()
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .order_by_desc(sales_transaction::Column::SaleDate)
        .order_by_desc(sales_transaction::Column::Id)
        .find_also_related(Phone)
        .limit(limit)
        .all(db)
        .await?;
    summaries(db, rows).await
}

fn explicit_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>, ServiceError> {
    match (start.filter(|s| !s.is_empty()), end.filter(|s| !s.is_empty())) {
        (Some(start), Some(end)) => {
            let start = parse_date(start, "start_date")?;
            let end = parse_date(end, "end_date")?;
            if end < start {
                return Err(ServiceError::Validation(
                    "End date must not be before start date.".to_string(),
                ));
            }
            Ok(Some((start, end)))
        }
        _ => Ok(None),
    }
}

async fn top_performers(
    db: &DatabaseConnection,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<PerformanceView>, ServiceError> {
    let mut query = SellerPerformance::find();
    if let Some((start, end)) = range {
        query = query
            .filter(seller_performance::Column::PeriodStart.gte(start.format("%Y-%m-%d").to_string()))
            .filter(seller_performance::Column::PeriodEnd.lte(end.format("%Y-%m-%d").to_string()));
    }
    let records = query
        .order_by_desc(seller_performance::Column::TotalRevenue)
        .limit(5)
        .all(db)
        .await?;

    let sellers = seller_names(db, records.iter().map(|r| r.seller_id)).await?;
    Ok(records
        .into_iter()
        .map(|performance| PerformanceView {
            seller_name: sellers.get(&performance.seller_id).map(|u| u.full_name()),
            performance,
        })
        .collect())
}

pub async fn sales_dashboard(
    db: &DatabaseConnection,
    actor: &user::Model,
    query: DashboardQuery,
) -> Result<SalesDashboard, ServiceError> {
    let today = today();

    // 1. Work out the window: explicit dates win over the period selector
    let range = match explicit_range(query.start_date.as_deref(), query.end_date.as_deref())? {
        Some(range) => Some(range),
        None => period_range(query.period, today),
    };
    let condition = scope(actor, range);

    // 2. Stats and chart over everything in scope
    let transactions = SalesTransaction::find()
        .filter(condition.clone())
        .order_by_desc(sales_transaction::Column::SaleDate)
        .order_by_desc(sales_transaction::Column::Id)
        .all(db)
        .await?;

    let stats = sales_stats(&transactions);
    let chart = chart_series(&chart_buckets(query.period, today), &transactions);
    let recent: Vec<sales_transaction::Model> = transactions.iter().take(10).cloned().collect();
    let recent_transactions = summarize_models(db, &recent).await?;

    // 3. Manager extras
    let (top_performers, sellers) = if actor.can_manage() {
        let sellers = User::find()
            .filter(user::Column::Role.eq(Role::Seller.as_str()))
            .filter(user::Column::IsSuspended.eq(false))
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        (top_performers(db, range).await?, sellers)
    } else {
        (Vec::new(), Vec::new())
    };

    let mut targets = SalesTarget::find()
        .filter(sales_target::Column::IsActive.eq(true))
        .filter(sales_target::Column::EndDate.gte(today.format("%Y-%m-%d").to_string()));
    if !actor.can_manage() {
        targets = targets.filter(sales_target::Column::SellerId.eq(actor.id));
    }
    let active_targets = targets
        .order_by_asc(sales_target::Column::EndDate)
        .limit(5)
        .all(db)
        .await?;

    // 4. Paginated table
    let paginator = SalesTransaction::find()
        .filter(condition)
        .order_by_desc(sales_transaction::Column::SaleDate)
        .order_by_desc(sales_transaction::Column::Id)
        .find_also_related(Phone)
        .paginate(db, DASHBOARD_PAGE_SIZE);
    let totals = paginator.num_items_and_pages().await?;
    let index = page_index(query.page);
    let rows = paginator.fetch_page(index).await?;

    Ok(SalesDashboard {
        period: query.period,
        start_date: range.map(|(s, _)| s),
        end_date: range.map(|(_, e)| e),
        stats,
        recent_transactions,
        top_performers,
        active_targets,
        chart,
        transactions: Page {
            items: summaries(db, rows).await?,
            page: index + 1,
            per_page: DASHBOARD_PAGE_SIZE,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        },
        sellers,
    })
}

pub async fn list_transactions(
    db: &DatabaseConnection,
    actor: &user::Model,
    filter: TransactionFilter,
) -> Result<Page<TransactionSummary>, ServiceError> {
    let mut condition = scope(actor, None);

    if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
        let status: TransactionStatus = status.parse()?;
        condition = condition.add(sales_transaction::Column::Status.eq(status.as_str()));
    }
    // The seller filter is a management tool; sellers are already scoped
    if let Some(seller) = filter.seller.filter(|_| actor.can_manage()) {
        condition = condition.add(sales_transaction::Column::SellerId.eq(seller));
    }

    let paginator = SalesTransaction::find()
        .filter(condition)
        .order_by_desc(sales_transaction::Column::SaleDate)
        .order_by_desc(sales_transaction::Column::Id)
        .find_also_related(Phone)
        .paginate(db, TRANSACTIONS_PER_PAGE);

    let totals = paginator.num_items_and_pages().await?;
    let index = page_index(filter.page);
    let rows = paginator.fetch_page(index).await?;

    Ok(Page {
        items: summaries(db, rows).await?,
        page: index + 1,
        per_page: TRANSACTIONS_PER_PAGE,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

async fn report_transactions(
    db: &DatabaseConnection,
    actor: &user::Model,
    query: &ReportQuery,
) -> Result<(NaiveDate, NaiveDate, Vec<sales_transaction::Model>), ServiceError> {
    let today = today();
    let start = match query.start_date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s, "start_date")?,
        None => month_start(today),
    };
    let end = match query.end_date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s, "end_date")?,
        None => today,
    };
    if end < start {
        return Err(ServiceError::Validation(
            "End date must not be before start date.".to_string(),
        ));
    }

    let transactions = SalesTransaction::find()
        .filter(scope(actor, Some((start, end))))
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .order_by_desc(sales_transaction::Column::SaleDate)
        .order_by_desc(sales_transaction::Column::Id)
        .all(db)
        .await?;

    Ok((start, end, transactions))
}

pub async fn sales_report(
    db: &DatabaseConnection,
    actor: &user::Model,
    query: ReportQuery,
) -> Result<SalesReport, ServiceError> {
    let (start, end, transactions) = report_transactions(db, actor, &query).await?;

    let report = report_totals(&transactions);
    let seller_performances = match query.report_type {
        ReportType::SellerPerformance => rank_sellers(db, &transactions, usize::MAX).await?,
        ReportType::Summary => Vec::new(),
    };
    let shown: Vec<sales_transaction::Model> =
        transactions.into_iter().take(REPORT_ROW_LIMIT).collect();

    Ok(SalesReport {
        report_type: query.report_type,
        start_date: start,
        end_date: end,
        report,
        transactions: summarize_models(db, &shown).await?,
        seller_performances,
        generated_at: now(),
    })
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Transaction ID")]
    transaction_id: &'a str,
    #[serde(rename = "Sale Date")]
    sale_date: &'a str,
    #[serde(rename = "Seller")]
    seller: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "Customer")]
    customer: &'a str,
    #[serde(rename = "Customer Phone")]
    customer_phone: &'a str,
    #[serde(rename = "Sale Price")]
    sale_price: Decimal,
    #[serde(rename = "Cost Price")]
    cost_price: Decimal,
    #[serde(rename = "Profit")]
    profit: Decimal,
    #[serde(rename = "Commission")]
    commission: Decimal,
    #[serde(rename = "Payment Method")]
    payment_method: &'a str,
    #[serde(rename = "Status")]
    status: &'a str,
}

pub fn report_csv(rows: &[TransactionSummary]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        let t = &row.transaction;
        writer
            .serialize(ReportRow {
                transaction_id: &t.transaction_id,
                sale_date: &t.sale_date,
                seller: row.seller_name.as_deref().unwrap_or(""),
                phone: row.phone_name.as_deref().unwrap_or(""),
                customer: &t.customer_name,
                customer_phone: &t.customer_phone,
                sale_price: t.sale_price,
                cost_price: t.cost_price,
                profit: t.profit,
                commission: t.commission_amount,
                payment_method: &t.payment_method,
                status: &t.status,
            })
            .map_err(|e| ServiceError::Storage(format!("CSV write error: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::Storage(format!("CSV write error: {}", e)))
}

/// Report export. Only CSV is produced.
pub async fn export_report(
    db: &DatabaseConnection,
    actor: &user::Model,
    query: ReportQuery,
    format: &str,
) -> Result<(String, Vec<u8>), ServiceError> {
    if !format.eq_ignore_ascii_case("csv") {
        return Err(ServiceError::Validation(format!(
            "Unsupported export format '{}'. Use csv.",
            format
        )));
    }

    let (start, end, transactions) = report_transactions(db, actor, &query).await?;
    let rows = summarize_models(db, &transactions).await?;
    let bytes = report_csv(&rows)?;

    let filename = format!(
        "sales_report_{}_{}.csv",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    );
    tracing::info!("{} exported {} ({} rows)", actor.username, filename, rows.len());
    Ok((filename, bytes))
}

/// Recompute one seller's snapshot for a period, then re-rank everyone with a
/// snapshot for the same period.
pub async fn recalculate_performance(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: PerformanceInput,
) -> Result<seller_performance::Model, ServiceError> {
    require_manager(actor)?;

    let period: PeriodType = input.period_type.parse()?;
    let start = parse_date(&input.start_date, "start_date")?;
    let end = parse_date(&input.end_date, "end_date")?;
    if end < start {
        return Err(ServiceError::Validation(
            "End date must not be before start date.".to_string(),
        ));
    }

    User::find_by_id(input.seller_id)
        .filter(user::Column::Role.eq(Role::Seller.as_str()))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Seller"))?;

    let period_start = start.format("%Y-%m-%d").to_string();
    let period_end = end.format("%Y-%m-%d").to_string();
    let now = now();
    let txn = db.begin().await?;

    // 1. Totals
    let transactions = SalesTransaction::find()
        .filter(sales_transaction::Column::SellerId.eq(input.seller_id))
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .filter(sales_transaction::Column::SaleDate.between(day_start(start), day_end(end)))
        .all(&txn)
        .await?;
    let totals = report_totals(&transactions);
    let count = transactions.len() as u64;

    // 2. Upsert on (seller, period type, period start)
    let existing = SellerPerformance::find()
        .filter(seller_performance::Column::SellerId.eq(input.seller_id))
        .filter(seller_performance::Column::PeriodType.eq(period.as_str()))
        .filter(seller_performance::Column::PeriodStart.eq(period_start.as_str()))
        .one(&txn)
        .await?;

    let mut record = match existing {
        Some(found) => found.into(),
        None => seller_performance::ActiveModel {
            seller_id: Set(input.seller_id),
            period_type: Set(period.as_str().to_string()),
            period_start: Set(period_start.clone()),
            ..Default::default()
        },
    };
    record.period_end = Set(period_end);
    record.total_sales = Set(count as i32);
    record.total_revenue = Set(totals.total_revenue);
    record.total_cost = Set(totals.total_cost);
    record.total_profit = Set(totals.total_profit);
    record.total_commission = Set(totals.total_commission);
    record.average_sale_price = Set(finance::average(totals.total_revenue, count));
    record.average_profit_margin = Set(finance::percentage(totals.total_profit, totals.total_cost));
    record.calculated_at = Set(now);
    let saved = record.save(&txn).await?;
    let saved_id = match saved.id {
        ActiveValue::Set(id) | ActiveValue::Unchanged(id) => id,
        ActiveValue::NotSet => return Err(ServiceError::Database("performance id missing".to_string())),
    };

    // 3. Rank within the period
    let peers = SellerPerformance::find()
        .filter(seller_performance::Column::PeriodType.eq(period.as_str()))
        .filter(seller_performance::Column::PeriodStart.eq(period_start.as_str()))
        .all(&txn)
        .await?;
    let mut ranked = peers;
    ranked.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue).then(a.seller_id.cmp(&b.seller_id)));
    for (position, peer) in ranked.into_iter().enumerate() {
        let rank = position as i32 + 1;
        if peer.rank_in_period != Some(rank) {
            let mut active: seller_performance::ActiveModel = peer.into();
            active.rank_in_period = Set(Some(rank));
            active.update(&txn).await?;
        }
    }

    let performance = SellerPerformance::find_by_id(saved_id)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Performance record"))?;

    txn.commit().await?;

    tracing::info!(
        "Performance for seller {} ({} from {}) ranked {:?}",
        performance.seller_id,
        performance.period_type,
        performance.period_start,
        performance.rank_in_period
    );
    Ok(performance)
}

//! Database seeder for token sale development and testing.
//!
//! Seeds a few buyers and sales with fixed IDs so that local requests can
//! be replayed against a fresh database. Existing rows are left alone.
//!
//! Usage: cargo run --bin seeder

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;
use tokensale_db::entities::{
    sales,
    sea_orm_active_enums::{KycStatus, SaftRequirement, SaleStatus},
    users,
};

/// Buyer with a verified email and KYC.
const VERIFIED_BUYER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0101);
/// Buyer without an email.
const ANONYMOUS_BUYER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0102);
/// Open sale without prerequisites.
const PUBLIC_SALE_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0201);
/// Open sale requiring KYC and a SAFT with verified email.
const PRIVATE_SALE_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0202);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL must be set in environment");
        std::process::exit(1);
    };

    println!("Connecting to database...");
    let db = match tokensale_db::connect(&database_url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    println!("Seeding buyers...");
    seed_user(&db, VERIFIED_BUYER_ID, "0xa11ce", Some("alice@tokensale.dev"), Some(KycStatus::Verified)).await;
    seed_user(&db, ANONYMOUS_BUYER_ID, "0xb0b", None, None).await;

    println!("Seeding sales...");
    seed_sale(
        &db,
        SaleSeed {
            id: PUBLIC_SALE_ID,
            name: "Public round",
            price: dec!(0.46),
            quantity: dec!(1000000),
            max_per_user: Some(dec!(50000)),
            requires_kyc: false,
            saft: SaftRequirement::NotRequired,
        },
    )
    .await;
    seed_sale(
        &db,
        SaleSeed {
            id: PRIVATE_SALE_ID,
            name: "Private round",
            price: dec!(0.30),
            quantity: dec!(250000),
            max_per_user: None,
            requires_kyc: true,
            saft: SaftRequirement::RequiredVerifiedEmail,
        },
    )
    .await;

    println!("Seeding complete!");
}

async fn seed_user(
    db: &DatabaseConnection,
    id: Uuid,
    wallet: &str,
    email: Option<&str>,
    kyc_status: Option<KycStatus>,
) {
    if users::Entity::find_by_id(id).one(db).await.ok().flatten().is_some() {
        println!("  Buyer {wallet} already exists, skipping...");
        return;
    }

    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(id),
        wallet_address: Set(wallet.to_string()),
        email: Set(email.map(str::to_string)),
        email_verified: Set(email.is_some()),
        name: Set(None),
        kyc_status: Set(kyc_status),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    if let Err(e) = user.insert(db).await {
        eprintln!("Failed to insert buyer {wallet}: {e}");
    } else {
        println!("  Created buyer {wallet}");
    }
}

struct SaleSeed {
    id: Uuid,
    name: &'static str,
    price: Decimal,
    quantity: Decimal,
    max_per_user: Option<Decimal>,
    requires_kyc: bool,
    saft: SaftRequirement,
}

async fn seed_sale(db: &DatabaseConnection, seed: SaleSeed) {
    if sales::Entity::find_by_id(seed.id).one(db).await.ok().flatten().is_some() {
        println!("  Sale '{}' already exists, skipping...", seed.name);
        return;
    }

    let now = Utc::now();
    let sale = sales::ActiveModel {
        id: Set(seed.id),
        name: Set(seed.name.to_string()),
        token_symbol: Set("TKN".to_string()),
        status: Set(SaleStatus::Open),
        initial_token_quantity: Set(seed.quantity),
        available_token_quantity: Set(seed.quantity),
        minimum_token_buy_per_user: Set(Some(dec!(1))),
        maximum_token_buy_per_user: Set(seed.max_per_user),
        token_price_per_unit: Set(seed.price),
        currency: Set("USD".to_string()),
        sale_closing_date: Set((now + Duration::days(30)).into()),
        requires_kyc: Set(seed.requires_kyc),
        saft: Set(seed.saft),
        to_wallet_address: Set(Some("0x5a1e".to_string())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    if let Err(e) = sale.insert(db).await {
        eprintln!("Failed to insert sale '{}': {e}", seed.name);
    } else {
        println!("  Created sale '{}'", seed.name);
    }
}

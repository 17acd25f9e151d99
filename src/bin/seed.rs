use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use tshop_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "admin").await
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "user").await
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Classic Tee", "Heavyweight cotton tee", "tshirt", 2499),
        ("Snapback Cap", "Structured six-panel cap", "cap", 1999),
        ("Canvas Tote", "Natural canvas tote bag", "tote_bag", 1499),
    ];

    for (name, desc, product_type, base_price) in products {
        let product_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description, product_type, base_price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(product_type)
        .bind(base_price)
        .fetch_optional(pool)
        .await?;

        // Already seeded on a previous run.
        let Some((product_id,)) = product_id else {
            continue;
        };

        for (sku_suffix, color, size) in [("BLK-M", "black", "M"), ("WHT-L", "white", "L")] {
            let sku = format!("{}-{}", name.replace(' ', "-").to_uppercase(), sku_suffix);
            sqlx::query(
                r#"
                INSERT INTO product_variants (id, product_id, sku, color, size, price, stock, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
                ON CONFLICT (sku) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(sku)
            .bind(color)
            .bind(size)
            .bind(base_price)
            .bind(100)
            .execute(pool)
            .await?;
        }

        // Default volume tiers: 1-9 full price, 10-49 at 10% off, 50+ at 20%.
        for (min_q, max_q, percent) in [
            (1, Some(9), 0.0_f64),
            (10, Some(49), 10.0),
            (50, None, 20.0),
        ] {
            sqlx::query(
                r#"
                INSERT INTO pricing_tiers (id, product_id, min_quantity, max_quantity, discount_percent, is_active)
                VALUES ($1, $2, $3, $4, $5, TRUE)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(min_q)
            .bind(max_q)
            .bind(percent)
            .execute(pool)
            .await?;
        }
    }

    // Stable id so reruns stay idempotent.
    let demo_team = Uuid::parse_str("3f6c1fb0-7a2e-4f0d-9b51-0d6a2c9a7e10")?;
    sqlx::query(
        r#"
        INSERT INTO team_discounts (team_id, name, discount_percent, is_active)
        VALUES ($1, 'Acme Corp', 15.0, TRUE)
        ON CONFLICT (team_id) DO NOTHING
        "#,
    )
    .bind(demo_team)
    .execute(pool)
    .await?;

    println!("Seeded catalog");
    Ok(())
}

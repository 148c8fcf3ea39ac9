use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, CartItemId, FulfillmentStatus, Money, OrderId, OrderItemId, OrderNumber,
    PaymentStatus, ProductId, UserId, VariantId,
};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgExecutor, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    query::{OrderPage, OrderQuery},
    records::{
        AddressRecord, CartItemRecord, CartRecord, CatalogVariant, NewOrder, NewOrderItem,
        OrderItemRecord, OrderRecord, ProductImage, ProductRecord, SequencePeriod, Tombstone,
        VariantRecord,
    },
    store::{AddressStore, CartStore, CatalogStore, OrderStore, Store, StoreTransaction},
};

const ADDRESS_COLUMNS: &str = "id, user_id, line1, line2, city, state, postal_code, country, \
     is_default, deleted_at, deleted_by";

const CART_COLUMNS: &str = "id, user_id, status, created_at, updated_at, deleted_at, deleted_by";

const CART_ITEM_COLUMNS: &str = "id, cart_id, variant_id, quantity, price_cents, created_at, \
     updated_at, deleted_at, deleted_by";

const ORDER_COLUMNS: &str = "id, user_id, address_id, order_number, order_date, \
     total_amount_cents, tax_amount_cents, shipping_amount_cents, discount_amount_cents, \
     payment_status, fulfillment_status, notes, created_at, updated_at, deleted_at, deleted_by";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, variant_id, quantity, unit_price_cents, total_price_cents";

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_unique";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_images(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ProductImage>>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, url, is_primary, display_order
            FROM product_images
            WHERE product_id = ANY($1) AND deleted_at IS NULL
            ORDER BY display_order ASC, id ASC
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut images: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        for row in rows {
            images
                .entry(row.try_get("product_id")?)
                .or_default()
                .push(ProductImage {
                    url: row.try_get("url")?,
                    is_primary: row.try_get("is_primary")?,
                    display_order: row.try_get("display_order")?,
                });
        }
        Ok(images)
    }

    async fn touch_cart(&self, cart_id: CartId) -> Result<()> {
        sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::CorruptRow(format!("{column} = {value}")))
}

fn to_i32(value: u32, column: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    Ok(Money::from_cents(row.try_get::<i64, _>(column)?))
}

fn tombstone(row: &PgRow, at: &str, by: &str) -> Result<Tombstone> {
    Ok(Tombstone {
        deleted_at: row.try_get::<Option<DateTime<Utc>>, _>(at)?,
        deleted_by: row.try_get::<Option<Uuid>, _>(by)?.map(UserId::from_uuid),
    })
}

fn row_to_address(row: PgRow) -> Result<AddressRecord> {
    Ok(AddressRecord {
        id: AddressId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        is_default: row.try_get("is_default")?,
        tombstone: tombstone(&row, "deleted_at", "deleted_by")?,
    })
}

fn row_to_cart(row: PgRow) -> Result<CartRecord> {
    Ok(CartRecord {
        id: CartId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        status: row.try_get::<String, _>("status")?.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tombstone: tombstone(&row, "deleted_at", "deleted_by")?,
    })
}

fn row_to_cart_item(row: PgRow) -> Result<CartItemRecord> {
    Ok(CartItemRecord {
        id: CartItemId::from_uuid(row.try_get("id")?),
        cart_id: CartId::from_uuid(row.try_get("cart_id")?),
        variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        price: money(&row, "price_cents")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tombstone: tombstone(&row, "deleted_at", "deleted_by")?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        address_id: AddressId::from_uuid(row.try_get("address_id")?),
        order_number: OrderNumber::from_raw(row.try_get::<String, _>("order_number")?),
        order_date: row.try_get("order_date")?,
        total_amount: money(&row, "total_amount_cents")?,
        tax_amount: money(&row, "tax_amount_cents")?,
        shipping_amount: money(&row, "shipping_amount_cents")?,
        discount_amount: money(&row, "discount_amount_cents")?,
        payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
        fulfillment_status: row.try_get::<String, _>("fulfillment_status")?.parse()?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tombstone: tombstone(&row, "deleted_at", "deleted_by")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: money(&row, "unit_price_cents")?,
        total_price: money(&row, "total_price_cents")?,
    })
}

fn row_to_catalog_variant(row: &PgRow) -> Result<CatalogVariant> {
    let product_id = ProductId::from_uuid(row.try_get("product_id")?);
    Ok(CatalogVariant {
        variant: VariantRecord {
            id: VariantId::from_uuid(row.try_get("id")?),
            product_id,
            size: row.try_get("size")?,
            color: row.try_get("color")?,
            sku: row.try_get("sku")?,
            additional_price: money(row, "additional_price_cents")?,
            stock_quantity: to_u32(row.try_get("stock_quantity")?, "stock_quantity")?,
            tombstone: tombstone(row, "variant_deleted_at", "variant_deleted_by")?,
        },
        product: ProductRecord {
            id: product_id,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: money(row, "price_cents")?,
            discount_price: row
                .try_get::<Option<i64>, _>("discount_price_cents")?
                .map(Money::from_cents),
            is_active: row.try_get("is_active")?,
            images: Vec::new(),
            tombstone: tombstone(row, "product_deleted_at", "product_deleted_by")?,
        },
    })
}

/// Non-deleted items of a cart, oldest first.
async fn fetch_cart_items<'e>(
    executor: impl PgExecutor<'e>,
    cart_id: CartId,
) -> Result<Vec<CartItemRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {CART_ITEM_COLUMNS} FROM cart_items \
         WHERE cart_id = $1 AND deleted_at IS NULL \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(cart_id.as_uuid())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(row_to_cart_item).collect()
}

fn order_filters(query: &OrderQuery) -> String {
    let mut sql = String::from(" WHERE deleted_at IS NULL");
    let mut param_count = 0;

    if query.user_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND user_id = ${param_count}"));
    }
    if query.payment_status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND payment_status = ${param_count}"));
    }
    if query.fulfillment_status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND fulfillment_status = ${param_count}"));
    }
    sql
}

fn bind_filters<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    query: &OrderQuery,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(user_id) = query.user_id {
        q = q.bind(user_id.as_uuid());
    }
    if let Some(status) = query.payment_status {
        q = q.bind(status.as_str());
    }
    if let Some(status) = query.fulfillment_status {
        q = q.bind(status.as_str());
    }
    q
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn find_variant(&self, variant_id: VariantId) -> Result<Option<CatalogVariant>> {
        Ok(self.find_variants(&[variant_id]).await?.into_iter().next())
    }

    async fn find_variants(&self, variant_ids: &[VariantId]) -> Result<Vec<CatalogVariant>> {
        if variant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = variant_ids.iter().map(|id| id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT v.id, v.product_id, v.size, v.color, v.sku, v.additional_price_cents,
                   v.stock_quantity, v.deleted_at AS variant_deleted_at,
                   v.deleted_by AS variant_deleted_by,
                   p.name, p.description, p.price_cents, p.discount_price_cents, p.is_active,
                   p.deleted_at AS product_deleted_at, p.deleted_by AS product_deleted_by
            FROM product_variants v
            JOIN products p ON p.id = v.product_id
            WHERE v.id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut found: HashMap<VariantId, CatalogVariant> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let entry = row_to_catalog_variant(row)?;
            found.insert(entry.variant.id, entry);
        }

        let product_ids: Vec<Uuid> = found
            .values()
            .map(|entry| entry.product.id.as_uuid())
            .collect();
        let images = self.load_images(&product_ids).await?;
        for entry in found.values_mut() {
            if let Some(list) = images.get(&entry.product.id.as_uuid()) {
                entry.product.images = list.clone();
            }
        }

        // Preserve the caller's ordering.
        Ok(variant_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn find_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(address_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_address).transpose()
    }

    async fn find_default_address(&self, user_id: UserId) -> Result<Option<AddressRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses \
             WHERE user_id = $1 AND is_default AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_address).transpose()
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(address_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_address).transpose()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts \
             WHERE user_id = $1 AND status = 'active' AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_cart).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_or_create_active_cart(&self, user_id: UserId) -> Result<CartRecord> {
        // The partial unique index allows at most one active cart per user, so
        // a racing insert becomes a no-op and both callers read the winner.
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, status)
            VALUES ($1, $2, 'active')
            ON CONFLICT (user_id) WHERE status = 'active' AND deleted_at IS NULL
            DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        self.find_active_cart(user_id).await?.ok_or_else(|| {
            StoreError::CorruptRow(format!("active cart for user {user_id} vanished"))
        })
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(cart_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_cart).transpose()
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemRecord>> {
        fetch_cart_items(&self.pool, cart_id).await
    }

    async fn find_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items \
             WHERE id = $1 AND cart_id = $2 AND deleted_at IS NULL"
        ))
        .bind(item_id.as_uuid())
        .bind(cart_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_cart_item).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: u32,
        price: Money,
    ) -> Result<CartItemRecord> {
        let mut tx = self.pool.begin().await?;

        // Locks the cart row so a concurrent checkout either sees this item or
        // finalizes the cart first.
        let touched = sqlx::query(
            r#"
            UPDATE carts SET updated_at = now()
            WHERE id = $1 AND status = 'active' AND deleted_at IS NULL
            "#,
        )
        .bind(cart_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        if touched.rows_affected() == 0 {
            return Err(StoreError::CartNotActive(cart_id));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO cart_items (id, cart_id, variant_id, quantity, price_cents) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (cart_id, variant_id) WHERE deleted_at IS NULL \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, \
                           price_cents = EXCLUDED.price_cents, \
                           updated_at = now() \
             RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(cart_id.as_uuid())
        .bind(variant_id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .bind(price.cents())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row_to_cart_item(row)
    }

    async fn set_cart_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItemRecord> {
        let row = sqlx::query(&format!(
            "UPDATE cart_items SET quantity = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(item_id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::CartItemNotFound(item_id))?;

        let item = row_to_cart_item(row)?;
        self.touch_cart(item.cart_id).await?;
        Ok(item)
    }

    async fn remove_cart_item(&self, item_id: CartItemId, deleted_by: UserId) -> Result<()> {
        let cart_id: Uuid = sqlx::query_scalar(
            r#"
            UPDATE cart_items SET deleted_at = now(), deleted_by = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING cart_id
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(deleted_by.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::CartItemNotFound(item_id))?;

        self.touch_cart(CartId::from_uuid(cart_id)).await
    }

    async fn clear_cart(&self, cart_id: CartId, deleted_by: UserId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET deleted_at = now(), deleted_by = $2
            WHERE cart_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(deleted_by.as_uuid())
        .execute(&self.pool)
        .await?;

        self.touch_cart(cart_id).await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn sweep_stale_carts(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE carts SET deleted_at = now()
            WHERE status = 'active' AND deleted_at IS NULL AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items \
             WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order_item).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage> {
        let filters = order_filters(&query);

        let count_sql = format!("SELECT COUNT(*) AS total FROM orders{filters}");
        let total: i64 = bind_filters(sqlx::query(&count_sql), &query)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let select_sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders{filters} \
             ORDER BY order_date DESC, order_number DESC \
             LIMIT {} OFFSET {}",
            query.limit,
            query.offset()
        );
        let rows = bind_filters(sqlx::query(&select_sql), &query)
            .fetch_all(&self.pool)
            .await?;

        let orders = rows
            .into_iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            total: u64::try_from(total).unwrap_or(0),
            page: query.page,
            limit: query.limit,
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn decrement_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32> {
        let requested = to_i32(quantity, "stock_quantity")?;
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE product_variants
            SET stock_quantity = stock_quantity - $2, updated_at = now()
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING stock_quantity
            "#,
        )
        .bind(variant_id.as_uuid())
        .bind(requested)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return to_u32(remaining, "stock_quantity");
        }

        let row = sqlx::query("SELECT sku, stock_quantity FROM product_variants WHERE id = $1")
            .bind(variant_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(StoreError::VariantNotFound(variant_id))?;

        Err(StoreError::InsufficientStock {
            variant_id,
            sku: row.try_get("sku")?,
            available: to_u32(row.try_get("stock_quantity")?, "stock_quantity")?,
            requested: quantity,
        })
    }

    async fn increment_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32> {
        let level: i32 = sqlx::query_scalar(
            r#"
            UPDATE product_variants
            SET stock_quantity = stock_quantity + $2, updated_at = now()
            WHERE id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(variant_id.as_uuid())
        .bind(to_i32(quantity, "stock_quantity")?)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::VariantNotFound(variant_id))?;

        to_u32(level, "stock_quantity")
    }

    async fn next_order_sequence(&mut self, period: SequencePeriod) -> Result<u32> {
        let value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (period, last_value)
            VALUES ($1, 1)
            ON CONFLICT (period) DO UPDATE SET last_value = order_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(period)
        .fetch_one(&mut *self.tx)
        .await?;

        to_u32(value, "last_value")
    }

    async fn complete_cart(&mut self, cart_id: CartId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE carts SET status = 'completed', updated_at = now()
            WHERE id = $1 AND status = 'active' AND deleted_at IS NULL
            "#,
        )
        .bind(cart_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartNotActive(cart_id));
        }
        Ok(())
    }

    async fn list_cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItemRecord>> {
        fetch_cart_items(&mut *self.tx, cart_id).await
    }

    async fn soft_delete_cart_items(
        &mut self,
        cart_id: CartId,
        deleted_by: Option<UserId>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET deleted_at = now(), deleted_by = $2
            WHERE cart_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(deleted_by.map(|id| id.as_uuid()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (id, user_id, address_id, order_number, order_date, \
                 total_amount_cents, tax_amount_cents, shipping_amount_cents, \
                 discount_amount_cents, payment_status, fulfillment_status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(order.user_id.as_uuid())
        .bind(order.address_id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.order_date)
        .bind(order.total_amount.cents())
        .bind(order.tax_amount.cents())
        .bind(order.shipping_amount.cents())
        .bind(order.discount_amount.cents())
        .bind(PaymentStatus::Pending.as_str())
        .bind(FulfillmentStatus::Pending.as_str())
        .bind(&order.notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT)
            {
                return StoreError::DuplicateOrderNumber(order.order_number.clone());
            }
            StoreError::Database(e)
        })?;

        row_to_order(row)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO order_items (id, order_id, variant_id, quantity, \
                 unit_price_cents, total_price_cents) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {ORDER_ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(item.order_id.as_uuid())
        .bind(item.variant_id.as_uuid())
        .bind(to_i32(item.quantity, "quantity")?)
        .bind(item.unit_price.cents())
        .bind(item.total_price.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order_item(row)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn set_order_status(
        &mut self,
        order_id: OrderId,
        payment_status: PaymentStatus,
        fulfillment_status: FulfillmentStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders \
             SET payment_status = $2, fulfillment_status = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(payment_status.as_str())
        .bind(fulfillment_status.as_str())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use std::collections::HashMap;

use crate::entities::{
    product::{self, Entity as Product},
    product_image::{self, Entity as ProductImage},
};
use crate::repository::Page;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AdminProductFilter {
    pub base: ProductFilter,
    pub is_active: Option<bool>,
    pub include_deleted: bool,
}

/// Already-normalized column values for an insert or full update.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductRecord {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: String,
    pub quantity: i32,
    pub thumbnail_url: Option<String>,
    pub is_active: bool,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn public_only(query: Select<Product>) -> Select<Product> {
    query
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::DeletedAt.is_null())
}

fn apply_filter(mut query: Select<Product>, filter: &ProductFilter) -> Select<Product> {
    if let Some(category) = non_blank(&filter.category) {
        query = query.filter(product::Column::Category.eq(category));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(product::Column::Price.lte(max));
    }
    if let Some(search) = non_blank(&filter.search) {
        let pattern = format!("%{}%", search.to_lowercase());
        query = query.filter(
            Expr::expr(Func::lower(Expr::col((Product, product::Column::Name)))).like(pattern),
        );
    }
    query
}

async fn paginate<C: ConnectionTrait>(
    db: &C,
    query: Select<Product>,
    page: Page,
) -> Result<(Vec<product::Model>, u64), DbErr> {
    let paginator = query
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .paginate(db, page.page_size);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.index()).await?;
    Ok((items, total))
}

pub async fn list_public<C: ConnectionTrait>(
    db: &C,
    filter: &ProductFilter,
    page: Page,
) -> Result<(Vec<product::Model>, u64), DbErr> {
    let query = apply_filter(public_only(Product::find()), filter);
    paginate(db, query, page).await
}

pub async fn list_admin<C: ConnectionTrait>(
    db: &C,
    filter: &AdminProductFilter,
    page: Page,
) -> Result<(Vec<product::Model>, u64), DbErr> {
    let mut query = apply_filter(Product::find(), &filter.base);
    if !filter.include_deleted {
        query = query.filter(product::Column::DeletedAt.is_null());
    }
    if let Some(is_active) = filter.is_active {
        query = query.filter(product::Column::IsActive.eq(is_active));
    }
    paginate(db, query, page).await
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<product::Model>, DbErr> {
    Product::find_by_id(id).one(db).await
}

pub async fn find_public_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<Option<product::Model>, DbErr> {
    public_only(Product::find())
        .filter(product::Column::Slug.eq(slug))
        .one(db)
        .await
}

/// Looks at every product, soft-deleted ones included.
pub async fn find_by_slug_any<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<Option<product::Model>, DbErr> {
    Product::find()
        .filter(product::Column::Slug.eq(slug))
        .one(db)
        .await
}

/// Purchasable products (active, not deleted) among `ids`.
pub async fn find_active_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<Vec<product::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    public_only(Product::find())
        .filter(product::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await
}

pub async fn images_for<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
) -> Result<Vec<product_image::Model>, DbErr> {
    ProductImage::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .order_by_asc(product_image::Column::Position)
        .order_by_asc(product_image::Column::Id)
        .all(db)
        .await
}

/// Images grouped by product id, each list ordered by position.
pub async fn images_for_many<C: ConnectionTrait>(
    db: &C,
    product_ids: &[i32],
) -> Result<HashMap<i32, Vec<product_image::Model>>, DbErr> {
    let mut grouped: HashMap<i32, Vec<product_image::Model>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(grouped);
    }
    let images = ProductImage::find()
        .filter(product_image::Column::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(product_image::Column::ProductId)
        .order_by_asc(product_image::Column::Position)
        .order_by_asc(product_image::Column::Id)
        .all(db)
        .await?;
    for image in images {
        grouped.entry(image.product_id).or_default().push(image);
    }
    Ok(grouped)
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    record: ProductRecord,
) -> Result<product::Model, DbErr> {
    product::ActiveModel {
        slug: Set(record.slug),
        name: Set(record.name),
        description: Set(record.description),
        price: Set(record.price),
        category: Set(record.category),
        quantity: Set(record.quantity),
        thumbnail_url: Set(record.thumbnail_url),
        is_active: Set(record.is_active),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    current: product::Model,
    record: ProductRecord,
) -> Result<product::Model, DbErr> {
    let mut product: product::ActiveModel = current.into();
    product.slug = Set(record.slug);
    product.name = Set(record.name);
    product.description = Set(record.description);
    product.price = Set(record.price);
    product.category = Set(record.category);
    product.quantity = Set(record.quantity);
    product.thumbnail_url = Set(record.thumbnail_url);
    product.is_active = Set(record.is_active);
    product.update(db).await
}

/// Drops the current image list and writes `urls` at positions `0..n`.
pub async fn replace_images<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    urls: &[String],
) -> Result<(), DbErr> {
    ProductImage::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    if urls.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let images = urls
        .iter()
        .enumerate()
        .map(|(position, url)| product_image::ActiveModel {
            product_id: Set(product_id),
            url: Set(url.clone()),
            position: Set(position as i32),
            created_at: Set(now),
            ..Default::default()
        });
    ProductImage::insert_many(images).exec(db).await?;
    Ok(())
}

pub async fn set_active<C: ConnectionTrait>(
    db: &C,
    current: product::Model,
    is_active: bool,
) -> Result<product::Model, DbErr> {
    if current.is_active == is_active {
        return Ok(current);
    }
    let mut product: product::ActiveModel = current.into();
    product.is_active = Set(is_active);
    product.update(db).await
}

/// Stamps `deleted_at` unless it is already set.
pub async fn soft_delete<C: ConnectionTrait>(
    db: &C,
    current: product::Model,
) -> Result<product::Model, DbErr> {
    if current.deleted_at.is_some() {
        return Ok(current);
    }
    let mut product: product::ActiveModel = current.into();
    product.deleted_at = Set(Some(Utc::now()));
    product.update(db).await
}

/// Takes `quantity` units if the product is still purchasable and has enough
/// stock. Returns false when nothing was taken.
pub async fn decrement_stock<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    quantity: i32,
) -> Result<bool, DbErr> {
    let result = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Quantity.gte(quantity))
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::DeletedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Gives `quantity` units back regardless of the product's visibility.
pub async fn restore_stock<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    quantity: i32,
) -> Result<bool, DbErr> {
    let result = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

use sea_orm::{DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{product, product_image};
use crate::error::AppError;
use crate::repository::{
    products::{self as repo, AdminProductFilter, ProductFilter, ProductRecord},
    Page,
};

/// A product together with its ordered image list.
#[derive(Clone, Debug)]
pub struct ProductDetails {
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
}

#[derive(Clone, Debug)]
pub struct ProductInput {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: Option<String>,
    pub quantity: i32,
    pub thumbnail_url: String,
    pub is_active: bool,
    pub images: Vec<String>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> ProductService {
        ProductService { db }
    }

    pub async fn list_public(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<(Vec<ProductDetails>, u64), AppError> {
        let (products, total) = repo::list_public(&*self.db, filter, page).await?;
        Ok((self.attach_images(products).await?, total))
    }

    pub async fn get_public_by_slug(&self, slug: &str) -> Result<ProductDetails, AppError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(AppError::ProductNotFound(json!({ "slug": slug })));
        }
        let product = repo::find_public_by_slug(&*self.db, slug)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(json!({ "slug": slug })))?;
        self.with_images(product).await
    }

    pub async fn list_admin(
        &self,
        filter: &AdminProductFilter,
        page: Page,
    ) -> Result<(Vec<ProductDetails>, u64), AppError> {
        let (products, total) = repo::list_admin(&*self.db, filter, page).await?;
        Ok((self.attach_images(products).await?, total))
    }

    pub async fn get_by_id(&self, product_id: i32) -> Result<ProductDetails, AppError> {
        let product = self.find(product_id).await?;
        self.with_images(product).await
    }

    pub async fn create(&self, input: ProductInput) -> Result<ProductDetails, AppError> {
        let (record, images) = normalize(input)?;

        let txn = self.db.begin().await?;
        let result = async {
            if repo::find_by_slug_any(&txn, &record.slug).await?.is_some() {
                return Err(AppError::SlugConflict { slug: record.slug });
            }
            let slug = record.slug.clone();
            let product = repo::insert(&txn, record)
                .await
                .map_err(|err| slug_conflict_or(err, &slug))?;
            repo::replace_images(&txn, product.id, &images).await?;
            Ok::<_, AppError>(product)
        }
        .await;

        let product = match result {
            Ok(product) => {
                txn.commit().await?;
                product
            }
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err);
            }
        };

        tracing::info!(product_id = product.id, slug = %product.slug, "Product created");
        self.with_images(product).await
    }

    /// Replaces every field and the whole image list.
    pub async fn update(
        &self,
        product_id: i32,
        input: ProductInput,
    ) -> Result<ProductDetails, AppError> {
        let (record, images) = normalize(input)?;

        let txn = self.db.begin().await?;
        let result = async {
            let current = repo::find_by_id(&txn, product_id)
                .await?
                .ok_or_else(|| AppError::ProductNotFound(json!({ "product_id": product_id })))?;

            if record.slug != current.slug {
                if let Some(existing) = repo::find_by_slug_any(&txn, &record.slug).await? {
                    if existing.id != current.id {
                        return Err(AppError::SlugConflict { slug: record.slug });
                    }
                }
            }

            let slug = record.slug.clone();
            let product = repo::update(&txn, current, record)
                .await
                .map_err(|err| slug_conflict_or(err, &slug))?;
            repo::replace_images(&txn, product.id, &images).await?;
            Ok::<_, AppError>(product)
        }
        .await;

        let product = match result {
            Ok(product) => {
                txn.commit().await?;
                product
            }
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err);
            }
        };

        tracing::info!(product_id = product.id, "Product updated");
        self.with_images(product).await
    }

    pub async fn activate(&self, product_id: i32) -> Result<ProductDetails, AppError> {
        let current = self.find(product_id).await?;
        let product = repo::set_active(&*self.db, current, true).await?;
        self.with_images(product).await
    }

    pub async fn deactivate(&self, product_id: i32) -> Result<ProductDetails, AppError> {
        let current = self.find(product_id).await?;
        let product = repo::set_active(&*self.db, current, false).await?;
        self.with_images(product).await
    }

    /// Idempotent: an already deleted product is returned untouched.
    pub async fn soft_delete(&self, product_id: i32) -> Result<ProductDetails, AppError> {
        let current = self.find(product_id).await?;
        let product = repo::soft_delete(&*self.db, current).await?;
        self.with_images(product).await
    }

    async fn find(&self, product_id: i32) -> Result<product::Model, AppError> {
        repo::find_by_id(&*self.db, product_id)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(json!({ "product_id": product_id })))
    }

    async fn with_images(&self, product: product::Model) -> Result<ProductDetails, AppError> {
        let images = repo::images_for(&*self.db, product.id).await?;
        Ok(ProductDetails { product, images })
    }

    async fn attach_images(
        &self,
        products: Vec<product::Model>,
    ) -> Result<Vec<ProductDetails>, AppError> {
        let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
        let mut images = repo::images_for_many(&*self.db, &ids).await?;
        Ok(products
            .into_iter()
            .map(|product| ProductDetails {
                images: images.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }
}

fn slug_conflict_or(err: DbErr, slug: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::SlugConflict {
            slug: slug.to_string(),
        },
        _ => AppError::Database(err),
    }
}

fn normalize(input: ProductInput) -> Result<(ProductRecord, Vec<String>), AppError> {
    let slug = input.slug.trim().to_string();
    if slug.is_empty() {
        return Err(AppError::validation("Slug is required.", json!({ "slug": slug })));
    }
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Name is required.", json!({ "name": name })));
    }
    if input.price < 0 {
        return Err(AppError::validation(
            "Price must be non-negative.",
            json!({ "price": input.price }),
        ));
    }
    if input.quantity < 0 {
        return Err(AppError::validation(
            "Quantity must be non-negative.",
            json!({ "quantity": input.quantity }),
        ));
    }
    let thumbnail_url = input.thumbnail_url.trim().to_string();
    if thumbnail_url.is_empty() {
        return Err(AppError::validation(
            "Thumbnail URL is required.",
            json!({ "thumbnail_url": thumbnail_url }),
        ));
    }

    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("uncategorized")
        .to_string();
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let mut seen = HashSet::new();
    let images = input
        .images
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty() && seen.insert(url.to_string()))
        .map(str::to_string)
        .collect();

    let record = ProductRecord {
        slug,
        name,
        description,
        price: input.price,
        category,
        quantity: input.quantity,
        thumbnail_url: Some(thumbnail_url),
        is_active: input.is_active,
    };
    Ok((record, images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::memory_db;

    fn input(slug: &str) -> ProductInput {
        ProductInput {
            slug: slug.to_string(),
            name: format!("Product {slug}"),
            description: None,
            price: 1000,
            category: Some("oils".to_string()),
            quantity: 5,
            thumbnail_url: "https://img.example/thumb.webp".to_string(),
            is_active: true,
            images: vec![],
        }
    }

    fn slugs(items: &[ProductDetails]) -> Vec<&str> {
        items.iter().map(|p| p.product.slug.as_str()).collect()
    }

    async fn service() -> ProductService {
        ProductService::new(Arc::new(memory_db().await))
    }

    #[tokio::test]
    async fn create_normalizes_fields() {
        let service = service().await;
        let created = service
            .create(ProductInput {
                slug: "  argan-oil ".into(),
                name: " Argan oil ".into(),
                description: Some("   ".into()),
                category: Some("  ".into()),
                images: vec![
                    " https://img.example/a.webp ".into(),
                    "".into(),
                    "https://img.example/b.webp".into(),
                    "https://img.example/a.webp".into(),
                ],
                ..input("x")
            })
            .await
            .unwrap();

        assert_eq!(created.product.slug, "argan-oil");
        assert_eq!(created.product.name, "Argan oil");
        assert_eq!(created.product.description, None);
        assert_eq!(created.product.category, "uncategorized");
        let urls: Vec<(&str, i32)> = created
            .images
            .iter()
            .map(|i| (i.url.as_str(), i.position))
            .collect();
        assert_eq!(
            urls,
            vec![("https://img.example/a.webp", 0), ("https://img.example/b.webp", 1)]
        );
    }

    #[tokio::test]
    async fn blank_slug_is_a_validation_error() {
        let service = service().await;
        let err = service.create(input("   ")).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.to_string(), "Slug is required.");
    }

    #[tokio::test]
    async fn slug_conflict_includes_soft_deleted_products() {
        let service = service().await;
        let first = service.create(input("p-1")).await.unwrap();
        service.soft_delete(first.product.id).await.unwrap();

        let err = service.create(input("p-1")).await.unwrap_err();
        assert!(matches!(err, AppError::SlugConflict { ref slug } if slug == "p-1"));
    }

    #[tokio::test]
    async fn update_replaces_images_and_checks_slug_owner() {
        let service = service().await;
        let a = service
            .create(ProductInput {
                images: vec!["https://img.example/1.webp".into()],
                ..input("a")
            })
            .await
            .unwrap();
        service.create(input("b")).await.unwrap();

        let err = service.update(a.product.id, input("b")).await.unwrap_err();
        assert_eq!(err.code(), "product_slug_conflict");

        let updated = service
            .update(
                a.product.id,
                ProductInput {
                    price: 2500,
                    images: vec![
                        "https://img.example/2.webp".into(),
                        "https://img.example/3.webp".into(),
                    ],
                    ..input("a")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.product.price, 2500);
        let urls: Vec<&str> = updated.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://img.example/2.webp", "https://img.example/3.webp"]);
    }

    #[tokio::test]
    async fn update_of_missing_product_is_not_found() {
        let service = service().await;
        let err = service.update(42, input("nope")).await.unwrap_err();
        assert_eq!(err.code(), "product_not_found");
    }

    #[tokio::test]
    async fn public_listing_hides_inactive_and_deleted() {
        let service = service().await;
        let visible = service.create(input("visible")).await.unwrap();
        let hidden = service.create(input("hidden")).await.unwrap();
        let deleted = service.create(input("deleted")).await.unwrap();
        service.deactivate(hidden.product.id).await.unwrap();
        service.soft_delete(deleted.product.id).await.unwrap();

        let page = Page::new(None, None, 10);
        let (items, total) = service
            .list_public(&ProductFilter::default(), page)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].product.id, visible.product.id);
        for item in &items {
            assert!(item.product.is_active);
            assert!(item.product.deleted_at.is_none());
        }

        let (items, total) = service
            .list_admin(&AdminProductFilter::default(), page)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert!(items.iter().all(|i| i.product.deleted_at.is_none()));

        let (_, total) = service
            .list_admin(
                &AdminProductFilter {
                    include_deleted: true,
                    ..Default::default()
                },
                page,
            )
            .await
            .unwrap();
        assert_eq!(total, 3);

        let (items, _) = service
            .list_admin(
                &AdminProductFilter {
                    is_active: Some(false),
                    ..Default::default()
                },
                page,
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.id, hidden.product.id);
    }

    #[tokio::test]
    async fn public_listing_filters_by_price_category_and_name() {
        let service = service().await;
        service
            .create(ProductInput {
                name: "Black Seed Oil".into(),
                price: 500,
                ..input("black-seed")
            })
            .await
            .unwrap();
        service
            .create(ProductInput {
                name: "Rose Water".into(),
                price: 1500,
                category: Some("waters".into()),
                ..input("rose-water")
            })
            .await
            .unwrap();

        let page = Page::new(None, None, 10);
        let by_name = ProductFilter {
            search: Some("seed".into()),
            ..Default::default()
        };
        let (items, _) = service.list_public(&by_name, page).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.slug, "black-seed");

        let by_price = ProductFilter {
            min_price: Some(1000),
            max_price: Some(1500),
            ..Default::default()
        };
        let (items, _) = service.list_public(&by_price, page).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.slug, "rose-water");

        let by_category = ProductFilter {
            category: Some("oils".into()),
            ..Default::default()
        };
        let (_, total) = service.list_public(&by_category, page).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_paged() {
        let service = service().await;
        for slug in ["first", "second", "third"] {
            service.create(input(slug)).await.unwrap();
        }

        let all = ProductFilter::default();
        let (items, total) = service
            .list_public(&all, Page::new(None, None, 10))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(slugs(&items), ["third", "second", "first"]);

        let (items, total) = service
            .list_public(&all, Page::new(Some(2), Some(1), 10))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(slugs(&items), ["second"]);

        let (items, _) = service
            .list_admin(&AdminProductFilter::default(), Page::new(Some(3), Some(1), 10))
            .await
            .unwrap();
        assert_eq!(slugs(&items), ["first"]);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let service = service().await;
        service.create(input("only")).await.unwrap();

        let page = Page::new(Some(i64::MAX), Some(100), 10);
        let (items, total) = service
            .list_public(&ProductFilter::default(), page)
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 1);

        let (items, _) = service
            .list_admin(&AdminProductFilter::default(), page)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn get_by_slug_respects_visibility() {
        let service = service().await;
        let created = service.create(input("p-1")).await.unwrap();
        assert_eq!(
            service.get_public_by_slug(" p-1 ").await.unwrap().product.id,
            created.product.id
        );

        service.deactivate(created.product.id).await.unwrap();
        let err = service.get_public_by_slug("p-1").await.unwrap_err();
        assert_eq!(err.code(), "product_not_found");

        // Admin view still sees it.
        assert!(service.get_by_id(created.product.id).await.is_ok());
        assert_eq!(
            service.get_public_by_slug("  ").await.unwrap_err().code(),
            "product_not_found"
        );
    }

    #[tokio::test]
    async fn activation_and_soft_delete_are_idempotent() {
        let service = service().await;
        let created = service.create(input("p-1")).await.unwrap();

        let first = service.soft_delete(created.product.id).await.unwrap();
        let second = service.soft_delete(created.product.id).await.unwrap();
        assert!(first.product.deleted_at.is_some());
        assert_eq!(first.product.deleted_at, second.product.deleted_at);

        service.activate(created.product.id).await.unwrap();
        let active = service.activate(created.product.id).await.unwrap();
        assert!(active.product.is_active);

        let inactive = service.deactivate(created.product.id).await.unwrap();
        assert!(!inactive.product.is_active);
        assert_eq!(
            service.activate(999).await.unwrap_err().code(),
            "product_not_found"
        );
    }
}

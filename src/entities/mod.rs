pub mod order;
pub mod order_item;
pub mod product;
pub mod product_image;

use sea_orm::sea_query::{Expr, Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::entities::{
    order::Entity as Order, order_item::Entity as OrderItem, product::Entity as Product,
    product_image::Entity as ProductImage,
};

/// Creates every table and index that does not exist yet. Safe to run on
/// every start.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut products = schema.create_table_from_entity(Product);
    products
        .check(Expr::col(product::Column::Price).gte(0))
        .check(Expr::col(product::Column::Quantity).gte(0));

    let mut orders = schema.create_table_from_entity(Order);
    orders
        .check(Expr::col(order::Column::ItemsSubtotal).gte(0))
        .check(Expr::col(order::Column::DeliveryFee).gte(0))
        .check(Expr::col(order::Column::TotalAmount).gte(0));

    let mut order_items = schema.create_table_from_entity(OrderItem);
    order_items
        .check(Expr::col(order_item::Column::UnitPrice).gte(0))
        .check(Expr::col(order_item::Column::Quantity).gte(1))
        .check(Expr::col(order_item::Column::LineTotal).gte(0));

    // Parents before children so foreign keys resolve.
    let tables: [TableCreateStatement; 4] = [
        products,
        schema.create_table_from_entity(ProductImage),
        orders,
        order_items,
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let mut indexes: Vec<IndexCreateStatement> = Vec::new();
    indexes.extend(schema.create_index_from_entity(Product));
    indexes.extend(schema.create_index_from_entity(ProductImage));
    indexes.extend(schema.create_index_from_entity(Order));
    indexes.extend(schema.create_index_from_entity(OrderItem));
    indexes.push(
        Index::create()
            .name("uq_product_images_product_id_url")
            .table(ProductImage)
            .col(product_image::Column::ProductId)
            .col(product_image::Column::Url)
            .unique()
            .to_owned(),
    );
    for mut index in indexes {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    tracing::info!("Database schema is up to date");
    Ok(())
}

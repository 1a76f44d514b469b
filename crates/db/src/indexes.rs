use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{Lead, Notification, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index(bson::doc! { "role": 1 }),
        ],
    )
    .await?;

    // Leads
    create_indexes(
        db,
        Lead::COLLECTION,
        vec![
            index(bson::doc! { "assignedTo": 1, "createdAt": -1 }),
            index(bson::doc! { "status": 1, "createdAt": -1 }),
            index(bson::doc! { "createdBy": 1 }),
        ],
    )
    .await?;

    // Notifications
    create_indexes(
        db,
        Notification::COLLECTION,
        vec![
            index(bson::doc! { "recipient": 1, "read": 1 }),
            index(bson::doc! { "recipient": 1, "createdAt": -1 }),
            index(bson::doc! { "relatedLead": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}

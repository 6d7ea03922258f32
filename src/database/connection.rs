use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client, Database, IndexModel,
};

use crate::config::AppConfig;
use crate::errors::Result;

pub async fn get_db_client(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.database_url).await?;
    let db = client.database(&config.database_name);

    db.run_command(doc! { "ping": 1 }).await?;
    println!("✅ Connected to database: {}", config.database_name);

    ensure_indexes(&db).await?;
    Ok(db)
}

async fn ensure_indexes(db: &Database) -> Result<()> {
    let lookup = |field: &str| {
        let mut keys = Document::new();
        keys.insert(field, 1);
        IndexModel::builder().keys(keys).build()
    };

    for collection in ["users", "partners"] {
        db.collection::<Document>(collection)
            .create_indexes([lookup("phone"), lookup("email")])
            .await?;
    }

    let garage_id = IndexModel::builder()
        .keys(doc! { "garageId": 1 })
        .options(IndexOptions::builder().unique(true).sparse(true).build())
        .build();
    db.collection::<Document>("partners")
        .create_index(garage_id)
        .await?;

    db.collection::<Document>("leads")
        .create_indexes([lookup("garageId"), lookup("userPhone")])
        .await?;

    db.collection::<Document>("reviews")
        .create_index(lookup("garageId"))
        .await?;

    db.collection::<Document>("quickreviews")
        .create_index(lookup("garageId"))
        .await?;

    println!("📂 Indexes ensured on users, partners, leads, reviews, quickreviews");
    Ok(())
}

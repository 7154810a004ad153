use super::*;
use shared::domain::{parse_price, PerfumeForm};

fn sample(name: &str, price: &str) -> NewPerfume {
    PerfumeForm {
        name: name.to_string(),
        brand: "Dior".to_string(),
        kind: "Eau de Parfum".to_string(),
        gender: "Unisex".to_string(),
        volume_ml: "100".to_string(),
        price: price.to_string(),
    }
    .into_new_perfume()
    .expect("valid perfume")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("perfume_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("perfumes.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn inserts_and_finds_perfume() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_perfume(&sample("Sauvage", "89.9"))
        .await
        .expect("insert");
    assert!(id.0 > 0);

    let perfume = storage
        .find_perfume(id)
        .await
        .expect("find")
        .expect("row exists");
    assert_eq!(perfume.name, "Sauvage");
    assert_eq!(perfume.kind.as_deref(), Some("Eau de Parfum"));
    assert_eq!(perfume.volume_ml, Some(100));
    assert_eq!(perfume.price.to_string(), "89.90");
}

#[tokio::test]
async fn optional_columns_round_trip_as_null() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let new = NewPerfume {
        kind: None,
        gender: None,
        volume_ml: None,
        ..sample("Bare", "1")
    };
    let id = storage.insert_perfume(&new).await.expect("insert");
    let perfume = storage.find_perfume(id).await.expect("find").expect("row");
    assert_eq!(perfume.kind, None);
    assert_eq!(perfume.gender, None);
    assert_eq!(perfume.volume_ml, None);
}

#[tokio::test]
async fn lists_perfumes_in_id_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.list_perfumes().await.expect("list").is_empty());

    let first = storage
        .insert_perfume(&sample("First", "10"))
        .await
        .expect("first");
    let second = storage
        .insert_perfume(&sample("Second", "20"))
        .await
        .expect("second");

    let ids: Vec<_> = storage
        .list_perfumes()
        .await
        .expect("list")
        .into_iter()
        .map(|perfume| perfume.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn update_overwrites_every_field() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_perfume(&sample("Old", "10"))
        .await
        .expect("insert");

    let replacement = NewPerfume {
        name: "New".to_string(),
        brand: "Chanel".to_string(),
        kind: None,
        gender: Some("Femenino".to_string()),
        volume_ml: Some(50),
        price: parse_price("135.5").expect("price"),
    };
    assert!(storage
        .update_perfume(id, &replacement)
        .await
        .expect("update"));

    let stored = storage.find_perfume(id).await.expect("find").expect("row");
    assert_eq!(stored, Perfume::from_parts(id, replacement));
}

#[tokio::test]
async fn update_and_delete_report_missing_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let missing = PerfumeId(404);
    assert!(!storage
        .update_perfume(missing, &sample("Ghost", "1"))
        .await
        .expect("update"));
    assert!(!storage.delete_perfume(missing).await.expect("delete"));
    assert!(storage.find_perfume(missing).await.expect("find").is_none());
}

#[tokio::test]
async fn delete_removes_only_the_target_row() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let keep = storage
        .insert_perfume(&sample("Keep", "1"))
        .await
        .expect("keep");
    let drop_id = storage
        .insert_perfume(&sample("Drop", "2"))
        .await
        .expect("drop");

    assert!(storage.delete_perfume(drop_id).await.expect("delete"));
    let remaining = storage.list_perfumes().await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep);
}

#[tokio::test]
async fn corrupt_price_is_an_error_not_zero() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_perfume(&sample("Broken", "5"))
        .await
        .expect("insert");
    sqlx::query("UPDATE perfumes SET price = 'n/a' WHERE id = ?")
        .bind(id.0)
        .execute(storage.pool())
        .await
        .expect("corrupt");

    let err = storage.find_perfume(id).await.expect_err("corrupt price");
    assert!(err.to_string().contains("corrupt price"), "{err:#}");
}

#[tokio::test]
async fn schema_rejects_negative_volume() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let negative = NewPerfume {
        volume_ml: Some(-1),
        ..sample("Negative", "1")
    };
    assert!(storage.insert_perfume(&negative).await.is_err());
}

#[tokio::test]
async fn row_decodes_into_the_inserted_fields() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let new = sample("Decoded", "42.5");
    let id = storage.insert_perfume(&new).await.expect("insert");
    let listed = storage.list_perfumes().await.expect("list");
    assert_eq!(listed, vec![Perfume::from_parts(id, new)]);
}

#[test]
fn sqlite_path_skips_in_memory_urls() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("postgres://localhost/db").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/perfumes.db?mode=rwc"),
        Some(PathBuf::from("./data/perfumes.db"))
    );
}

//! Integration tests for the order persistence pipeline.
//!
//! Tests: connection string → Backend → Database → schema → SqlOrderStore
//!
//! Verifies:
//! - Currency values survive storage exactly
//! - Listing is newest-first
//! - Update/delete on unknown identifiers succeed but touch nothing
//! - A single undecodable row fails the whole list
//!
//! The `postgres` module repeats the store checks against a real server when
//! `TEST_POSTGRES_URL` is set (each test in its own scratch schema) and skips
//! otherwise.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use core::str::FromStr;
    use rust_decimal::Decimal;

    use evergiven_core::{OrderDraft, OrderId};

    use crate::db::{schema, Database};
    use crate::order_store::{OrderStore, SqlOrderStore, StoreError};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, n, 9, 15, 0).unwrap()
    }

    fn draft(at: DateTime<Utc>, tracking: &str) -> OrderDraft {
        OrderDraft {
            date_of_order: at,
            tracking_number: Some(tracking.to_string()),
            description: Some("M3 hex bolts".to_string()),
            quantity: 250,
            cost_per_item_cny: dec("0.35"),
            total_per_item_cny: dec("87.50"),
            cost_per_item_usd: dec("0.05"),
            total_per_item_usd: dec("12.10"),
        }
    }

    async fn setup() -> SqlOrderStore {
        let db = Database::connect_url("sqlite://:memory:").await.unwrap();
        schema::ensure_order_table(&db).await.unwrap();
        SqlOrderStore::new(db)
    }

    #[tokio::test]
    async fn empty_table_lists_nothing() {
        let store = setup().await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_list_round_trips_exactly() {
        let store = setup().await;
        let input = OrderDraft {
            date_of_order: day(3),
            tracking_number: Some("SF1400982231".to_string()),
            description: Some("USB-C panel mounts".to_string()),
            quantity: 12,
            cost_per_item_cny: dec("18.90"),
            total_per_item_cny: dec("226.80"),
            cost_per_item_usd: dec("2.61"),
            total_per_item_usd: dec("31.32"),
        };

        let created = store.create(input.clone()).await.unwrap();
        assert_eq!(created.details, input);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].details, input);
        assert_eq!(listed[0].details.total_per_item_cny.to_string(), "226.80");
    }

    #[tokio::test]
    async fn values_binary_floats_cannot_represent_are_exact() {
        let store = setup().await;
        let mut input = draft(day(1), "FLOAT");
        input.cost_per_item_cny = dec("0.10");
        input.total_per_item_cny = dec("0.30");
        input.cost_per_item_usd = dec("99999999.99");
        input.total_per_item_usd = dec("-0.01");

        store.create(input.clone()).await.unwrap();
        let listed = store.list().await.unwrap();

        assert_eq!(listed[0].details.cost_per_item_cny, dec("0.1"));
        assert_eq!(listed[0].details.total_per_item_cny, dec("0.3"));
        assert_eq!(listed[0].details.cost_per_item_usd, dec("99999999.99"));
        assert_eq!(listed[0].details.total_per_item_usd, dec("-0.01"));
    }

    #[tokio::test]
    async fn absent_text_fields_stay_absent() {
        let store = setup().await;
        let mut input = draft(day(1), "unused");
        input.tracking_number = None;
        input.description = None;

        store.create(input).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].details.tracking_number, None);
        assert_eq!(listed[0].details.description, None);
    }

    #[tokio::test]
    async fn identifiers_are_assigned_and_increase() {
        let store = setup().await;
        let a = store.create(draft(day(1), "A")).await.unwrap();
        let b = store.create(draft(day(1), "B")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = setup().await;
        // Insert out of order on purpose.
        store.create(draft(day(2), "D2")).await.unwrap();
        store.create(draft(day(3), "D3")).await.unwrap();
        store.create(draft(day(1), "D1")).await.unwrap();

        let tracking: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|o| o.details.tracking_number)
            .collect();
        assert_eq!(tracking, ["D3", "D2", "D1"]);
    }

    #[tokio::test]
    async fn ordering_respects_subsecond_dates() {
        let store = setup().await;
        let base = day(5);
        store.create(draft(base + Duration::milliseconds(500), "later")).await.unwrap();
        store.create(draft(base, "earlier")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].details.tracking_number.as_deref(), Some("later"));
        assert_eq!(listed[1].details.tracking_number.as_deref(), Some("earlier"));
    }

    #[tokio::test]
    async fn update_replaces_whole_record() {
        let store = setup().await;
        let created = store.create(draft(day(1), "OLD")).await.unwrap();

        let replacement = OrderDraft {
            date_of_order: day(9),
            tracking_number: None,
            description: Some("re-quoted".to_string()),
            quantity: 3,
            cost_per_item_cny: dec("1.00"),
            total_per_item_cny: dec("3.00"),
            cost_per_item_usd: dec("0.14"),
            total_per_item_usd: dec("0.42"),
        };
        let outcome = store.update(created.id, replacement.clone()).await.unwrap();
        assert!(outcome.matched());
        assert_eq!(outcome.order.id, created.id);
        assert_eq!(outcome.order.details, replacement);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], outcome.order);
    }

    #[tokio::test]
    async fn update_of_unknown_id_succeeds_without_inserting() {
        let store = setup().await;
        store.create(draft(day(1), "KEEP")).await.unwrap();

        let ghost = OrderId::from_raw(4242);
        let payload = draft(day(2), "GHOST");
        let outcome = store.update(ghost, payload.clone()).await.unwrap();

        assert_eq!(outcome.rows_affected, 0);
        assert!(!outcome.matched());
        assert_eq!(outcome.order.id, ghost);
        assert_eq!(outcome.order.details, payload);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|o| o.id != ghost));
    }

    #[tokio::test]
    async fn delete_then_list_drops_the_order() {
        let store = setup().await;
        let keep = store.create(draft(day(1), "KEEP")).await.unwrap();
        let gone = store.create(draft(day(2), "GONE")).await.unwrap();

        let outcome = store.delete(gone.id).await.unwrap();
        assert_eq!(outcome.rows_affected, 1);

        let ids: Vec<OrderId> = store.list().await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, [keep.id]);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_silent() {
        let store = setup().await;
        let outcome = store.delete(OrderId::from_raw(77)).await.unwrap();
        assert!(!outcome.matched());
    }

    #[tokio::test]
    async fn one_bad_row_fails_the_whole_list() {
        let store = setup().await;
        store.create(draft(day(1), "GOOD")).await.unwrap();

        let Database::Sqlite(pool) = store.database() else {
            panic!("expected sqlite database");
        };
        sqlx::query(
            "INSERT INTO china_orders (DateOfOrder, OrderQuantity, CostPerItemCNY, TotalPerItemCNY, CostPerItemUSD, TotalPerItemUSD) \
             VALUES ('2024-06-02T00:00:00.000000Z', 1, 'n/a', '0.00', '0.00', '0.00')",
        )
        .execute(pool)
        .await
        .unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn queries_fail_as_store_errors_without_a_table() {
        let db = Database::connect_url("sqlite://:memory:").await.unwrap();
        let store = SqlOrderStore::new(db);

        assert!(matches!(
            store.list().await,
            Err(StoreError::Query { operation: "list_orders", .. })
        ));
        assert!(matches!(
            store.create(draft(day(1), "X")).await,
            Err(StoreError::Query { operation: "create_order", .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_creates_share_one_pool() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("orders.db").display());
        let db = Database::connect_url(&url).await.unwrap();
        schema::ensure_order_table(&db).await.unwrap();
        let store: Arc<dyn OrderStore> = Arc::new(SqlOrderStore::new(db));

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(draft(day(1 + i), &format!("T{i}"))).await
            }));
        }

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap().id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn reopening_a_file_database_keeps_orders() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("orders.db").display());

        let first = Database::connect_url(&url).await.unwrap();
        schema::ensure_order_table(&first).await.unwrap();
        let created = SqlOrderStore::new(first.clone())
            .create(draft(day(4), "PERSIST"))
            .await
            .unwrap();
        first.close().await;

        let second = Database::connect_url(&url).await.unwrap();
        schema::ensure_order_table(&second).await.unwrap();
        let listed = SqlOrderStore::new(second).list().await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn amounts_past_the_column_bound_are_refused_and_not_written() {
        let store = setup().await;
        let mut input = draft(day(1), "HUGE");
        input.cost_per_item_usd = dec("100000000.00");

        let err = store.create(input).await.unwrap_err();
        assert!(
            matches!(err, StoreError::OutOfRange { column: "CostPerItemUSD", .. }),
            "got {err:?}"
        );
        assert!(store.list().await.unwrap().is_empty());
    }

    mod postgres {
        use std::sync::atomic::{AtomicU32, Ordering};

        use super::*;
        use crate::db::Dialect;

        static NEXT_SCHEMA: AtomicU32 = AtomicU32::new(0);

        /// A private schema on the test server, with the order table created.
        struct Scratch {
            admin: Database,
            schema_name: String,
            store: SqlOrderStore,
        }

        impl Scratch {
            async fn open() -> Option<Self> {
                let base = std::env::var("TEST_POSTGRES_URL")
                    .ok()
                    .filter(|v| !v.trim().is_empty())?;

                let schema_name = format!(
                    "evergiven_test_{}_{}",
                    std::process::id(),
                    NEXT_SCHEMA.fetch_add(1, Ordering::Relaxed)
                );

                let admin = Database::connect_url(&base).await.unwrap();
                assert_eq!(admin.dialect(), Dialect::Postgres);
                let Database::Postgres(pool) = &admin else {
                    panic!("TEST_POSTGRES_URL must be a postgres URI");
                };
                sqlx::query(&format!("DROP SCHEMA IF EXISTS {schema_name} CASCADE"))
                    .execute(pool)
                    .await
                    .unwrap();
                sqlx::query(&format!("CREATE SCHEMA {schema_name}"))
                    .execute(pool)
                    .await
                    .unwrap();

                let sep = if base.contains('?') { '&' } else { '?' };
                let scoped = format!("{base}{sep}options=-c%20search_path%3D{schema_name}");
                let db = Database::connect_url(&scoped).await.unwrap();
                schema::ensure_order_table(&db).await.unwrap();

                Some(Self {
                    admin,
                    schema_name,
                    store: SqlOrderStore::new(db),
                })
            }

            async fn close(self) {
                self.store.database().close().await;
                if let Database::Postgres(pool) = &self.admin {
                    sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema_name))
                        .execute(pool)
                        .await
                        .unwrap();
                }
                self.admin.close().await;
            }
        }

        macro_rules! scratch_or_skip {
            () => {
                match Scratch::open().await {
                    Some(scratch) => scratch,
                    None => {
                        eprintln!("TEST_POSTGRES_URL not set; skipping");
                        return;
                    }
                }
            };
        }

        #[tokio::test]
        async fn postgres_round_trip_is_exact() {
            let pg = scratch_or_skip!();
            let mut input = draft(day(3) + Duration::microseconds(123_456), "PG-EXACT");
            input.cost_per_item_cny = dec("0.10");
            input.total_per_item_cny = dec("1.005");
            input.cost_per_item_usd = dec("99999999.99");
            input.total_per_item_usd = dec("-0.01");
            input.tracking_number = None;

            let created = pg.store.create(input).await.unwrap();
            assert_eq!(created.details.total_per_item_cny, dec("1.01"));

            let listed = pg.store.list().await.unwrap();
            assert_eq!(listed, vec![created]);
            assert_eq!(listed[0].details.cost_per_item_cny.to_string(), "0.10");
            assert_eq!(listed[0].details.tracking_number, None);

            pg.close().await;
        }

        #[tokio::test]
        async fn postgres_lists_newest_first() {
            let pg = scratch_or_skip!();
            pg.store.create(draft(day(2), "D2")).await.unwrap();
            pg.store.create(draft(day(3), "D3")).await.unwrap();
            pg.store.create(draft(day(1), "D1")).await.unwrap();

            let tracking: Vec<String> = pg
                .store
                .list()
                .await
                .unwrap()
                .into_iter()
                .filter_map(|o| o.details.tracking_number)
                .collect();
            assert_eq!(tracking, ["D3", "D2", "D1"]);

            pg.close().await;
        }

        #[tokio::test]
        async fn postgres_schema_runs_twice_with_numeric_and_identity_columns() {
            let pg = scratch_or_skip!();
            let db = pg.store.database();
            schema::ensure_order_table(db).await.unwrap();
            schema::ensure_order_table(db).await.unwrap();

            let Database::Postgres(pool) = db else {
                panic!("expected postgres database");
            };
            let columns: Vec<(String, String, Option<i32>, Option<i32>, String)> = sqlx::query_as(
                "SELECT column_name::text, data_type::text, numeric_precision::int4, \
                        numeric_scale::int4, is_identity::text \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = 'china_orders'",
            )
            .fetch_all(pool)
            .await
            .unwrap();
            assert_eq!(columns.len(), 9);

            let column = |name: &str| {
                columns
                    .iter()
                    .find(|c| c.0 == name)
                    .cloned()
                    .unwrap_or_else(|| panic!("missing column {name}"))
            };
            let id = column("orderid");
            assert_eq!((id.1.as_str(), id.4.as_str()), ("bigint", "YES"));
            let cost = column("costperitemcny");
            assert_eq!((cost.1.as_str(), cost.2, cost.3), ("numeric", Some(10), Some(2)));
            assert_eq!(column("dateoforder").1, "timestamp with time zone");

            pg.close().await;
        }

        #[tokio::test]
        async fn postgres_unknown_id_update_and_delete_touch_nothing() {
            let pg = scratch_or_skip!();
            let kept = pg.store.create(draft(day(1), "KEEP")).await.unwrap();

            let ghost = OrderId::from_raw(kept.id.as_i64() + 1000);
            let payload = draft(day(2), "GHOST");
            let outcome = pg.store.update(ghost, payload.clone()).await.unwrap();
            assert_eq!(outcome.rows_affected, 0);
            assert_eq!(outcome.order.details, payload);

            let deleted = pg.store.delete(ghost).await.unwrap();
            assert_eq!(deleted.rows_affected, 0);

            assert_eq!(pg.store.list().await.unwrap(), vec![kept]);

            pg.close().await;
        }

        #[tokio::test]
        async fn postgres_update_then_delete_then_list() {
            let pg = scratch_or_skip!();
            let keep = pg.store.create(draft(day(1), "KEEP")).await.unwrap();
            let gone = pg.store.create(draft(day(2), "GONE")).await.unwrap();

            let updated = pg.store.update(keep.id, draft(day(5), "RENAMED")).await.unwrap();
            assert_eq!(updated.rows_affected, 1);

            let outcome = pg.store.delete(gone.id).await.unwrap();
            assert_eq!(outcome.rows_affected, 1);

            assert_eq!(pg.store.list().await.unwrap(), vec![updated.order]);

            pg.close().await;
        }

        #[tokio::test]
        async fn postgres_refuses_amounts_past_the_column_bound() {
            let pg = scratch_or_skip!();
            let mut input = draft(day(1), "HUGE");
            input.total_per_item_usd = dec("100000000.00");

            assert!(matches!(
                pg.store.create(input).await,
                Err(StoreError::OutOfRange { .. })
            ));
            assert!(pg.store.list().await.unwrap().is_empty());

            pg.close().await;
        }
    }
}

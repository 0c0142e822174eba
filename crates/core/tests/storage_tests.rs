// ═══════════════════════════════════════════════════════════════════
// Storage Tests — snapshot format, StorageManager, InMemoryStore,
// history cache coverage
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use uuid::Uuid;

use portfolio_tracker_core::errors::CoreError;
use portfolio_tracker_core::models::fund::{DividendType, Fund};
use portfolio_tracker_core::models::history::{HistoryRow, HistoryScope};
use portfolio_tracker_core::models::portfolio::Portfolio;
use portfolio_tracker_core::models::price::FundPrice;
use portfolio_tracker_core::models::transaction::{RealizedGainLoss, Transaction, TransactionType};
use portfolio_tracker_core::storage::format::{self, CURRENT_VERSION, MAGIC, MIN_HEADER_SIZE};
use portfolio_tracker_core::storage::manager::StorageManager;
use portfolio_tracker_core::storage::memory::InMemoryStore;
use portfolio_tracker_core::storage::traits::{covers_range, HistoryCache, LedgerStore, PriceStore};

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(scope: HistoryScope, d: u32, value: f64) -> HistoryRow {
    HistoryRow {
        date: make_date(2025, 1, d),
        scope,
        value,
        cost: 100.0,
        dividends: 0.0,
        realized_gain: 0.0,
        unrealized_gain: value - 100.0,
    }
}

/// Store with one fund, one portfolio, one link and a buy.
fn seeded_store() -> (InMemoryStore, Uuid, Uuid) {
    let store = InMemoryStore::new();
    let fund_id = store
        .add_fund(Fund::new("Global Equity", "EUR", DividendType::Cash).with_symbol("VWRL"))
        .unwrap();
    let portfolio_id = store.add_portfolio(Portfolio::new("Main")).unwrap();
    let link = store.add_portfolio_fund(portfolio_id, fund_id).unwrap();
    store
        .insert_transaction(Transaction::new(
            link.id,
            TransactionType::Buy,
            make_date(2025, 1, 2),
            10.0,
            50.0,
        ))
        .unwrap();
    store
        .upsert(FundPrice::new(fund_id, make_date(2025, 1, 2), 51.0))
        .unwrap();
    (store, fund_id, link.id)
}

// ═══════════════════════════════════════════════════════════════════
// File format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    #[test]
    fn write_read_round_trip() {
        let payload = b"hello portfolio";
        let bytes = format::write_file(CURRENT_VERSION, payload);
        let (header, body) = format::read_file(&bytes).unwrap();
        assert_eq!(header.version, CURRENT_VERSION);
        assert_eq!(header.payload_len, payload.len() as u64);
        assert_eq!(body, payload);
    }

    #[test]
    fn empty_payload_round_trip() {
        let bytes = format::write_file(CURRENT_VERSION, &[]);
        assert_eq!(bytes.len(), MIN_HEADER_SIZE);
        let (_, body) = format::read_file(&bytes).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn magic_bytes_at_start() {
        let bytes = format::write_file(CURRENT_VERSION, b"x");
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(MAGIC, b"PFTK");
    }

    #[test]
    fn version_is_little_endian_after_magic() {
        let bytes = format::write_file(CURRENT_VERSION, b"x");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);
    }

    #[test]
    fn file_too_small() {
        let err = format::read_file(b"PFTK").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(ref m) if m.contains("too small")));
    }

    #[test]
    fn wrong_magic_bytes() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"payload");
        bytes[0] = b'X';
        let err = format::read_file(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(ref m) if m.contains("magic")));
    }

    #[test]
    fn version_zero_is_unsupported() {
        let bytes = format::write_file(0, b"payload");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn future_version_is_unsupported() {
        let bytes = format::write_file(CURRENT_VERSION + 1, b"payload");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::UnsupportedVersion(v)) if v == CURRENT_VERSION + 1
        ));
    }

    #[test]
    fn truncated_payload() {
        let bytes = format::write_file(CURRENT_VERSION, b"a longer payload");
        let err = format::read_file(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(ref m) if m.contains("truncated")));
    }

    #[test]
    fn extra_trailing_bytes_ignored() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"abc");
        bytes.extend_from_slice(b"garbage");
        let (_, body) = format::read_file(&bytes).unwrap();
        assert_eq!(body, b"abc");
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager
// ═══════════════════════════════════════════════════════════════════

mod storage_manager {
    use super::*;

    #[test]
    fn save_load_empty_store() {
        let bytes = StorageManager::save_to_bytes(&InMemoryStore::new()).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();
        assert!(loaded.list_funds().unwrap().is_empty());
        assert_eq!(loaded.price_count().unwrap(), 0);
    }

    #[test]
    fn save_load_preserves_ledger_and_prices() {
        let (store, fund_id, link_id) = seeded_store();
        let bytes = StorageManager::save_to_bytes(&store).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        let fund = loaded.get_fund(fund_id).unwrap().unwrap();
        assert_eq!(fund.symbol.as_deref(), Some("VWRL"));
        assert_eq!(loaded.list_transactions(link_id).unwrap().len(), 1);
        assert_eq!(
            loaded
                .get_latest(fund_id, make_date(2025, 1, 10))
                .unwrap()
                .map(|p| p.price),
            Some(51.0)
        );
    }

    #[test]
    fn save_load_preserves_history_cache() {
        let store = InMemoryStore::new();
        let scope = HistoryScope::Portfolio(Uuid::new_v4());
        store
            .put_rows(&[row(scope, 1, 110.0), row(scope, 2, 120.0)])
            .unwrap();

        let bytes = StorageManager::save_to_bytes(&store).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();
        let rows = loaded
            .get_rows(scope, make_date(2025, 1, 1), make_date(2025, 1, 2))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, 120.0);
    }

    #[test]
    fn output_starts_with_magic_and_version() {
        let bytes = StorageManager::save_to_bytes(&InMemoryStore::new()).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);
    }

    #[test]
    fn garbage_data_fails() {
        assert!(StorageManager::load_from_bytes(b"definitely not a snapshot").is_err());
    }

    #[test]
    fn corrupted_payload_fails_to_deserialize() {
        let bytes = format::write_file(CURRENT_VERSION, &[0xFF; 3]);
        assert!(matches!(
            StorageManager::load_from_bytes(&bytes),
            Err(CoreError::Deserialization(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// File I/O
// ═══════════════════════════════════════════════════════════════════

mod file_io {
    use super::*;

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.pftk");
        let path_str = path.to_str().unwrap();

        let (store, fund_id, _) = seeded_store();
        StorageManager::save_to_file(&store, path_str).unwrap();
        let loaded = StorageManager::load_from_file(path_str).unwrap();

        assert!(loaded.get_fund(fund_id).unwrap().is_some());
        assert_eq!(loaded.price_count().unwrap(), 1);
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overwrite.pftk");
        let path_str = path.to_str().unwrap();

        StorageManager::save_to_file(&InMemoryStore::new(), path_str).unwrap();
        let (store, _, _) = seeded_store();
        StorageManager::save_to_file(&store, path_str).unwrap();

        let loaded = StorageManager::load_from_file(path_str).unwrap();
        assert_eq!(loaded.list_funds().unwrap().len(), 1);
    }

    #[test]
    fn load_nonexistent_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pftk");
        assert!(matches!(
            StorageManager::load_from_file(path.to_str().unwrap()),
            Err(CoreError::FileIO(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// InMemoryStore — metadata & ledger
// ═══════════════════════════════════════════════════════════════════

mod memory_store {
    use super::*;

    #[test]
    fn funds_listed_by_name() {
        let store = InMemoryStore::new();
        store.add_fund(Fund::new("Zeta", "EUR", DividendType::None)).unwrap();
        store.add_fund(Fund::new("Alpha", "EUR", DividendType::None)).unwrap();
        let names: Vec<String> = store.list_funds().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn duplicate_link_is_rejected() {
        let store = InMemoryStore::new();
        let fund = store.add_fund(Fund::new("F", "EUR", DividendType::None)).unwrap();
        let portfolio = store.add_portfolio(Portfolio::new("P")).unwrap();
        store.add_portfolio_fund(portfolio, fund).unwrap();
        assert!(matches!(
            store.add_portfolio_fund(portfolio, fund),
            Err(CoreError::InvalidState(_))
        ));
    }

    #[test]
    fn link_requires_both_sides() {
        let store = InMemoryStore::new();
        let fund = store.add_fund(Fund::new("F", "EUR", DividendType::None)).unwrap();
        let portfolio = store.add_portfolio(Portfolio::new("P")).unwrap();
        assert!(matches!(
            store.add_portfolio_fund(Uuid::new_v4(), fund),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.add_portfolio_fund(portfolio, Uuid::new_v4()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn links_queryable_from_both_sides() {
        let store = InMemoryStore::new();
        let fund = store.add_fund(Fund::new("F", "EUR", DividendType::None)).unwrap();
        let p1 = store.add_portfolio(Portfolio::new("P1")).unwrap();
        let p2 = store.add_portfolio(Portfolio::new("P2")).unwrap();
        let link = store.add_portfolio_fund(p1, fund).unwrap();
        store.add_portfolio_fund(p2, fund).unwrap();

        assert_eq!(store.portfolio_funds_for_fund(fund).unwrap().len(), 2);
        assert_eq!(store.list_portfolio_funds(p1).unwrap(), vec![link]);
        assert_eq!(store.get_portfolio_fund(link.id).unwrap(), Some(link));
    }

    #[test]
    fn archive_and_exclude_flags() {
        let store = InMemoryStore::new();
        let id = store.add_portfolio(Portfolio::new("P")).unwrap();
        store.set_portfolio_archived(id, true).unwrap();
        store.set_exclude_from_overview(id, true).unwrap();
        let p = store.get_portfolio(id).unwrap().unwrap();
        assert!(p.is_archived);
        assert!(p.exclude_from_overview);

        assert!(matches!(
            store.set_portfolio_archived(Uuid::new_v4(), true),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn transactions_keep_insertion_order() {
        let (store, _, link_id) = seeded_store();
        let sell = Transaction::new(link_id, TransactionType::Sell, make_date(2025, 1, 2), 5.0, 55.0);
        store.insert_transaction(sell.clone()).unwrap();

        let txs = store.list_transactions(link_id).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].id, sell.id);
    }

    #[test]
    fn delete_unknown_transaction_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.delete_transaction(Uuid::new_v4()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn realized_gain_written_once_per_sell() {
        let store = InMemoryStore::new();
        let record = RealizedGainLoss {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::new_v4(),
            fund_id: Uuid::new_v4(),
            sell_transaction_id: Uuid::new_v4(),
            transaction_date: make_date(2025, 1, 5),
            shares: 1.0,
            cost_basis: 10.0,
            sale_proceeds: 12.0,
        };
        store.insert_realized_gain(record.clone()).unwrap();

        let mut again = record.clone();
        again.id = Uuid::new_v4();
        assert!(matches!(
            store.insert_realized_gain(again),
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(
            store
                .realized_gain_for_transaction(record.sell_transaction_id)
                .unwrap(),
            Some(record.clone())
        );
        assert_eq!(store.list_realized_gains(record.portfolio_id).unwrap().len(), 1);
    }

    #[test]
    fn upsert_overwrites_price() {
        let store = InMemoryStore::new();
        let fund = Uuid::new_v4();
        store.upsert(FundPrice::new(fund, make_date(2025, 1, 2), 10.0)).unwrap();
        store.upsert(FundPrice::new(fund, make_date(2025, 1, 2), 11.0)).unwrap();
        assert_eq!(store.price_count().unwrap(), 1);
        let range = store
            .get_range(fund, make_date(2025, 1, 1), make_date(2025, 1, 3))
            .unwrap();
        assert_eq!(range, vec![FundPrice::new(fund, make_date(2025, 1, 2), 11.0)]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// InMemoryStore — history cache
// ═══════════════════════════════════════════════════════════════════

mod history_cache {
    use super::*;

    #[test]
    fn rows_returned_in_date_order() {
        let store = InMemoryStore::new();
        let scope = HistoryScope::Fund(Uuid::new_v4());
        store
            .put_rows(&[row(scope, 3, 3.0), row(scope, 1, 1.0), row(scope, 2, 2.0)])
            .unwrap();
        let rows = store
            .get_rows(scope, make_date(2025, 1, 1), make_date(2025, 1, 31))
            .unwrap();
        let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn scopes_are_isolated() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.put_rows(&[row(HistoryScope::Fund(id), 1, 1.0)]).unwrap();
        assert!(store
            .get_rows(HistoryScope::Portfolio(id), make_date(2025, 1, 1), make_date(2025, 1, 1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalidate_from_drops_tail() {
        let store = InMemoryStore::new();
        let scope = HistoryScope::Portfolio(Uuid::new_v4());
        let rows: Vec<HistoryRow> = (1..=5).map(|d| row(scope, d, d as f64)).collect();
        store.put_rows(&rows).unwrap();

        let dropped = store.invalidate_from(scope, make_date(2025, 1, 3)).unwrap();
        assert_eq!(dropped, 3);
        assert_eq!(store.cached_row_count(scope).unwrap(), 2);
    }

    #[test]
    fn invalidate_unknown_scope_is_noop() {
        let store = InMemoryStore::new();
        let dropped = store
            .invalidate_from(HistoryScope::Fund(Uuid::new_v4()), make_date(2025, 1, 1))
            .unwrap();
        assert_eq!(dropped, 0);
    }

    #[test]
    fn put_overwrites_same_day() {
        let store = InMemoryStore::new();
        let scope = HistoryScope::Fund(Uuid::new_v4());
        store.put_rows(&[row(scope, 1, 1.0)]).unwrap();
        store.put_rows(&[row(scope, 1, 9.0)]).unwrap();
        assert_eq!(store.cached_row_count(scope).unwrap(), 1);
        let rows = store
            .get_rows(scope, make_date(2025, 1, 1), make_date(2025, 1, 1))
            .unwrap();
        assert_eq!(rows[0].value, 9.0);
    }

    #[test]
    fn coverage_requires_every_day() {
        let scope = HistoryScope::Fund(Uuid::new_v4());
        let full: Vec<HistoryRow> = (1..=3).map(|d| row(scope, d, 1.0)).collect();
        assert!(covers_range(&full, make_date(2025, 1, 1), make_date(2025, 1, 3)));

        let gappy = vec![row(scope, 1, 1.0), row(scope, 3, 1.0)];
        assert!(!covers_range(&gappy, make_date(2025, 1, 1), make_date(2025, 1, 3)));

        assert!(!covers_range(&[], make_date(2025, 1, 1), make_date(2025, 1, 1)));
        assert!(!covers_range(&full, make_date(2025, 1, 1), make_date(2025, 1, 4)));
    }
}

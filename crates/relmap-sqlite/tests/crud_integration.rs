//! Integration tests for basic CRUD, filters and schema management.

mod common;

use chrono::{TimeZone, Utc};
use common::{Code, Device, Group, Machine, Part, Status, TestContext, Unit};
use relmap_core::model::View;
use relmap_core::{
    Error, Executor, Filter, Model, Operation, OrmConfig, Page, SortSpec, Statement, Value,
};
use relmap_sqlite::{SqliteBuilder, SqliteExecutor};

fn hello_unit() -> Unit {
    Unit {
        id: 0,
        name: "Hello world".to_string(),
        value: 12.3456,
        time_stamp: Utc.with_ymd_and_hms(2018, 1, 2, 15, 4, 5).unwrap(),
    }
}

#[test]
fn test_unit_insert_then_query() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();

    let inserted = ctx.insert(&hello_unit());
    assert!(inserted.id > 0);

    let found = ctx
        .query(&Unit {
            id: inserted.id,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found.id, inserted.id);
    assert_eq!(found.name, "Hello world");
    assert_eq!(found.value, 12.3456);
    assert_eq!(found.time_stamp, hello_unit().time_stamp);
}

#[test]
fn test_auto_increment_ids_are_distinct() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();

    let first = ctx.insert(&hello_unit());
    let second = ctx.insert(&hello_unit());
    assert_ne!(first.id, second.id);
    assert_eq!(ctx.count::<Unit>(), 2);
}

#[test]
fn test_query_without_match_is_not_found() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();

    let err = ctx
        .query(&Unit {
            id: 404,
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err.root(), Error::NotFound));
    assert!(matches!(
        err,
        Error::Context {
            operation: Operation::Query,
            ..
        }
    ));
}

#[test]
fn test_update_basic_columns() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();

    let mut unit = ctx.insert(&hello_unit());
    unit.name = "renamed".to_string();
    unit.value = -1.5;
    ctx.update(&unit);

    let found = ctx
        .query(&Unit {
            id: unit.id,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found, unit);
}

#[test]
fn test_delete_basic_row() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();

    let unit = ctx.insert(&hello_unit());
    assert_eq!(ctx.delete(&unit), 1);
    assert_eq!(ctx.count::<Unit>(), 0);
    assert_eq!(ctx.delete(&unit), 0);
}

fn seed_units(ctx: &mut TestContext) {
    for i in 0..5 {
        ctx.insert(&Unit {
            name: format!("u{i}"),
            value: f64::from(i),
            ..hello_unit()
        });
    }
}

#[test]
fn test_batch_query_sort_and_page() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();
    seed_units(&mut ctx);

    let filter = Filter::new()
        .above("value", 0.5f64)
        .sort(SortSpec::desc("value"))
        .page(Page::new(2, 1));
    let units: Vec<Unit> = ctx.batch(&filter);

    let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["u3", "u2"]);
}

#[test]
fn test_batch_query_without_match_is_empty() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();
    seed_units(&mut ctx);

    let units: Vec<Unit> = ctx.batch(&Filter::new().equal("name", "missing"));
    assert!(units.is_empty());
}

#[test]
fn test_batch_query_value_mask() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();
    seed_units(&mut ctx);

    let template = ctx.provider.type_model::<Unit>().unwrap();
    let filter = Filter::new()
        .in_values("name", vec!["u1".into(), "u4".into()])
        .sort(SortSpec::asc("id"))
        .value_mask(template.copy(View::Lite));
    let found = ctx.orm.batch_query(&template, &filter).unwrap();

    assert_eq!(found.len(), 2);
    for model in &found {
        let names: Vec<&str> = model.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }
    let units: Vec<Unit> = found
        .iter()
        .map(|m| ctx.provider.materialize(m.as_ref()).unwrap())
        .collect();
    assert_eq!(units[0].name, "u1");
    assert_eq!(units[1].name, "u4");
    assert!(units.iter().all(|u| u.value == 0.0 && u.id > 0));
}

#[test]
fn test_batch_query_rejects_mask_of_other_type() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();
    seed_units(&mut ctx);

    let template = ctx.provider.type_model::<Unit>().unwrap();
    let status = ctx.provider.type_model::<Status>().unwrap();
    let filter = Filter::new().value_mask(status.copy(View::Origin));
    let err = ctx.orm.batch_query(&template, &filter).unwrap_err();

    assert!(matches!(err.root(), Error::InvalidData(_)));
    assert_eq!(ctx.orm.transaction_depth(), 0);
}

#[test]
fn test_count_with_filter() {
    let mut ctx = TestContext::new();
    ctx.create::<Unit>();
    seed_units(&mut ctx);

    let template = ctx.provider.type_model::<Unit>().unwrap();
    assert_eq!(ctx.orm.count(&template, &Filter::new().like("name", "u%")).unwrap(), 5);
    assert_eq!(ctx.orm.count(&template, &Filter::new().below("value", 2.0f64)).unwrap(), 2);
    assert_eq!(
        ctx.orm
            .count(&template, &Filter::new().not_in("name", vec!["u0".into()]))
            .unwrap(),
        4
    );
}

#[test]
fn test_generated_uuid_key() {
    let mut ctx = TestContext::new();
    ctx.create::<Group>();

    let group = ctx.insert(&Group {
        title: "ops".to_string(),
        ..Default::default()
    });
    assert_eq!(group.id.len(), 36);

    let found = ctx
        .query(&Group {
            id: group.id.clone(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found, group);
}

#[test]
fn test_customer_key_round_trip() {
    let mut ctx = TestContext::new();
    ctx.create::<Code>();

    let code = ctx.insert(&Code {
        code: "EUR".to_string(),
        label: "euro".to_string(),
    });
    let mut renamed = code.clone();
    renamed.label = "Euro".to_string();
    ctx.update(&renamed);

    let found = ctx
        .query(&Code {
            code: "EUR".to_string(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found, renamed);
    assert_eq!(ctx.delete(&code), 1);
}

#[test]
fn test_insert_rejects_empty_customer_key() {
    let mut ctx = TestContext::new();
    ctx.create::<Code>();

    let mut model = ctx
        .provider
        .entity_model(&Code {
            label: "unkeyed".to_string(),
            ..Default::default()
        })
        .unwrap();
    let err = ctx.orm.insert(&mut model).unwrap_err();

    assert!(matches!(err.root(), Error::InvalidData(_)));
    assert_eq!(ctx.orm.transaction_depth(), 0);
    assert_eq!(ctx.count::<Code>(), 0);
}

#[test]
fn test_create_table_covers_related_types() {
    let mut ctx = TestContext::new();
    ctx.create::<Device>();
    // Idempotent.
    ctx.create::<Device>();

    let exec = ctx.orm.executor_mut();
    for table in ["Device", "Status", "Group", "DeviceStatus1Status", "DeviceGroups4Group"] {
        assert!(exec.check_table_exist(table).unwrap(), "missing {table}");
    }
}

#[test]
fn test_drop_table_keeps_referenced_types() {
    let mut ctx = TestContext::new();
    ctx.create::<Machine>();

    let model = ctx.provider.type_model::<Machine>().unwrap();
    ctx.orm.drop_table(&model).unwrap();

    let exec = ctx.orm.executor_mut();
    for table in ["Machine", "Part", "MachineParts2Part", "MachineOwner3Group"] {
        assert!(!exec.check_table_exist(table).unwrap(), "{table} still exists");
    }
    assert!(exec.check_table_exist("Group").unwrap());
}

#[test]
fn test_table_prefix() {
    common::init_tracing();
    let executor = SqliteExecutor::open_in_memory().unwrap();
    let mut orm = relmap_core::Orm::with_config(
        SqliteBuilder::new().with_prefix("app_"),
        executor,
        OrmConfig::default(),
    );
    let provider = relmap_core::LocalProvider::new();
    let model = provider.type_model::<Machine>().unwrap();
    orm.create_table(&model).unwrap();

    let exec = orm.executor_mut();
    assert!(exec.check_table_exist("app_Machine").unwrap());
    assert!(exec.check_table_exist("app_MachineParts2Part").unwrap());
    assert!(!exec.check_table_exist("Machine").unwrap());
}

#[test]
fn test_failed_insert_rolls_back_everything() {
    let mut ctx = TestContext::new();
    ctx.create::<Device>();

    // The group was never inserted, so it has no key to link.
    let device = Device {
        name: "orphan".to_string(),
        status: Some(Status {
            code: "new".to_string(),
            ..Default::default()
        }),
        groups: vec![Group {
            title: "ghost".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut model = ctx.provider.entity_model(&device).unwrap();
    let err = ctx.orm.insert(&mut model).unwrap_err();

    assert!(matches!(err.root(), Error::Relation(_)));
    match &err {
        Error::Context {
            operation, field, ..
        } => {
            assert_eq!(*operation, Operation::Insert);
            assert_eq!(field.as_deref(), Some("groups"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(ctx.orm.transaction_depth(), 0);
    assert_eq!(ctx.count::<Device>(), 0);
    assert_eq!(ctx.count::<Status>(), 0);
    assert_eq!(ctx.rows("DeviceStatus1Status"), 0);
}

#[test]
fn test_explicit_transaction_spans_operations() {
    let mut ctx = TestContext::new();
    ctx.create::<Part>();

    let provider = ctx.provider.clone();
    let result: relmap_core::Result<()> = ctx.orm.transaction(|orm| {
        let mut first = provider.entity_model(&Part {
            label: "kept?".to_string(),
            ..Default::default()
        })?;
        orm.insert(&mut first)?;
        Err(Error::InvalidData("abort".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(ctx.count::<Part>(), 0);
}

#[test]
fn test_failed_commit_leaves_connection_usable() {
    let mut ctx = TestContext::new();
    ctx.create::<Part>();
    ctx.orm
        .executor_mut()
        .execute(&Statement::new(
            "PRAGMA foreign_keys = ON; \
             CREATE TABLE \"Owner\" (\"id\" INTEGER PRIMARY KEY); \
             CREATE TABLE \"Pet\" (\"id\" INTEGER PRIMARY KEY, \"owner\" INTEGER \
             REFERENCES \"Owner\" (\"id\") DEFERRABLE INITIALLY DEFERRED)",
        ))
        .unwrap();

    // The dangling owner is only detected at COMMIT.
    let result: relmap_core::Result<()> = ctx.orm.transaction(|orm| {
        orm.executor_mut().execute(&Statement::with_args(
            "INSERT INTO \"Pet\" (\"id\", \"owner\") VALUES (?, ?)",
            vec![Value::Int64(1), Value::Int64(99)],
        ))?;
        Ok(())
    });

    let err = result.unwrap_err();
    assert!(matches!(err.root(), Error::Backend(_)));
    assert_eq!(ctx.orm.transaction_depth(), 0);
    assert!(ctx.orm.executor().connection().is_autocommit());
    assert_eq!(ctx.rows("Pet"), 0);

    let part = ctx.insert(&Part {
        label: "after".to_string(),
        ..Default::default()
    });
    assert!(part.id > 0);
    assert_eq!(ctx.count::<Part>(), 1);
}

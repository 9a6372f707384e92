//! End-to-end schema diffs over JSON table definitions.

mod common;

use common::{build_test_v1, build_test_v2};
use joinery_core::prelude::*;

#[test]
fn create_renders_every_definition() {
    let statements = schema_diff::diff(None, Some(&build_test_v1())).unwrap();
    assert_eq!(
        statements,
        vec![
            "create table if not exists `build_test` (\n\
             \t`id` int(11) unsigned not null auto_increment,\n\
             \t`name` varchar(64) not null,\n\
             \t`email` varchar(255) not null,\n\
             \t`gender` tinyint(4) not null,\n\
             \t`country` int(11) not null,\n\
             \t`created_at` datetime not null,\n\
             \t`deleted_at` datetime,\n\
             \tprimary key (`id`),\n\
             \tunique key `name` (`name`),\n\
             \tkey `k1` (`deleted_at`),\n\
             \tkey `k2` (`gender`,`country`)\n\
             ) engine=InnoDB default charset=utf8 collate=utf8_general_ci"
        ]
    );
}

#[test]
fn drop_renders_single_statement() {
    assert_eq!(
        schema_diff::diff(Some(&build_test_v1()), None).unwrap(),
        vec!["drop table if exists `build_test`"]
    );
}

#[test]
fn alter_follows_clause_order() {
    let statements = schema_diff::diff(Some(&build_test_v1()), Some(&build_test_v2())).unwrap();
    assert_eq!(
        statements,
        vec![
            "alter table `build_test` modify `name` varchar(64) character set utf8 collate utf8_bin not null",
            "alter table `build_test`\n\
             \tdrop key `k2`,\n\
             \tdrop key `name`,\n\
             \tdrop `deleted_at`,\n\
             \tadd `uuid` varchar(64) not null first,\n\
             \tadd `icon` text not null after `email`,\n\
             \tadd unique key `email` (`email`),\n\
             \tdrop key `k1`,\n\
             \tadd key `k1` (`created_at`),\n\
             \tadd key `k3` (`gender`),\n\
             \tmodify `country` tinyint(4) not null after `gender`",
        ]
    );
}

#[test]
fn alter_plan_exposes_each_clause_kind() {
    let plan = schema_diff::plan_alter(&build_test_v1(), &build_test_v2());
    assert!(!plan.convert_charset);
    assert_eq!(
        plan.column_charsets.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["name"]
    );
    assert_eq!(plan.drop_indices, vec!["drop key `k2`", "drop key `name`"]);
    assert_eq!(plan.drop_columns, vec!["drop `deleted_at`"]);
    assert_eq!(plan.add_columns.len(), 2);
    assert_eq!(plan.add_indices.len(), 4);
    assert_eq!(plan.modify_columns.len(), 1);
}

#[test]
fn diff_is_reflexive() {
    for table in [build_test_v1(), build_test_v2()] {
        assert!(schema_diff::diff(Some(&table), Some(&table)).unwrap().is_empty());
    }
}

#[test]
fn volatile_statistics_are_ignored() {
    let old = build_test_v1();
    let mut new = build_test_v1();
    new.schema = "staging".to_string();
    new.table_rows = Some(25_000);
    new.auto_increment = Some(25_001);
    for index in &mut new.indices {
        for member in &mut index.members {
            member.cardinality = Some(1_234);
        }
    }
    for column in &mut new.columns {
        column.privileges = "select,insert,update,references".to_string();
        column.catalog = "def".to_string();
    }
    assert!(schema_diff::diff(Some(&old), Some(&new)).unwrap().is_empty());
}

#[test]
fn index_member_order_is_significant() {
    let old = build_test_v1();
    let mut new = build_test_v1();
    let k2: Vec<usize> = new
        .indices
        .iter()
        .enumerate()
        .filter(|(_, index)| index.name == "k2")
        .map(|(i, _)| i)
        .collect();
    new.indices.swap(k2[0], k2[1]);
    assert_eq!(
        schema_diff::diff(Some(&old), Some(&new)).unwrap(),
        vec!["alter table `build_test`\n\tdrop key `k2`,\n\tadd key `k2` (`country`,`gender`)"]
    );
}

#[test]
fn default_values_are_quoted_by_type() {
    let table = Table::new("defaults")
        .column(Column::new("status", 1, "varchar(16)").not_null().default_value("new"))
        .column(Column::new("score", 2, "int(11)").default_value("0"))
        .column(
            Column::new("created_at", 3, "timestamp")
                .not_null()
                .default_value("CURRENT_TIMESTAMP")
                .extra("DEFAULT_GENERATED"),
        );
    assert_eq!(
        schema_diff::diff(None, Some(&table)).unwrap(),
        vec![
            "create table if not exists `defaults` (\n\
             \t`status` varchar(16) not null default 'new',\n\
             \t`score` int(11) default 0,\n\
             \t`created_at` timestamp not null default CURRENT_TIMESTAMP\n\
             ) engine=InnoDB"
        ]
    );
}

#[test]
fn mismatched_names_are_rejected() {
    let old = build_test_v1();
    let new = Table::new("other");
    assert!(matches!(
        schema_diff::diff(Some(&old), Some(&new)),
        Err(DiffError::NameMismatch { .. })
    ));
}

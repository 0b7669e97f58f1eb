//! Diesel model structs for database tables.

use diesel::prelude::*;

use crate::schema::{
    companies, document_instances, documents, languages, services, snapshots, transforms,
};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CompanyRecord {
    pub id: i32,
    pub name: String,
    pub website: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = companies)]
pub struct NewCompany<'a> {
    pub name: &'a str,
    pub website: Option<&'a str>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ServiceRecord {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub website: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = services)]
pub struct NewService<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub website: Option<&'a str>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub id: i32,
    pub service_id: i32,
    pub name: String,
    pub module: String,
}

#[derive(Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument<'a> {
    pub service_id: i32,
    pub name: &'a str,
    pub module: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = languages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LanguageRecord {
    pub id: i32,
    pub name: String,
    pub code_iso_639_1: String,
}

#[derive(Insertable)]
#[diesel(table_name = languages)]
pub struct NewLanguage<'a> {
    pub name: &'a str,
    pub code_iso_639_1: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = document_instances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentInstanceRecord {
    pub id: i32,
    pub document_id: i32,
    pub language_id: i32,
    pub url: String,
    pub is_enabled: bool,
    pub updated_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = document_instances)]
pub struct NewDocumentInstance<'a> {
    pub document_id: i32,
    pub language_id: i32,
    pub url: &'a str,
    pub is_enabled: bool,
    pub updated_at: &'a str,
}

/// Snapshot row. Also loadable from raw SQL for the latest-per-instance query.
#[derive(Queryable, QueryableByName, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SnapshotRecord {
    pub id: i32,
    pub document_instance_id: i32,
    pub date: String,
    pub time: String,
    pub datetime: String,
    pub text: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = snapshots)]
pub struct NewSnapshot<'a> {
    pub document_instance_id: i32,
    pub date: &'a str,
    pub time: &'a str,
    pub datetime: &'a str,
    pub text: Option<&'a str>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = transforms)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransformRecord {
    pub id: i32,
    pub document_id: i32,
    pub module: String,
    pub execution_priority: i32,
}

#[derive(Insertable)]
#[diesel(table_name = transforms)]
pub struct NewTransform<'a> {
    pub document_id: i32,
    pub module: &'a str,
    pub execution_priority: i32,
}

/// Row id of the last insert on a connection.
#[derive(QueryableByName)]
pub struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    pub id: i64,
}

//! Hierarchical loader for plugin-supplied entity graphs.
//!
//! Every level of the graph is resolved by natural key and created only when
//! missing. Stored rows win over incoming values; each disagreement becomes a
//! warning in the returned report. The one exception is the instance URL,
//! which is refreshed in place. A graph loads inside a single transaction, so
//! any failure leaves the database as it was.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use thiserror::Error;

use super::last_insert_id;
use super::models::{
    CompanyRecord, DocumentInstanceRecord, DocumentRecord, LanguageRecord, NewCompany,
    NewDocument, NewDocumentInstance, NewLanguage, NewService, NewTransform, ServiceRecord,
    TransformRecord,
};
use super::pool::{DbError, DbPool, SqliteConn};
use super::util::format_datetime;
use crate::models::{CompanyNode, DocumentInstanceGraph, LanguageNode, ServiceNode};
use crate::schema::{companies, document_instances, documents, languages, services, transforms};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{entity} \"{key}\" could not be stored: {message}")]
    Constraint {
        entity: &'static str,
        key: String,
        message: String,
    },

    #[error("{entity} \"{key}\" matches more than one stored row")]
    Integrity { entity: &'static str, key: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Outcome of loading one graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub document_instance_id: i32,
    /// False when the instance already existed.
    pub created: bool,
    pub warnings: Vec<String>,
}

struct FieldDiff {
    field: &'static str,
    existing: String,
    discarded: String,
}

fn diff(field: &'static str, existing: &str, incoming: &str) -> Option<FieldDiff> {
    (existing != incoming).then(|| FieldDiff {
        field,
        existing: existing.to_string(),
        discarded: incoming.to_string(),
    })
}

fn diff_opt(field: &'static str, existing: Option<&str>, incoming: Option<&str>) -> Option<FieldDiff> {
    diff(field, existing.unwrap_or_default(), incoming.unwrap_or_default())
}

fn divergence_warning(entity: &str, key: &str, diffs: &[FieldDiff]) -> Option<String> {
    if diffs.is_empty() {
        return None;
    }
    tracing::debug!(entity, key, fields = diffs.len(), "Stored record differs from incoming values");
    let mut warning = format!(
        "Existing {} found with different field values. Existing record will not be updated.",
        entity
    );
    for d in diffs {
        warning.push_str(&format!(
            " Existing \"{}\" value: \"{}\". Discarded \"{}\" value: \"{}\".",
            d.field, d.existing, d.field, d.discarded
        ));
    }
    Some(warning)
}

/// At most one row may match a natural key.
fn single<T>(entity: &'static str, key: &str, rows: Vec<T>) -> Result<Option<T>, LoadError> {
    if rows.len() > 1 {
        return Err(LoadError::Integrity {
            entity,
            key: key.to_string(),
        });
    }
    Ok(rows.into_iter().next())
}

fn keyed_error(entity: &'static str, key: &str, err: DbError) -> LoadError {
    match err {
        DbError::DatabaseError(_, info) => LoadError::Constraint {
            entity,
            key: key.to_string(),
            message: info.message().to_string(),
        },
        other => LoadError::Database(other),
    }
}

#[derive(Clone)]
pub struct HierarchicalLoader {
    pool: DbPool,
}

impl HierarchicalLoader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Load one graph on behalf of `module`.
    pub async fn upsert(
        &self,
        graph: &DocumentInstanceGraph,
        module: &str,
    ) -> Result<LoadReport, LoadError> {
        let mut conn = self.pool.get().await?;

        let report = conn
            .transaction(|conn| {
                Box::pin(async move {
                    let mut warnings = Vec::new();

                    let company_id = upsert_company(conn, &graph.company, &mut warnings).await?;
                    let service_id = upsert_service(
                        conn,
                        company_id,
                        &graph.company.name,
                        &graph.service,
                        &mut warnings,
                    )
                    .await?;
                    let document_id =
                        upsert_document(conn, service_id, graph, module, &mut warnings).await?;
                    let language_id = upsert_language(conn, &graph.language, &mut warnings).await?;
                    let (document_instance_id, created) =
                        upsert_instance(conn, document_id, language_id, graph, &mut warnings)
                            .await?;
                    register_transform(conn, document_id, graph, module, &mut warnings).await?;

                    Ok::<LoadReport, LoadError>(LoadReport {
                        document_instance_id,
                        created,
                        warnings,
                    })
                })
            })
            .await?;

        for warning in &report.warnings {
            tracing::warn!(module, "{}", warning);
        }
        tracing::debug!(
            module,
            instance_id = report.document_instance_id,
            created = report.created,
            "Loaded {}",
            graph.instance_key()
        );

        Ok(report)
    }
}

async fn upsert_company(
    conn: &mut SqliteConn,
    node: &CompanyNode,
    warnings: &mut Vec<String>,
) -> Result<i32, LoadError> {
    let key = node.name.as_str();

    let rows: Vec<CompanyRecord> = companies::table
        .filter(companies::name.eq(key))
        .limit(2)
        .select(CompanyRecord::as_select())
        .load(conn)
        .await?;

    if let Some(existing) = single("Company", key, rows)? {
        let diffs: Vec<FieldDiff> =
            diff_opt("website", existing.website.as_deref(), node.website.as_deref())
                .into_iter()
                .collect();
        warnings.extend(divergence_warning("Company", key, &diffs));
        return Ok(existing.id);
    }

    diesel::insert_into(companies::table)
        .values(NewCompany {
            name: key,
            website: node.website.as_deref(),
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("Company", key, e))?;

    Ok(last_insert_id(conn).await?)
}

async fn upsert_service(
    conn: &mut SqliteConn,
    company_id: i32,
    company_name: &str,
    node: &ServiceNode,
    warnings: &mut Vec<String>,
) -> Result<i32, LoadError> {
    let key = format!("{} / {}", company_name, node.name);

    let rows: Vec<ServiceRecord> = services::table
        .filter(services::company_id.eq(company_id))
        .filter(services::name.eq(&node.name))
        .limit(2)
        .select(ServiceRecord::as_select())
        .load(conn)
        .await?;

    if let Some(existing) = single("Service", &key, rows)? {
        let diffs: Vec<FieldDiff> =
            diff_opt("website", existing.website.as_deref(), node.website.as_deref())
                .into_iter()
                .collect();
        warnings.extend(divergence_warning("Service", &key, &diffs));
        return Ok(existing.id);
    }

    diesel::insert_into(services::table)
        .values(NewService {
            company_id,
            name: &node.name,
            website: node.website.as_deref(),
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("Service", &key, e))?;

    Ok(last_insert_id(conn).await?)
}

async fn upsert_document(
    conn: &mut SqliteConn,
    service_id: i32,
    graph: &DocumentInstanceGraph,
    module: &str,
    warnings: &mut Vec<String>,
) -> Result<i32, LoadError> {
    let name = graph.document.name.as_str();
    let key = format!("{} / {}", graph.service.name, name);

    let rows: Vec<DocumentRecord> = documents::table
        .filter(documents::service_id.eq(service_id))
        .filter(documents::name.eq(name))
        .limit(2)
        .select(DocumentRecord::as_select())
        .load(conn)
        .await?;

    if let Some(existing) = single("Document", &key, rows)? {
        let diffs: Vec<FieldDiff> = diff("module", &existing.module, module).into_iter().collect();
        warnings.extend(divergence_warning("Document", &key, &diffs));
        return Ok(existing.id);
    }

    diesel::insert_into(documents::table)
        .values(NewDocument {
            service_id,
            name,
            module,
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("Document", &key, e))?;

    Ok(last_insert_id(conn).await?)
}

async fn upsert_language(
    conn: &mut SqliteConn,
    node: &LanguageNode,
    warnings: &mut Vec<String>,
) -> Result<i32, LoadError> {
    let key = node.code.as_str();

    let rows: Vec<LanguageRecord> = languages::table
        .filter(languages::code_iso_639_1.eq(key))
        .limit(2)
        .select(LanguageRecord::as_select())
        .load(conn)
        .await?;

    if let Some(existing) = single("Language", key, rows)? {
        let diffs: Vec<FieldDiff> = diff("name", &existing.name, &node.name).into_iter().collect();
        warnings.extend(divergence_warning("Language", key, &diffs));
        return Ok(existing.id);
    }

    diesel::insert_into(languages::table)
        .values(NewLanguage {
            name: &node.name,
            code_iso_639_1: key,
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("Language", key, e))?;

    Ok(last_insert_id(conn).await?)
}

/// Returns the instance id and whether it was created.
async fn upsert_instance(
    conn: &mut SqliteConn,
    document_id: i32,
    language_id: i32,
    graph: &DocumentInstanceGraph,
    warnings: &mut Vec<String>,
) -> Result<(i32, bool), LoadError> {
    let key = graph.instance_key();
    let now = format_datetime(&Utc::now());

    let rows: Vec<DocumentInstanceRecord> = document_instances::table
        .filter(document_instances::document_id.eq(document_id))
        .filter(document_instances::language_id.eq(language_id))
        .limit(2)
        .select(DocumentInstanceRecord::as_select())
        .load(conn)
        .await?;

    if let Some(existing) = single("DocumentInstance", &key, rows)? {
        if existing.url != graph.url {
            diesel::update(document_instances::table.find(existing.id))
                .set((
                    document_instances::url.eq(&graph.url),
                    document_instances::updated_at.eq(&now),
                ))
                .execute(conn)
                .await
                .map_err(|e| keyed_error("DocumentInstance", &key, e))?;
            warnings.push(format!(
                "Updated DocumentInstance \"{}\" url. Old url was: \"{}\". New url is: \"{}\".",
                key, existing.url, graph.url
            ));
        }

        let diffs: Vec<FieldDiff> = diff(
            "is_enabled",
            &existing.is_enabled.to_string(),
            &graph.is_enabled.to_string(),
        )
        .into_iter()
        .collect();
        warnings.extend(divergence_warning("DocumentInstance", &key, &diffs));

        return Ok((existing.id, false));
    }

    diesel::insert_into(document_instances::table)
        .values(NewDocumentInstance {
            document_id,
            language_id,
            url: &graph.url,
            is_enabled: graph.is_enabled,
            updated_at: &now,
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("DocumentInstance", &key, e))?;

    Ok((last_insert_id(conn).await?, true))
}

async fn register_transform(
    conn: &mut SqliteConn,
    document_id: i32,
    graph: &DocumentInstanceGraph,
    module: &str,
    warnings: &mut Vec<String>,
) -> Result<(), LoadError> {
    let key = format!("{} / {}", graph.document.name, module);

    let rows: Vec<TransformRecord> = transforms::table
        .filter(transforms::document_id.eq(document_id))
        .filter(transforms::module.eq(module))
        .limit(2)
        .select(TransformRecord::as_select())
        .load(conn)
        .await?;

    if single("Transform", &key, rows)?.is_some() {
        warnings.push(format!(
            "Module \"{}\" already registered a transform for Document \"{}\".",
            module, graph.document.name
        ));
        return Ok(());
    }

    diesel::insert_into(transforms::table)
        .values(NewTransform {
            document_id,
            module,
            execution_priority: graph.transform_priority,
        })
        .execute(conn)
        .await
        .map_err(|e| keyed_error("Transform", &key, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{graph, setup_test_db};
    use crate::repository::DbContext;

    /// Row counts of companies, services, documents, languages, instances
    /// and transforms.
    async fn counts(ctx: &DbContext) -> [i64; 6] {
        let mut conn = ctx.pool().get().await.unwrap();
        [
            companies::table.count().get_result(&mut conn).await.unwrap(),
            services::table.count().get_result(&mut conn).await.unwrap(),
            documents::table.count().get_result(&mut conn).await.unwrap(),
            languages::table.count().get_result(&mut conn).await.unwrap(),
            document_instances::table
                .count()
                .get_result(&mut conn)
                .await
                .unwrap(),
            transforms::table.count().get_result(&mut conn).await.unwrap(),
        ]
    }

    async fn stored_url(ctx: &DbContext, instance_id: i32) -> String {
        let mut conn = ctx.pool().get().await.unwrap();
        document_instances::table
            .find(instance_id)
            .select(document_instances::url)
            .first(&mut conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_install_is_clean() {
        let (ctx, _dir) = setup_test_db().await;

        let report = ctx
            .loader()
            .upsert(&graph("Terms of Use", "en", "example.test/tos"), "tests.tos")
            .await
            .unwrap();

        assert!(report.created);
        assert!(report.warnings.is_empty());
        assert_eq!(counts(&ctx).await, [1, 1, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_reinstall_is_idempotent() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();
        let g = graph("Terms of Use", "en", "example.test/tos");

        let first = loader.upsert(&g, "tests.tos").await.unwrap();
        let second = loader.upsert(&g, "tests.tos").await.unwrap();

        assert_eq!(first.document_instance_id, second.document_instance_id);
        assert!(!second.created);
        assert_eq!(
            second.warnings,
            vec![
                "Module \"tests.tos\" already registered a transform for Document \"Terms of Use\"."
                    .to_string()
            ]
        );
        assert_eq!(counts(&ctx).await, [1, 1, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_changed_url_is_refreshed_with_one_warning() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();

        let first = loader
            .upsert(&graph("Terms of Use", "en", "example.test/tos"), "tests.tos")
            .await
            .unwrap();
        let moved = loader
            .upsert(
                &graph("Terms of Use", "en", "example.test/legal/tos"),
                "tests.tos",
            )
            .await
            .unwrap();

        let url_warnings: Vec<&String> = moved
            .warnings
            .iter()
            .filter(|w| w.contains("url"))
            .collect();
        assert_eq!(
            url_warnings,
            vec![
                "Updated DocumentInstance \"Terms of Use [en]\" url. Old url was: \"example.test/tos\". New url is: \"example.test/legal/tos\"."
            ]
        );
        assert_eq!(
            stored_url(&ctx, first.document_instance_id).await,
            "example.test/legal/tos"
        );

        let unchanged = loader
            .upsert(
                &graph("Terms of Use", "en", "example.test/legal/tos"),
                "tests.tos",
            )
            .await
            .unwrap();
        assert!(unchanged.warnings.iter().all(|w| !w.contains("url")));
    }

    #[tokio::test]
    async fn test_divergent_fields_are_kept_and_reported() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();

        loader
            .upsert(
                &graph("Terms of Use", "en", "example.test/tos").with_company_website("old.test"),
                "tests.tos",
            )
            .await
            .unwrap();
        let report = loader
            .upsert(
                &graph("Terms of Use", "en", "example.test/tos")
                    .with_company_website("new.test")
                    .disabled(),
                "tests.tos",
            )
            .await
            .unwrap();

        assert!(report.warnings.contains(
            &"Existing Company found with different field values. Existing record will not be updated. Existing \"website\" value: \"old.test\". Discarded \"website\" value: \"new.test\".".to_string()
        ));
        assert!(report.warnings.contains(
            &"Existing DocumentInstance found with different field values. Existing record will not be updated. Existing \"is_enabled\" value: \"true\". Discarded \"is_enabled\" value: \"false\".".to_string()
        ));

        let mut conn = ctx.pool().get().await.unwrap();
        let website: Option<String> = companies::table
            .select(companies::website)
            .first(&mut conn)
            .await
            .unwrap();
        assert_eq!(website.as_deref(), Some("old.test"));
        assert_eq!(ctx.jobs().enabled_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_module_registers_its_own_transform() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();
        let g = graph("Terms of Use", "en", "example.test/tos");

        loader.upsert(&g, "tests.first").await.unwrap();
        let report = loader.upsert(&g, "tests.second").await.unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Existing Document found with different field values."));
        assert!(report.warnings[0].contains("Discarded \"module\" value: \"tests.second\"."));
        assert_eq!(counts(&ctx).await, [1, 1, 1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_constraint_violation_rolls_back_whole_graph() {
        let (ctx, _dir) = setup_test_db().await;

        let err = ctx
            .loader()
            .upsert(&graph("Terms of Use", "eng", "example.test/tos"), "tests.tos")
            .await
            .unwrap_err();

        match err {
            LoadError::Constraint { entity, key, .. } => {
                assert_eq!(entity, "Language");
                assert_eq!(key, "eng");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counts(&ctx).await, [0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_documents_share_ancestors() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();

        loader
            .upsert(&graph("Terms of Use", "en", "example.test/tos"), "tests.tos")
            .await
            .unwrap();
        loader
            .upsert(&graph("Terms of Use", "fr", "example.test/fr/tos"), "tests.tos")
            .await
            .unwrap();
        loader
            .upsert(&graph("Privacy Policy", "en", "example.test/privacy"), "tests.tos")
            .await
            .unwrap();

        assert_eq!(counts(&ctx).await, [1, 1, 2, 2, 3, 2]);
    }

    #[test]
    fn test_divergence_warning_lists_every_field() {
        let diffs = vec![
            FieldDiff {
                field: "website",
                existing: "a".into(),
                discarded: "b".into(),
            },
            FieldDiff {
                field: "name",
                existing: "x".into(),
                discarded: "y".into(),
            },
        ];
        let warning = divergence_warning("Service", "Acme / Cloud", &diffs).unwrap();
        assert_eq!(
            warning,
            "Existing Service found with different field values. Existing record will not be updated. \
             Existing \"website\" value: \"a\". Discarded \"website\" value: \"b\". \
             Existing \"name\" value: \"x\". Discarded \"name\" value: \"y\"."
        );
        assert!(divergence_warning("Service", "Acme / Cloud", &[]).is_none());
    }
}

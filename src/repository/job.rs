//! Job queries: document instances joined with their ancestors, and the
//! transform registrations of their documents.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::TransformRecord;
use super::pool::{DbError, DbPool};
use crate::models::{Job, TransformRegistration};
use crate::schema::{companies, document_instances, documents, languages, services, transforms};

type JobRow = (i32, i32, String, bool, String, String, String, String, String);

fn job_from_row(row: JobRow) -> Job {
    let (
        instance_id,
        document_id,
        url,
        is_enabled,
        company_name,
        service_name,
        document_name,
        language_code,
        language_name,
    ) = row;
    Job {
        instance_id,
        document_id,
        url,
        is_enabled,
        company_name,
        service_name,
        document_name,
        language_code,
        language_name,
    }
}

impl From<TransformRecord> for TransformRegistration {
    fn from(record: TransformRecord) -> Self {
        TransformRegistration {
            id: record.id,
            document_id: record.document_id,
            module: record.module,
            execution_priority: record.execution_priority,
        }
    }
}

#[derive(Clone)]
pub struct JobRepository {
    pool: DbPool,
}

impl JobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All instances with `is_enabled` set, ordered by id.
    pub async fn enabled_jobs(&self) -> Result<Vec<Job>, DbError> {
        self.load_jobs(true, None).await
    }

    /// All instances, enabled or not.
    pub async fn all_jobs(&self) -> Result<Vec<Job>, DbError> {
        self.load_jobs(false, None).await
    }

    /// One instance by id, enabled or not.
    pub async fn job(&self, instance_id: i32) -> Result<Option<Job>, DbError> {
        Ok(self
            .load_jobs(false, Some(instance_id))
            .await?
            .into_iter()
            .next())
    }

    async fn load_jobs(
        &self,
        enabled_only: bool,
        instance_id: Option<i32>,
    ) -> Result<Vec<Job>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut query = document_instances::table
            .inner_join(documents::table.inner_join(services::table.inner_join(companies::table)))
            .inner_join(languages::table)
            .select((
                document_instances::id,
                document_instances::document_id,
                document_instances::url,
                document_instances::is_enabled,
                companies::name,
                services::name,
                documents::name,
                languages::code_iso_639_1,
                languages::name,
            ))
            .order(document_instances::id.asc())
            .into_boxed();

        if enabled_only {
            query = query.filter(document_instances::is_enabled.eq(true));
        }
        if let Some(id) = instance_id {
            query = query.filter(document_instances::id.eq(id));
        }

        query
            .load::<JobRow>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(job_from_row).collect())
    }

    /// Transform registrations for a batch of documents, keyed by document id.
    ///
    /// Each list is ordered by ascending execution priority, then id.
    pub async fn transforms_for_documents(
        &self,
        document_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<TransformRegistration>>, DbError> {
        if document_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let records: Vec<TransformRecord> = transforms::table
            .filter(transforms::document_id.eq_any(document_ids))
            .order((
                transforms::document_id.asc(),
                transforms::execution_priority.asc(),
                transforms::id.asc(),
            ))
            .select(TransformRecord::as_select())
            .load(&mut conn)
            .await?;

        let mut by_document: HashMap<i32, Vec<TransformRegistration>> = HashMap::new();
        for record in records {
            by_document
                .entry(record.document_id)
                .or_default()
                .push(TransformRegistration::from(record));
        }

        Ok(by_document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::models::NewTransform;
    use crate::repository::test_support::{graph, setup_test_db};

    #[tokio::test]
    async fn test_enabled_jobs_skip_disabled_instances() {
        let (ctx, _dir) = setup_test_db().await;
        let loader = ctx.loader();

        loader
            .upsert(&graph("Terms of Use", "en", "example.test/tos"), "tests")
            .await
            .unwrap();
        loader
            .upsert(
                &graph("Terms of Use", "de", "example.test/de/tos").disabled(),
                "tests",
            )
            .await
            .unwrap();

        let repo = ctx.jobs();
        let enabled = repo.enabled_jobs().await.unwrap();
        assert_eq!(enabled.len(), 1);

        let job = &enabled[0];
        assert_eq!(job.url, "example.test/tos");
        assert_eq!(job.company_name, "Test Inc");
        assert_eq!(job.service_name, "Test");
        assert_eq!(job.document_name, "Terms of Use");
        assert_eq!(job.language_code, "en");
        assert_eq!(job.to_string(), "Test Inc / Test / Terms of Use [en]");

        let all = repo.all_jobs().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[1].is_enabled);

        let found = repo.job(all[1].instance_id).await.unwrap().unwrap();
        assert_eq!(found.language_code, "de");
        assert!(repo.job(4242).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transforms_are_grouped_and_ordered() {
        let (ctx, _dir) = setup_test_db().await;
        let report = ctx
            .loader()
            .upsert(&graph("Privacy", "en", "example.test/privacy"), "tests.base")
            .await
            .unwrap();

        let repo = ctx.jobs();
        let job = repo.job(report.document_instance_id).await.unwrap().unwrap();

        let mut conn = ctx.pool().get().await.unwrap();
        for (module, execution_priority) in [("tests.late", 5), ("tests.early", -1)] {
            diesel::insert_into(transforms::table)
                .values(NewTransform {
                    document_id: job.document_id,
                    module,
                    execution_priority,
                })
                .execute(&mut conn)
                .await
                .unwrap();
        }

        let by_document = repo
            .transforms_for_documents(&[job.document_id, 999])
            .await
            .unwrap();

        let modules: Vec<&str> = by_document[&job.document_id]
            .iter()
            .map(|t| t.module.as_str())
            .collect();
        assert_eq!(modules, vec!["tests.early", "tests.base", "tests.late"]);
        assert!(!by_document.contains_key(&999));
    }
}

use crate::entities::credit_application::{
    CountApplications, DeleteApplication, GetApplicationById, InsertApplication,
    ListApplications, UpdateApplicationVersioned,
};
use crate::entities::{ApplicationStatus, CreditApplication};
use crate::framework::DatabaseProcessor;
use crate::repository::{ApplicationRepository, RepositoryError};
use async_trait::async_trait;
use kanau::processor::Processor;
use uuid::Uuid;

/// [`ApplicationRepository`] backed by the `credit_applications` table.
pub struct PgApplicationRepository {
    db: DatabaseProcessor,
}

impl PgApplicationRepository {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditApplication>, RepositoryError> {
        Ok(self.db.process(GetApplicationById { id }).await?)
    }

    async fn save(&self, application: &CreditApplication) -> Result<(), RepositoryError> {
        let result = self
            .db
            .process(InsertApplication {
                application: application.clone(),
            })
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RepositoryError::AlreadyExists(application.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        application: &CreditApplication,
    ) -> Result<CreditApplication, RepositoryError> {
        let updated = self
            .db
            .process(UpdateApplicationVersioned {
                application: application.clone(),
            })
            .await?;
        if let Some(updated) = updated {
            return Ok(updated);
        }
        // No row matched: either gone, or someone else bumped the version.
        match self.db.process(GetApplicationById { id: application.id }).await? {
            Some(_) => Err(RepositoryError::Conflict {
                id: application.id,
                expected_version: application.version,
            }),
            None => Err(RepositoryError::NotFound(application.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.db.process(DeleteApplication { id }).await?)
    }

    async fn list(
        &self,
        statuses: &[ApplicationStatus],
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CreditApplication>, i64), RepositoryError> {
        let applications = self
            .db
            .process(ListApplications {
                statuses: statuses.to_vec(),
                offset,
                limit,
            })
            .await?;
        let total = self
            .db
            .process(CountApplications {
                statuses: statuses.to_vec(),
            })
            .await?;
        Ok((applications, total))
    }
}

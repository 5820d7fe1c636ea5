use crate::entities::{ApplicationStatus, CreditApplication};
use crate::repository::{ApplicationRepository, RepositoryError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// [`ApplicationRepository`] held in process memory.
///
/// Follows the same version check as the Postgres repository.
#[derive(Default)]
pub struct InMemoryApplicationRepository {
    applications: RwLock<HashMap<Uuid, CreditApplication>>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditApplication>, RepositoryError> {
        Ok(self.applications.read().await.get(&id).cloned())
    }

    async fn save(&self, application: &CreditApplication) -> Result<(), RepositoryError> {
        let mut applications = self.applications.write().await;
        if applications.contains_key(&application.id) {
            return Err(RepositoryError::AlreadyExists(application.id));
        }
        applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn update(
        &self,
        application: &CreditApplication,
    ) -> Result<CreditApplication, RepositoryError> {
        let mut applications = self.applications.write().await;
        let Some(stored) = applications.get_mut(&application.id) else {
            return Err(RepositoryError::NotFound(application.id));
        };
        if stored.version != application.version {
            return Err(RepositoryError::Conflict {
                id: application.id,
                expected_version: application.version,
            });
        }
        *stored = CreditApplication {
            version: application.version + 1,
            id: stored.id,
            user_id: stored.user_id,
            created_at: stored.created_at,
            ..application.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.applications.write().await.remove(&id).is_some())
    }

    async fn list(
        &self,
        statuses: &[ApplicationStatus],
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CreditApplication>, i64), RepositoryError> {
        let applications = self.applications.read().await;
        let mut matching: Vec<&CreditApplication> = applications
            .values()
            .filter(|app| statuses.is_empty() || statuses.contains(&app.status))
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_application;

    #[tokio::test]
    async fn test_save_rejects_duplicates() {
        let repository = InMemoryApplicationRepository::new();
        let app = sample_application();
        repository.save(&app).await.unwrap();
        assert!(matches!(
            repository.save(&app).await,
            Err(RepositoryError::AlreadyExists(id)) if id == app.id
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_checks_it() {
        let repository = InMemoryApplicationRepository::new();
        let mut app = sample_application();
        repository.save(&app).await.unwrap();

        app.change_status(ApplicationStatus::ApplicationCreated).unwrap();
        let stored = repository.update(&app).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, ApplicationStatus::ApplicationCreated);

        // `app` still carries version 0.
        assert!(matches!(
            repository.update(&app).await,
            Err(RepositoryError::Conflict { expected_version: 0, .. })
        ));
        assert_eq!(repository.update(&stored).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repository = InMemoryApplicationRepository::new();
        let app = sample_application();
        assert!(matches!(
            repository.update(&app).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let repository = InMemoryApplicationRepository::new();
        let app = sample_application();
        repository.save(&app).await.unwrap();
        assert!(repository.delete(app.id).await.unwrap());
        assert!(!repository.delete(app.id).await.unwrap());
        assert!(repository.find_by_id(app.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let repository = InMemoryApplicationRepository::new();
        let base = time::OffsetDateTime::now_utc();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut app = sample_application();
            app.created_at = base + time::Duration::seconds(i);
            if i % 2 == 1 {
                app.status = ApplicationStatus::Scoring;
            }
            ids.push(app.id);
            repository.save(&app).await.unwrap();
        }

        let (page, total) = repository.list(&[], 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|a| a.id).collect::<Vec<_>>(), ids[1..3].to_vec());

        let (page, total) = repository
            .list(&[ApplicationStatus::Scoring], 0, 10)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.iter().map(|a| a.id).collect::<Vec<_>>(), vec![ids[1], ids[3]]);
    }
}

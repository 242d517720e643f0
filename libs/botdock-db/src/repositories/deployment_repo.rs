use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::deployment::{Deployment, DeploymentStatus};

#[derive(Clone)]
pub struct DeploymentRepository {
    pool: SqlitePool,
}

impl DeploymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Deployment>> {
        sqlx::query_as::<_, Deployment>("SELECT * FROM deployments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch deployment")
    }

    pub async fn insert(
        &self,
        user_id: i64,
        bot_name: &str,
        bot_token: Option<&str>,
    ) -> Result<Deployment> {
        sqlx::query_as::<_, Deployment>(
            "INSERT INTO deployments (user_id, bot_name, bot_token)
             VALUES (?, ?, ?)
             RETURNING id, user_id, bot_name, status, files_uploaded, bot_token,
                       railway_url, cancel_requested, created_at, updated_at",
        )
        .bind(user_id)
        .bind(bot_name)
        .bind(bot_token)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert deployment")
    }

    pub async fn mark_deployed(&self, id: i64, railway_url: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE deployments
             SET status = ?, railway_url = ?, files_uploaded = 1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(DeploymentStatus::Deployed)
        .bind(railway_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark deployment deployed")?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE deployments SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(DeploymentStatus::Failed)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark deployment failed")?;
        Ok(())
    }

    /// Cancels one of the caller's own deployments. Returns false when the
    /// deployment does not exist, belongs to someone else or is already
    /// finished.
    pub async fn request_cancel(&self, id: i64, user_id: i64) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE deployments
             SET cancel_requested = 1, status = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND user_id = ? AND status IN ('pending', 'deployed')",
        )
        .bind(DeploymentStatus::Cancelled)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to cancel deployment")?;
        Ok(res.rows_affected() == 1)
    }

    /// Deployments that currently occupy a plan slot.
    pub async fn count_active_for(&self, user_id: i64) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM deployments
             WHERE user_id = ? AND status IN ('pending', 'deployed')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count active deployments")
    }

    pub async fn list_for(&self, user_id: i64) -> Result<Vec<Deployment>> {
        sqlx::query_as::<_, Deployment>(
            "SELECT * FROM deployments WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list deployments")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_schema;
    use crate::repositories::user_repo::UserRepository;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        UserRepository::new(pool.clone())
            .upsert(42, Some("alice"), None)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_lifecycle() {
        let pool = test_pool().await;
        let repo = DeploymentRepository::new(pool);

        let dep = repo.insert(42, "shopbot", Some("123:abc")).await.unwrap();
        assert_eq!(dep.status, DeploymentStatus::Pending);
        assert!(!dep.files_uploaded);
        assert_eq!(repo.count_active_for(42).await.unwrap(), 1);

        repo.mark_deployed(dep.id, Some("https://railway.app/project/x"))
            .await
            .unwrap();
        let dep = repo.get(dep.id).await.unwrap().unwrap();
        assert_eq!(dep.status, DeploymentStatus::Deployed);
        assert!(dep.files_uploaded);
        assert_eq!(
            dep.railway_url.as_deref(),
            Some("https://railway.app/project/x")
        );
        assert_eq!(repo.count_active_for(42).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancel_only_own_and_unfinished() {
        let pool = test_pool().await;
        let repo = DeploymentRepository::new(pool);

        let dep = repo.insert(42, "shopbot", None).await.unwrap();
        assert!(!repo.request_cancel(dep.id, 999).await.unwrap());
        assert!(repo.request_cancel(dep.id, 42).await.unwrap());
        assert!(!repo.request_cancel(dep.id, 42).await.unwrap());

        let dep = repo.get(dep.id).await.unwrap().unwrap();
        assert_eq!(dep.status, DeploymentStatus::Cancelled);
        assert!(dep.cancel_requested);
        assert_eq!(repo.count_active_for(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_frees_slot() {
        let pool = test_pool().await;
        let repo = DeploymentRepository::new(pool);

        let dep = repo.insert(42, "shopbot", None).await.unwrap();
        repo.mark_failed(dep.id).await.unwrap();
        assert_eq!(repo.count_active_for(42).await.unwrap(), 0);

        let listed = repo.list_for(42).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, DeploymentStatus::Failed);
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::model::{NewTasting, Tasting, TastingStats};

/// In-memory tasting log.
#[derive(Debug, Clone, Default)]
pub struct TastingService {
    tastings: Arc<RwLock<Vec<Tasting>>>,
}

impl TastingService {
    #[instrument(skip(self, dto))]
    pub async fn create(&self, author_id: &str, dto: NewTasting) -> Tasting {
        let tasting = Tasting {
            id: Uuid::new_v4(),
            author_id: author_id.to_string(),
            dish: dto.dish.trim().to_string(),
            venue: dto.venue,
            rating: dto.rating,
            notes: dto.notes,
            created_at: Utc::now(),
        };

        self.tastings.write().await.push(tasting.clone());
        tasting
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<Tasting> {
        let mut tastings = self.tastings.read().await.clone();
        tastings.reverse();
        tastings
    }

    pub async fn get(&self, id: Uuid) -> Option<Tasting> {
        self.tastings
            .read()
            .await
            .iter()
            .find(|tasting| tasting.id == id)
            .cloned()
    }

    /// Returns `false` if no tasting has this id.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut tastings = self.tastings.write().await;
        let before = tastings.len();
        tastings.retain(|tasting| tasting.id != id);
        tastings.len() != before
    }

    pub async fn stats(&self) -> TastingStats {
        let tastings = self.tastings.read().await;
        let authors: HashSet<&str> = tastings.iter().map(|t| t.author_id.as_str()).collect();
        let average_rating = (!tastings.is_empty()).then(|| {
            tastings.iter().map(|t| f64::from(t.rating)).sum::<f64>() / tastings.len() as f64
        });

        TastingStats {
            total: tastings.len(),
            authors: authors.len(),
            average_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(dish: &str, rating: u8) -> NewTasting {
        NewTasting {
            dish: dish.to_string(),
            venue: None,
            rating,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let service = TastingService::default();
        let first = service.create("user-1", draft(" ramen ", 4)).await;
        let second = service.create("user-2", draft("pho", 2)).await;

        assert_eq!(first.dish, "ramen");
        let listed: Vec<Uuid> = service.list().await.iter().map(|t| t.id).collect();
        assert_eq!(listed, vec![second.id, first.id]);

        assert!(service.delete(first.id).await);
        assert!(!service.delete(first.id).await);
        assert!(service.get(first.id).await.is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let service = TastingService::default();
        assert_eq!(service.stats().await.average_rating, None);

        service.create("user-1", draft("ramen", 4)).await;
        service.create("user-1", draft("udon", 5)).await;
        service.create("user-2", draft("pho", 3)).await;

        let stats = service.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.authors, 2);
        assert_eq!(stats.average_rating, Some(4.0));
    }
}

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::theatre_model::{NewTheatre, Theatre, TheatreUpdate};
use crate::store::Store;

#[derive(Clone)]
pub struct TheatreRegistry {
    store: Arc<dyn Store>,
}

impl TheatreRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewTheatre) -> BookingResult<Theatre> {
        let theatre = Theatre::new(input)?;
        if self.store.find_theatre_by_name(&theatre.name).await?.is_some() {
            return Err(BookingError::Duplicate(format!(
                "theatre named {} already exists",
                theatre.name
            )));
        }
        self.store.insert_theatre(&theatre).await?;
        tracing::info!(theatre_id = %theatre.id, name = %theatre.name, "Theatre created");
        Ok(theatre)
    }

    pub async fn get(&self, id: ObjectId) -> BookingResult<Theatre> {
        self.store
            .find_theatre(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Theatre", id))
    }

    pub async fn list(&self, city: Option<&str>) -> BookingResult<Vec<Theatre>> {
        let city = city.map(str::trim).filter(|c| !c.is_empty());
        self.store.list_theatres(city).await
    }

    pub async fn update(&self, id: ObjectId, update: TheatreUpdate) -> BookingResult<Theatre> {
        let update = update.validate()?;
        if let Some(name) = &update.name {
            if let Some(other) = self.store.find_theatre_by_name(name).await? {
                if other.id != id {
                    return Err(BookingError::Duplicate(format!(
                        "theatre named {name} already exists"
                    )));
                }
            }
        }
        let theatre = self
            .store
            .update_theatre(id, &update)
            .await?
            .ok_or_else(|| BookingError::not_found("Theatre", id))?;
        tracing::info!(theatre_id = %id, "Theatre updated");
        Ok(theatre)
    }

    /// Shows of a deleted theatre stay stored but stop resolving.
    pub async fn delete(&self, id: ObjectId) -> BookingResult<()> {
        if !self.store.delete_theatre(id).await? {
            return Err(BookingError::not_found("Theatre", id));
        }
        tracing::info!(theatre_id = %id, "Theatre deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn input(name: &str, city: &str) -> NewTheatre {
        NewTheatre {
            name: Some(name.into()),
            description: Some("  ".into()),
            city: Some(city.into()),
            postal_code: Some("560001".into()),
            address: Some("4 Church Street".into()),
        }
    }

    #[tokio::test]
    async fn names_are_unique() {
        let registry = TheatreRegistry::new(Arc::new(MemoryStore::new()));
        let theatre = registry.create(input("Regal", "Bengaluru")).await.unwrap();
        assert_eq!(theatre.description, None);
        assert!(theatre.movies.is_empty());

        assert_matches!(
            registry.create(input("Regal", "Mumbai")).await,
            Err(BookingError::Duplicate(_))
        );
    }

    #[tokio::test]
    async fn list_filters_by_city() {
        let registry = TheatreRegistry::new(Arc::new(MemoryStore::new()));
        registry.create(input("Regal", "Bengaluru")).await.unwrap();
        registry.create(input("Odeon", "Mumbai")).await.unwrap();

        assert_eq!(registry.list(None).await.unwrap().len(), 2);
        let mumbai = registry.list(Some("Mumbai")).await.unwrap();
        assert_eq!(mumbai.len(), 1);
        assert_eq!(mumbai[0].name, "Odeon");
        assert_eq!(registry.list(Some(" ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_changes_details_but_keeps_names_unique() {
        let registry = TheatreRegistry::new(Arc::new(MemoryStore::new()));
        let regal = registry.create(input("Regal", "Bengaluru")).await.unwrap();
        registry.create(input("Odeon", "Mumbai")).await.unwrap();

        let moved = registry
            .update(
                regal.id,
                TheatreUpdate {
                    name: Some("Regal".into()),
                    address: Some("9 MG Road".into()),
                    ..TheatreUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.address, "9 MG Road");
        assert_eq!(moved.city, "Bengaluru");
        assert_eq!(registry.get(regal.id).await.unwrap(), moved);

        let rename = || TheatreUpdate {
            name: Some("Odeon".into()),
            ..TheatreUpdate::default()
        };
        assert_matches!(
            registry.update(regal.id, rename()).await,
            Err(BookingError::Duplicate(_))
        );
        let relocate = TheatreUpdate {
            city: Some("Pune".into()),
            ..TheatreUpdate::default()
        };
        assert_matches!(
            registry.update(ObjectId::new(), relocate).await,
            Err(BookingError::NotFound { entity: "Theatre", .. })
        );
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let registry = TheatreRegistry::new(Arc::new(MemoryStore::new()));
        let mut bad = input("Regal", "Bengaluru");
        bad.city = None;
        assert_matches!(registry.create(bad).await, Err(BookingError::InvalidRequest(_)));
    }
}

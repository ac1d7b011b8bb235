//! Seed Fixture Tests
//!
//! Fixtures are loaded through `ContentServices`, so their relationships are
//! validated and placed like any other.

#[cfg(test)]
mod seed_fixture_tests {
    use anyhow::Result;
    use relata_core::db::{DatabaseError, RelationshipTypeStore, SeedData};
    use relata_core::{ContentServices, Context, RepositoryConfig, ServiceError};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    const PUBLICATION: &str = "0b7f1c2e-5a61-4c1e-9a0f-3d1b2f6e7a01";
    const SMITH: &str = "0b7f1c2e-5a61-4c1e-9a0f-3d1b2f6e7a02";
    const DOE: &str = "0b7f1c2e-5a61-4c1e-9a0f-3d1b2f6e7a03";

    fn fixture(relationships: serde_json::Value) -> SeedData {
        SeedData::from_json(
            &json!({
                "relationshipTypes": [{
                    "id": 7,
                    "leftType": { "id": 1, "label": "Publication" },
                    "rightType": { "id": 2, "label": "Person" },
                    "leftwardType": "isAuthorOfPublication",
                    "rightwardType": "isPublicationOfAuthor",
                    "rightMaxCardinality": 1
                }],
                "items": [
                    { "id": PUBLICATION, "metadata": { "dspace.entity.type": ["Publication"] } },
                    { "id": SMITH, "metadata": {
                        "dspace.entity.type": ["Person"],
                        "person.familyName": ["Smith"],
                        "person.givenName": ["Jane"]
                    }},
                    { "id": DOE, "metadata": {
                        "dspace.entity.type": ["Person"],
                        "person.familyName": ["Doe"],
                        "person.givenName": ["John"]
                    }}
                ],
                "relationships": relationships
            })
            .to_string(),
        )
        .unwrap()
    }

    fn config() -> Result<RepositoryConfig> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "{}",
            json!({
                "virtualMetadata": {
                    "isAuthorOfPublication": {
                        "dc.contributor.author": {
                            "type": "concatenate",
                            "fields": ["person.familyName", "person.givenName"],
                            "useForPlace": true,
                            "populateWithNameVariant": true
                        }
                    }
                }
            })
        )?;
        Ok(RepositoryConfig::from_file(file.path())?)
    }

    #[tokio::test]
    async fn test_load_seed_creates_placed_relationships() -> Result<()> {
        let services = ContentServices::in_memory(config()?).await?;
        let seed = fixture(json!([
            { "relationshipTypeId": 7, "leftItem": PUBLICATION, "rightItem": SMITH },
            { "relationshipTypeId": 7, "leftItem": PUBLICATION, "rightItem": DOE,
              "rightwardValue": "Doe, J." }
        ]));

        let created = services.load_seed(&Context::anonymous(), &seed).await?;

        let places: Vec<(i32, i32)> = created.iter().map(|r| (r.left_place, r.right_place)).collect();
        assert_eq!(places, vec![(0, 0), (1, 0)]);
        assert!(services.store.get_relationship_type(7).await?.is_some());

        let publication = services.items.get(Uuid::parse_str(PUBLICATION)?).await?;
        let authors: Vec<String> = services
            .relationship_metadata
            .get_relationship_metadata(&publication, true)
            .await?
            .into_iter()
            .filter(|v| v.field.to_string() == "dc.contributor.author")
            .map(|v| v.value)
            .collect();
        assert_eq!(authors, vec!["Smith, Jane".to_string(), "Doe, J.".to_string()]);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_relationships_are_validated() -> Result<()> {
        let services = ContentServices::in_memory(RepositoryConfig::default()).await?;
        let second_publication = Uuid::new_v4();
        let mut seed = fixture(json!([
            { "relationshipTypeId": 7, "leftItem": PUBLICATION, "rightItem": SMITH },
            { "relationshipTypeId": 7, "leftItem": second_publication, "rightItem": SMITH }
        ]));
        seed.items.push(relata_core::db::SeedItem {
            id: second_publication,
            metadata: [("dspace.entity.type".to_string(), vec!["Publication".to_string()])].into(),
        });

        let err = services
            .load_seed(&Context::anonymous(), &seed)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidRelationship(_)), "got {:?}", err);
        assert_eq!(services.relationships.count_total().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_items_are_rejected() -> Result<()> {
        let services = ContentServices::in_memory(RepositoryConfig::default()).await?;
        let seed = fixture(json!([
            { "relationshipTypeId": 7, "leftItem": PUBLICATION, "rightItem": Uuid::new_v4() }
        ]));

        let err = services
            .load_seed(&Context::anonymous(), &seed)
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::DatabaseError(DatabaseError::InvalidFixture(_))),
            "got {:?}",
            err
        );
        assert_eq!(services.relationships.count_total().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_relationship_type_is_a_database_error() -> Result<()> {
        let services = ContentServices::in_memory(RepositoryConfig::default()).await?;
        let seed = fixture(json!([
            { "relationshipTypeId": 8, "leftItem": PUBLICATION, "rightItem": SMITH }
        ]));

        let err = services
            .load_seed(&Context::anonymous(), &seed)
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                ServiceError::DatabaseError(DatabaseError::RelationshipTypeNotFound { id: 8 })
            ),
            "got {:?}",
            err
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reloading_a_seed_reports_duplicates() -> Result<()> {
        let services = ContentServices::in_memory(RepositoryConfig::default()).await?;
        let seed = fixture(json!([]));
        services.load_seed(&Context::anonymous(), &seed).await?;

        let err = services
            .load_seed(&Context::anonymous(), &seed)
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::DatabaseError(DatabaseError::Duplicate { .. })),
            "got {:?}",
            err
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = RepositoryConfig::default();
        config.relationship.update_related_items_max = 0;

        assert!(matches!(
            ContentServices::in_memory(config).await,
            Err(ServiceError::Configuration(_))
        ));
    }
}

//! Relation definitions between collections.

use serde::{Deserialize, Serialize};

/// Kind of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Foreign key on this collection points at one related row.
    ManyToOne,
    /// Foreign key on the related collection points back at this one.
    OneToMany,
    /// Both sides reached through a junction collection.
    ManyToMany,
    /// Junction rows carry a discriminator naming the target collection.
    ManyToAny,
}

/// Junction collection used by many-to-many and many-to-any relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionDef {
    /// Junction collection name.
    pub collection: String,
    /// Junction column pointing back at the owning collection.
    pub field: String,
    /// Junction column pointing at the related item.
    pub related_field: String,
    /// Discriminator column naming the target collection (many-to-any only).
    pub collection_field: Option<String>,
}

/// A relation declared on a collection.
///
/// The join condition is uniform across kinds: `owner.field` meets
/// `related.related_field`, with the junction in between for m2m/m2a.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation field name on the owning collection.
    pub name: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Owning collection.
    pub collection: String,
    /// Key on the owning side (FK for m2o, primary key otherwise).
    pub field: String,
    /// Target collection; `None` for many-to-any (chosen per query).
    pub related_collection: Option<String>,
    /// Key on the target side (primary key for m2o, FK for o2m).
    pub related_field: String,
    /// Junction for m2m/m2a relations.
    pub junction: Option<JunctionDef>,
}

impl RelationDef {
    /// Create a many-to-one relation.
    pub fn many_to_one(
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
        related_collection: impl Into<String>,
        related_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToOne,
            collection: collection.into(),
            field: field.into(),
            related_collection: Some(related_collection.into()),
            related_field: related_field.into(),
            junction: None,
        }
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
        related_collection: impl Into<String>,
        related_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::OneToMany,
            collection: collection.into(),
            field: field.into(),
            related_collection: Some(related_collection.into()),
            related_field: related_field.into(),
            junction: None,
        }
    }

    /// Create a many-to-many relation through a junction collection.
    pub fn many_to_many(
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
        related_collection: impl Into<String>,
        related_field: impl Into<String>,
        junction: JunctionDef,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToMany,
            collection: collection.into(),
            field: field.into(),
            related_collection: Some(related_collection.into()),
            related_field: related_field.into(),
            junction: Some(junction),
        }
    }

    /// Create a many-to-any relation; the target collection is selected by
    /// each query and the junction's discriminator column pins the branch.
    pub fn many_to_any(
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
        junction: JunctionDef,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToAny,
            collection: collection.into(),
            field: field.into(),
            related_collection: None,
            related_field: String::new(),
            junction: Some(junction),
        }
    }

    /// Check if this relation goes through a junction collection.
    pub fn uses_junction(&self) -> bool {
        self.junction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_one() {
        let rel = RelationDef::many_to_one("author", "articles", "author", "users", "id");
        assert_eq!(rel.kind, RelationKind::ManyToOne);
        assert_eq!(rel.related_collection.as_deref(), Some("users"));
        assert!(!rel.uses_junction());
    }

    #[test]
    fn test_many_to_many() {
        let rel = RelationDef::many_to_many(
            "tags",
            "articles",
            "id",
            "tags",
            "id",
            JunctionDef {
                collection: "articles_tags".into(),
                field: "article_id".into(),
                related_field: "tag_id".into(),
                collection_field: None,
            },
        );
        assert_eq!(rel.kind, RelationKind::ManyToMany);
        assert!(rel.uses_junction());
    }

    #[test]
    fn test_many_to_any() {
        let rel = RelationDef::many_to_any(
            "item",
            "blocks",
            "id",
            JunctionDef {
                collection: "blocks_items".into(),
                field: "block_id".into(),
                related_field: "item".into(),
                collection_field: Some("collection".into()),
            },
        );
        assert_eq!(rel.kind, RelationKind::ManyToAny);
        assert!(rel.related_collection.is_none());
        assert_eq!(
            rel.junction.unwrap().collection_field.as_deref(),
            Some("collection")
        );
    }
}

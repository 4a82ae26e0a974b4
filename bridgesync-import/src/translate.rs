//! Bridge translation: raw remote records to [`MixedRepresentation`] trees.
//!
//! A [`RecordMapper`] knows how to read one remote record. [`translate`]
//! drives it over a record list, recursing into related record sets with
//! derived user info. Cancellation is checked before every record and
//! every relationship; a cancelled translation yields no representations.

use crate::cancel::{check_cancelled, is_cancellation};
use crate::error::{ImportError, ImportResult};
use bridgesync_model::{
    Attributes, BoxError, EntityName, MergePolicy, MixedRelationship, MixedRepresentation,
    RelationshipKey, UniquingId,
};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// What a mapper reads out of one remote record.
#[derive(Debug, Clone)]
pub struct RecordMapping<R> {
    pub entity: EntityName,
    pub uniquing_id: Option<UniquingId>,
    pub attributes: Attributes,
    /// `None` clears the relationship.
    pub relationships: BTreeMap<RelationshipKey, Option<RelatedRecords<R>>>,
}

/// Nested remote records for one relationship.
#[derive(Debug, Clone)]
pub struct RelatedRecords<R> {
    /// The entity the nested records are expected to map to.
    pub entity: EntityName,
    pub records: Vec<R>,
}

impl<R> RecordMapping<R> {
    pub fn new(entity: impl Into<EntityName>) -> Self {
        Self {
            entity: entity.into(),
            uniquing_id: None,
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
        }
    }
}

/// Reads remote records of one bridge.
pub trait RecordMapper {
    type Record;
    type UserInfo;
    type Metadata;

    /// Maps one record. `Ok(None)` skips the record.
    fn map_record(
        &self,
        record: &Self::Record,
        expected_entity: &EntityName,
        user_info: &Self::UserInfo,
    ) -> Result<Option<RecordMapping<Self::Record>>, BoxError>;

    /// User info for the records of a relationship.
    fn sub_user_info(&self, user_info: &Self::UserInfo, relationship: &str) -> Self::UserInfo;

    /// Merge policy of a relationship.
    fn merge_policy(
        &self,
        _entity: &EntityName,
        _relationship: &str,
        _user_info: &Self::UserInfo,
    ) -> MergePolicy {
        MergePolicy::Replace
    }

    /// Metadata carried with a relationship into the change set.
    fn relationship_metadata(
        &self,
        _entity: &EntityName,
        _relationship: &str,
        _user_info: &Self::UserInfo,
    ) -> Option<Self::Metadata> {
        None
    }
}

/// Translates `records` into representations of `expected_entity`.
pub fn translate<T>(
    mapper: &T,
    records: &[T::Record],
    expected_entity: &EntityName,
    user_info: &T::UserInfo,
    cancel: &CancellationToken,
) -> ImportResult<Vec<MixedRepresentation<T::Metadata>>>
where
    T: RecordMapper + ?Sized,
{
    let mut representations = Vec::with_capacity(records.len());
    for record in records {
        check_cancelled(cancel)?;
        let mapping = mapper
            .map_record(record, expected_entity, user_info)
            .map_err(|e| {
                if is_cancellation(e.as_ref()) {
                    ImportError::Cancelled
                } else {
                    ImportError::Mapping(e)
                }
            })?;
        let Some(mapping) = mapping else {
            continue;
        };

        let mut relationships = BTreeMap::new();
        for (key, related) in mapping.relationships {
            check_cancelled(cancel)?;
            let value = match related {
                None => None,
                Some(related) => {
                    let sub_info = mapper.sub_user_info(user_info, &key);
                    let nested = translate(mapper, &related.records, &related.entity, &sub_info, cancel)?;
                    Some(MixedRelationship {
                        representations: nested,
                        merge_policy: mapper.merge_policy(&mapping.entity, &key, user_info),
                        metadata: mapper.relationship_metadata(&mapping.entity, &key, user_info),
                    })
                }
            };
            relationships.insert(key, value);
        }

        representations.push(MixedRepresentation {
            entity: mapping.entity,
            uniquing_id: mapping.uniquing_id,
            attributes: mapping.attributes,
            relationships,
        });
    }
    Ok(representations)
}

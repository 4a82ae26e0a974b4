use crate::cancel::check_cancelled;
use crate::error::ImportResult;
use bridgesync_model::{
    EntityName, GenericLocalObject, MixedRepresentation, RelationshipValue, UniquingId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Uniquing IDs seen during a build, per entity; drives the batched prefetch.
pub type UniquingIdsByEntity = HashMap<EntityName, HashSet<UniquingId>>;

/// Output of [`build_graph`].
#[derive(Debug, Clone)]
pub struct ObjectGraph<M> {
    pub objects: Vec<GenericLocalObject<M>>,
    pub uniquing_ids: UniquingIdsByEntity,
}

/// Resolves a representation tree into generic local objects.
///
/// No store access happens here. Cancellation is checked between siblings
/// and before descending into a relationship.
pub fn build_graph<M>(
    representations: Vec<MixedRepresentation<M>>,
    cancel: &CancellationToken,
) -> ImportResult<ObjectGraph<M>> {
    let mut uniquing_ids = UniquingIdsByEntity::new();
    let objects = build_level(representations, &mut uniquing_ids, cancel)?;
    Ok(ObjectGraph {
        objects,
        uniquing_ids,
    })
}

fn build_level<M>(
    representations: Vec<MixedRepresentation<M>>,
    uniquing_ids: &mut UniquingIdsByEntity,
    cancel: &CancellationToken,
) -> ImportResult<Vec<GenericLocalObject<M>>> {
    let mut objects = Vec::with_capacity(representations.len());
    for representation in representations {
        check_cancelled(cancel)?;

        let mut relationships = BTreeMap::new();
        for (key, value) in representation.relationships {
            let value = match value {
                None => None,
                Some(relationship) => {
                    check_cancelled(cancel)?;
                    Some(RelationshipValue {
                        objects: build_level(relationship.representations, uniquing_ids, cancel)?,
                        merge_policy: relationship.merge_policy,
                        metadata: relationship.metadata,
                    })
                }
            };
            relationships.insert(key, value);
        }

        if let Some(id) = &representation.uniquing_id {
            uniquing_ids
                .entry(representation.entity.clone())
                .or_default()
                .insert(id.clone());
        }
        objects.push(GenericLocalObject {
            entity: representation.entity,
            uniquing_id: representation.uniquing_id,
            attributes: representation.attributes,
            relationships,
        });
    }
    Ok(objects)
}

/// Collects the uniquing IDs of an already built object tree.
pub fn collect_uniquing_ids<M>(objects: &[GenericLocalObject<M>]) -> UniquingIdsByEntity {
    let mut ids = UniquingIdsByEntity::new();
    collect_into(objects, &mut ids);
    ids
}

fn collect_into<M>(objects: &[GenericLocalObject<M>], ids: &mut UniquingIdsByEntity) {
    for object in objects {
        if let Some(id) = &object.uniquing_id {
            ids.entry(object.entity.clone()).or_default().insert(id.clone());
        }
        for value in object.relationships.values().flatten() {
            collect_into(&value.objects, ids);
        }
    }
}

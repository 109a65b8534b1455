use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

use crate::entity::{images, layers};
use crate::error::IngestError;
use crate::store;

/// Account owning the organization-provided starting-point images. Base
/// image resolution only considers candidates from this account.
pub const GOLDEN_ACCOUNT_ID: &str = "golden";

/// Persist the ordered layer sequence of an image. Idempotent: a row that
/// already holds the right digest at a position is left alone; a differing
/// digest is replaced, and positions past the end of the new sequence are
/// dropped.
pub async fn save_layers<C: ConnectionTrait>(
    db: &C,
    image_id: i32,
    digests: &[String],
) -> Result<(), IngestError> {
    log::info!("saving layer information for image {image_id}");
    for (seq, digest) in digests.iter().enumerate() {
        let seq = seq as i32;
        let existing = layers::Entity::find()
            .filter(layers::Column::ImageId.eq(image_id))
            .filter(layers::Column::Seq.eq(seq))
            .all(db)
            .await
            .map_err(IngestError::from_db)?;

        if existing.iter().any(|layer| layer.digest == *digest) {
            if existing.len() == 1 {
                log::debug!("image {image_id} already has layer {digest} at {seq}");
                continue;
            }
        } else {
            layers::ActiveModel {
                image_id: Set(image_id),
                seq: Set(seq),
                digest: Set(digest.clone()),
                created_at: Set(store::now()),
            }
            .insert(db)
            .await
            .map_err(IngestError::from_db)?;
            log::debug!("image {image_id} gained layer {digest} at {seq}");
        }

        // Clear out any stale digest left at this position by an earlier pull.
        layers::Entity::delete_many()
            .filter(layers::Column::ImageId.eq(image_id))
            .filter(layers::Column::Seq.eq(seq))
            .filter(layers::Column::Digest.ne(digest.as_str()))
            .exec(db)
            .await
            .map_err(IngestError::from_db)?;
    }

    layers::Entity::delete_many()
        .filter(layers::Column::ImageId.eq(image_id))
        .filter(layers::Column::Seq.gte(digests.len() as i32))
        .exec(db)
        .await
        .map_err(IngestError::from_db)?;

    Ok(())
}

/// True iff `parent` is a strict, ordered prefix of `child`: strictly fewer
/// layers, and the same (digest, seq) pair at every parent position. A
/// candidate with equal-or-more layers never qualifies, even if its layers
/// are a superset in content.
pub fn is_parent_chain(parent: &[layers::Model], child: &[layers::Model]) -> bool {
    if parent.len() >= child.len() {
        return false;
    }
    parent
        .iter()
        .zip(child.iter())
        .all(|(p, c)| p.same_as(c))
}

async fn sorted_layers<C: ConnectionTrait>(
    db: &C,
    image_id: i32,
) -> Result<Vec<layers::Model>, IngestError> {
    layers::Entity::find()
        .filter(layers::Column::ImageId.eq(image_id))
        .order_by_asc(layers::Column::Seq)
        .all(db)
        .await
        .map_err(IngestError::from_db)
}

/// Find the most specific image whose layer sequence is a strict prefix of
/// the target's. Candidates are prefiltered to images sharing the target's
/// first layer; among the containing ones, the one with the most layers
/// wins. No match is a valid outcome, not an error.
async fn detect_parent<C: ConnectionTrait>(
    db: &C,
    image: &images::Model,
    golden_only: bool,
) -> Result<Option<images::Model>, IngestError> {
    let image_layers = sorted_layers(db, image.id).await?;
    let Some(first) = image_layers.first() else {
        log::warn!("no layers found for {image}, skipping lineage resolution");
        return Ok(None);
    };

    let mut query = images::Entity::find()
        .join(JoinType::InnerJoin, images::Relation::Layers.def())
        .filter(layers::Column::Digest.eq(first.digest.as_str()))
        .filter(layers::Column::Seq.eq(first.seq))
        .filter(images::Column::Id.ne(image.id))
        .distinct();
    if golden_only {
        query = query.filter(images::Column::AccountId.eq(GOLDEN_ACCOUNT_ID));
    }
    let candidates = query.all(db).await.map_err(IngestError::from_db)?;

    let mut best: Option<(images::Model, usize)> = None;
    for candidate in candidates {
        let candidate_layers = sorted_layers(db, candidate.id).await?;
        if !is_parent_chain(&candidate_layers, &image_layers) {
            continue;
        }
        log::debug!("matched candidate: {candidate}");
        let depth = candidate_layers.len();
        if best.as_ref().map_or(true, |(_, n)| depth > *n) {
            best = Some((candidate, depth));
        }
    }
    Ok(best.map(|(model, _)| model))
}

pub async fn resolve_parent_image<C: ConnectionTrait>(
    db: &C,
    image: &images::Model,
) -> Result<Option<i32>, IngestError> {
    log::info!("detecting parent image for {image}");
    let Some(parent) = detect_parent(db, image, false).await? else {
        log::debug!("no parent image found for {image}");
        return Ok(None);
    };
    let mut active: images::ActiveModel = image.clone().into();
    active.parent_image_id = Set(Some(parent.id));
    active.updated_at = Set(store::now());
    active.update(db).await.map_err(IngestError::from_db)?;
    log::info!("parent image updated for {image} to {parent}");
    Ok(Some(parent.id))
}

pub async fn resolve_base_image<C: ConnectionTrait>(
    db: &C,
    image: &images::Model,
) -> Result<Option<i32>, IngestError> {
    log::info!("detecting base image for {image}");
    let Some(base) = detect_parent(db, image, true).await? else {
        log::debug!("no base image found for {image}");
        return Ok(None);
    };
    let mut active: images::ActiveModel = image.clone().into();
    active.base_image_id = Set(Some(base.id));
    active.updated_at = Set(store::now());
    active.update(db).await.map_err(IngestError::from_db)?;
    log::info!("base image updated for {image} to {base}");
    Ok(Some(base.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(image_id: i32, seq: i32, digest: &str) -> layers::Model {
        layers::Model {
            image_id,
            seq,
            digest: digest.to_string(),
            created_at: store::now(),
        }
    }

    fn chain(image_id: i32, digests: &[&str]) -> Vec<layers::Model> {
        digests
            .iter()
            .enumerate()
            .map(|(seq, digest)| layer(image_id, seq as i32, digest))
            .collect()
    }

    #[test]
    fn strict_prefix_is_parent() {
        let parent = chain(1, &["l1", "l2"]);
        let child = chain(2, &["l1", "l2", "l3"]);
        assert!(is_parent_chain(&parent, &child));
    }

    #[test]
    fn longer_sequence_is_never_parent() {
        let a = chain(1, &["l1", "l2", "l3"]);
        let b = chain(2, &["l1", "l2"]);
        assert!(!is_parent_chain(&a, &b));
    }

    #[test]
    fn equal_length_is_never_parent() {
        let a = chain(1, &["l1", "l2"]);
        let b = chain(2, &["l1", "l2"]);
        assert!(!is_parent_chain(&a, &b));
    }

    #[test]
    fn mismatched_digest_breaks_the_chain() {
        let parent = chain(1, &["l1", "lX"]);
        let child = chain(2, &["l1", "l2", "l3"]);
        assert!(!is_parent_chain(&parent, &child));
    }

    #[test]
    fn sequence_position_matters_not_just_content() {
        // same digests, shifted by one position
        let parent = vec![layer(1, 1, "l1"), layer(1, 2, "l2")];
        let child = chain(2, &["l1", "l2", "l3"]);
        assert!(!is_parent_chain(&parent, &child));
    }
}

//! Which references to follow, and which side of each holds the key.

use std::sync::Arc;

use super::errors::GraphError;
use crate::entity_catalog::{EntityMetadata, ReferenceLink, ReferenceProperty};

/// Reference properties to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Include {
    /// Every declared reference
    #[default]
    All,
    /// Root rows only
    Nothing,
    /// The named references
    Only(Vec<String>),
}

impl Include {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Include::Only(names.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone)]
pub struct ReferencePlan {
    pub reference: ReferenceProperty,
    pub child: Arc<EntityMetadata>,
    pub link: ReferenceLink,
}

/// Resolve the references of `meta` selected by `include`, in declaration
/// order.
pub fn plan_references(
    meta: &EntityMetadata,
    include: &Include,
) -> Result<Vec<ReferencePlan>, GraphError> {
    let selected: Vec<&ReferenceProperty> = match include {
        Include::All => meta.references().iter().collect(),
        Include::Nothing => Vec::new(),
        Include::Only(names) => names
            .iter()
            .map(|name| {
                meta.reference(name).ok_or_else(|| GraphError::UnknownInclude {
                    entity: meta.name().to_string(),
                    reference: name.clone(),
                })
            })
            .collect::<Result<_, _>>()?,
    };

    selected
        .into_iter()
        .map(|reference| {
            let child = reference.target.metadata();
            let link = meta.resolve_reference(reference, &child)?;
            Ok(ReferencePlan {
                reference: reference.clone(),
                child,
                link,
            })
        })
        .collect()
}

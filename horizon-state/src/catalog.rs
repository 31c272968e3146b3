//! Entitled linear channels, rebuilt wholesale on every connect

use crate::model::ChannelId;
use horizon_api::ChannelRecord;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// A channel the household may watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    pub display_name: String,
    pub logical_number: Option<String>,
    pub stream_artwork_url: String,
    pub logo_artwork_url: Option<String>,
}

impl From<&ChannelRecord> for ChannelDescriptor {
    fn from(record: &ChannelRecord) -> Self {
        Self {
            id: ChannelId::new(record.id.clone()),
            display_name: record.name.clone(),
            logical_number: record.logical_channel_number.clone(),
            stream_artwork_url: record.stream_artwork(),
            logo_artwork_url: record.logo_artwork(),
        }
    }
}

/// Immutable channel lookup table in upstream order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCatalog {
    channels: Vec<ChannelDescriptor>,
    index: HashMap<ChannelId, usize>,
}

impl ChannelCatalog {
    /// Keep non-radio channels sharing a product with the entitlements
    ///
    /// A repeated id overwrites the earlier entry but keeps its position.
    pub fn build(records: &[ChannelRecord], entitlements: &HashSet<String>) -> Self {
        let mut catalog = Self::default();

        for record in records {
            if record.is_radio {
                continue;
            }
            if !record.linear_products.iter().any(|p| entitlements.contains(p)) {
                continue;
            }

            let descriptor = ChannelDescriptor::from(record);
            match catalog.index.get(&descriptor.id) {
                Some(&position) => catalog.channels[position] = descriptor,
                None => {
                    catalog.index.insert(descriptor.id.clone(), catalog.channels.len());
                    catalog.channels.push(descriptor);
                }
            }
        }

        info!(
            channels = catalog.len(),
            offered = records.len(),
            "Channel catalog built"
        );
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&ChannelDescriptor> {
        self.index
            .get(&ChannelId::new(id))
            .map(|&position| &self.channels[position])
    }

    /// First channel, in upstream order, whose display name matches exactly
    pub fn find_by_name(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.channels.iter().find(|c| c.display_name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Shared reference to the current catalog
///
/// Readers clone the inner `Arc`; a rebuild swaps the reference.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<ChannelCatalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: ChannelCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub fn current(&self) -> Arc<ChannelCatalog> {
        self.current.read().clone()
    }

    pub fn replace(&self, catalog: ChannelCatalog) {
        *self.current.write() = Arc::new(catalog);
    }
}

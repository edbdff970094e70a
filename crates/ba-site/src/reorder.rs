use ba_api_types::ArtworkOrderRequest;
use ba_storefront_client::StorefrontApi;
use tracing::info;

use crate::SiteError;

/// Admin drag-and-drop ordering of the artwork grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkOrder {
    titles: Vec<String>,
    dragged: Option<usize>,
}

impl ArtworkOrder {
    pub fn new(titles: Vec<String>) -> Self {
        Self {
            titles,
            dragged: None,
        }
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn drag_start(&mut self, index: usize) {
        self.dragged = (index < self.titles.len()).then_some(index);
    }

    pub fn drag_end(&mut self) {
        self.dragged = None;
    }

    /// Drop onto the tile at `target`: the dragged tile lands just before
    /// it. Returns whether the order changed.
    pub fn drop_on(&mut self, target: usize) -> bool {
        let Some(from) = self.dragged.take() else {
            return false;
        };
        if target >= self.titles.len() || from == target || from + 1 == target {
            return false;
        }
        let title = self.titles.remove(from);
        let to = if from < target { target - 1 } else { target };
        self.titles.insert(to, title);
        true
    }

    pub async fn save<A: StorefrontApi>(&self, api: &A) -> Result<(), SiteError> {
        let request = ArtworkOrderRequest {
            titles: self.titles.clone(),
        };
        api.update_artwork_order(&request).await?;
        info!(count = self.titles.len(), "artwork order saved");
        Ok(())
    }
}

use std::sync::Arc;

use tgdisk_blob::TransferAdapter;

use crate::{AccessGuard, LinkBuilder};

/// Shared handler state: the transfer engine plus request policy
#[derive(Clone)]
pub struct TgDiskState {
    pub transfers: Arc<TransferAdapter>,
    pub access: AccessGuard,
    pub links: LinkBuilder,
}

impl TgDiskState {
    pub fn new(transfers: TransferAdapter, access: AccessGuard) -> Self {
        Self {
            transfers: Arc::new(transfers),
            access,
            links: LinkBuilder::default(),
        }
    }

    /// Build download links against a fixed public URL instead of the request's host
    pub fn with_public_base(mut self, base_url: impl Into<String>) -> Self {
        self.links = LinkBuilder::with_base(base_url);
        self
    }
}

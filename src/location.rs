// Current page location seam (`window.location.href`)

use parking_lot::RwLock;
use url::Url;

pub trait PageLocation: Send + Sync {
    fn href(&self) -> String;

    fn url(&self) -> Option<Url> {
        Url::parse(&self.href()).ok()
    }
}

/// Location updated by whoever drives navigation
#[derive(Debug, Default)]
pub struct SharedLocation {
    href: RwLock<String>,
}

impl SharedLocation {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: RwLock::new(href.into()),
        }
    }

    pub fn set(&self, href: impl Into<String>) {
        *self.href.write() = href.into();
    }
}

impl PageLocation for SharedLocation {
    fn href(&self) -> String {
        self.href.read().clone()
    }
}

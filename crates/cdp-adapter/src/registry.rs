//! Adapter registry keeping track of pages, their sessions and attached frame targets.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::ids::{PageId, SessionId};

/// An out-of-process iframe auto-attached under a page session.
///
/// Chrome reuses the frame id as the target id for these frames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTarget {
    pub target_id: String,
    pub cdp_session: String,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetContext {
    pub session_id: SessionId,
    pub target_id: Option<String>,
    pub cdp_session: Option<String>,
    pub recent_url: Option<String>,
    /// Attach order is preserved.
    pub frame_targets: Vec<FrameTarget>,
}

/// Concurrent registry for pages and sessions.
pub struct Registry {
    pages: DashMap<PageId, TargetContext>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
        }
    }

    pub fn insert_page(
        &self,
        page: PageId,
        session: SessionId,
        target_id: Option<String>,
        cdp_session: Option<String>,
    ) {
        let ctx = TargetContext {
            session_id: session,
            target_id,
            cdp_session,
            recent_url: None,
            frame_targets: Vec::new(),
        };
        self.pages.insert(page, ctx);
    }

    pub fn remove_page(&self, page: &PageId) {
        self.pages.remove(page);
    }

    pub fn get(&self, page: &PageId) -> Option<TargetContext> {
        self.pages.get(page).map(|entry| entry.value().clone())
    }

    pub fn pages(&self) -> Vec<PageId> {
        self.pages.iter().map(|kv| *kv.key()).collect()
    }

    pub fn clear(&self) {
        self.pages.clear();
    }

    pub fn set_recent_url(&self, page: &PageId, url: String) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            entry.recent_url = Some(url);
        }
    }

    pub fn set_cdp_session(&self, page: &PageId, session: String) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            entry.cdp_session = Some(session);
        }
    }

    pub fn get_cdp_session(&self, page: &PageId) -> Option<String> {
        self.pages
            .get(page)
            .and_then(|entry| entry.cdp_session.clone())
    }

    /// Record an attached frame target; re-attaching the same target replaces its session.
    pub fn upsert_frame_target(&self, page: &PageId, frame: FrameTarget) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            if let Some(existing) = entry
                .frame_targets
                .iter_mut()
                .find(|f| f.target_id == frame.target_id)
            {
                *existing = frame;
            } else {
                entry.frame_targets.push(frame);
            }
        }
    }

    /// Drop the frame target bound to `cdp_session`, returning the owning page if any.
    pub fn remove_frame_session(&self, cdp_session: &str) -> Option<PageId> {
        for mut entry in self.pages.iter_mut() {
            let before = entry.frame_targets.len();
            entry.frame_targets.retain(|f| f.cdp_session != cdp_session);
            if entry.frame_targets.len() != before {
                return Some(*entry.key());
            }
        }
        None
    }

    pub fn frame_targets(&self, page: &PageId) -> Vec<FrameTarget> {
        self.pages
            .get(page)
            .map(|entry| entry.frame_targets.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(target: &str, session: &str) -> FrameTarget {
        FrameTarget {
            target_id: target.into(),
            cdp_session: session.into(),
            url: None,
        }
    }

    #[test]
    fn frame_targets_keep_attach_order_and_replace_on_reattach() {
        let registry = Registry::new();
        let page = PageId::new();
        registry.insert_page(page, SessionId::new(), Some("T".into()), Some("S".into()));

        registry.upsert_frame_target(&page, frame("A", "s-a"));
        registry.upsert_frame_target(&page, frame("B", "s-b"));
        registry.upsert_frame_target(&page, frame("A", "s-a2"));

        let frames = registry.frame_targets(&page);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].target_id, "A");
        assert_eq!(frames[0].cdp_session, "s-a2");
        assert_eq!(frames[1].target_id, "B");

        assert_eq!(registry.remove_frame_session("s-b"), Some(page));
        assert_eq!(registry.remove_frame_session("missing"), None);
        assert_eq!(registry.frame_targets(&page).len(), 1);
    }
}

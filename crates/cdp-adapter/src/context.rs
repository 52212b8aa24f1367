use crate::ids::PageId;
use crate::transport::CommandTarget;

/// One document of a page that scripts can be evaluated against.
///
/// The main document has no frame handle. Same-process frames carry an isolated-world
/// execution context created on the page session; out-of-process frames carry their own
/// flattened session and evaluate in that session's default context.
#[derive(Clone, Debug, PartialEq)]
pub struct BrowsingContext {
    pub page: PageId,
    pub frame: Option<FrameHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameHandle {
    pub frame_id: String,
    pub url: Option<String>,
    pub session: Option<String>,
    pub execution_context_id: Option<i64>,
}

impl BrowsingContext {
    pub fn main(page: PageId) -> Self {
        Self { page, frame: None }
    }

    pub fn frame(page: PageId, frame: FrameHandle) -> Self {
        Self {
            page,
            frame: Some(frame),
        }
    }

    pub fn is_main(&self) -> bool {
        self.frame.is_none()
    }

    /// Short label for logs: `main` or `frame:<id>`.
    pub fn label(&self) -> String {
        match &self.frame {
            None => "main".to_string(),
            Some(frame) => format!("frame:{}", frame.frame_id),
        }
    }

    pub(crate) fn oopif_session(&self) -> Option<&str> {
        self.frame.as_ref().and_then(|f| f.session.as_deref())
    }

    pub(crate) fn command_target(&self, page_session: &str) -> CommandTarget {
        match self.oopif_session() {
            Some(session) => CommandTarget::Session(session.to_string()),
            None => CommandTarget::Session(page_session.to_string()),
        }
    }

    pub(crate) fn execution_context_id(&self) -> Option<i64> {
        self.frame.as_ref().and_then(|f| f.execution_context_id)
    }
}

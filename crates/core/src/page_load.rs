//! Page raster loading gate
//!
//! Rasterizing a plan page is the only asynchronous collaborator. Each request
//! gets a generation number; a newer request supersedes older ones, and a
//! completion is only accepted if it carries the latest generation for the
//! page still on screen. Drawing is enabled only while the page is ready.

use log::{debug, info, warn};

/// Handle for an outstanding render request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RenderTicket {
    pub generation: u64,
    pub page_index: usize,
}

/// Size of a rendered page raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
}

/// Load state of the current page
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PageLoadState {
    /// No plan loaded
    #[default]
    Empty,
    /// A render is pending
    Loading(RenderTicket),
    /// The raster is on screen
    Ready { page_index: usize, raster: RasterInfo },
    /// The last render failed
    Failed { page_index: usize, message: String },
}

/// What happened to a reported completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    /// Superseded by a newer request or a page change
    Stale,
}

/// Tracks render requests and the page's load state
#[derive(Debug, Clone, Default)]
pub struct PageLoader {
    state: PageLoadState,
    next_generation: u64,
}

impl PageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PageLoadState {
        &self.state
    }

    /// Start a render, superseding any pending one
    pub fn request(&mut self, page_index: usize) -> RenderTicket {
        self.next_generation += 1;
        let ticket = RenderTicket {
            generation: self.next_generation,
            page_index,
        };
        if let PageLoadState::Loading(previous) = &self.state {
            debug!(
                "render {} for page {} superseded by {}",
                previous.generation, previous.page_index, ticket.generation
            );
        }
        self.state = PageLoadState::Loading(ticket);
        ticket
    }

    fn is_current(&self, ticket: &RenderTicket) -> bool {
        matches!(&self.state, PageLoadState::Loading(pending) if pending == ticket)
    }

    /// Report a finished render
    pub fn complete(&mut self, ticket: RenderTicket, raster: RasterInfo) -> Completion {
        if !self.is_current(&ticket) {
            debug!(
                "discarding stale render {} for page {}",
                ticket.generation, ticket.page_index
            );
            return Completion::Stale;
        }
        info!(
            "page {} ready ({}x{})",
            ticket.page_index, raster.width, raster.height
        );
        self.state = PageLoadState::Ready {
            page_index: ticket.page_index,
            raster,
        };
        Completion::Accepted
    }

    /// Report a failed render
    pub fn fail(&mut self, ticket: RenderTicket, message: impl Into<String>) -> Completion {
        if !self.is_current(&ticket) {
            debug!(
                "discarding stale failure {} for page {}",
                ticket.generation, ticket.page_index
            );
            return Completion::Stale;
        }
        let message = message.into();
        warn!("page {} failed to render: {message}", ticket.page_index);
        self.state = PageLoadState::Failed {
            page_index: ticket.page_index,
            message,
        };
        Completion::Accepted
    }

    /// Outstanding request, if any
    pub fn pending(&self) -> Option<RenderTicket> {
        match &self.state {
            PageLoadState::Loading(ticket) => Some(*ticket),
            _ => None,
        }
    }

    /// Whether drawing input is accepted
    pub fn drawing_enabled(&self) -> bool {
        matches!(self.state, PageLoadState::Ready { .. })
    }

    /// Error message of a failed load
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            PageLoadState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Forget the plan
    pub fn reset(&mut self) {
        self.state = PageLoadState::Empty;
    }
}

use std::sync::Arc;

/// One decoded frame, RGBA8, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A display surface owned by the UI layer
pub trait VideoSurface: Send + Sync {
    /// Native size of the loaded video; `(0, 0)` until a frame is loaded
    fn intrinsic_size(&self) -> (u32, u32);

    /// Copy of the frame currently shown
    fn current_frame(&self) -> Option<VideoFrame>;
}

/// The "big" and "small" surfaces, as registered by the UI layer
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    big: Option<Arc<dyn VideoSurface>>,
    small: Option<Arc<dyn VideoSurface>>,
}

impl SurfaceRegistry {
    /// Register (or with `None`, unregister) the big surface
    pub fn register_big(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        self.big = surface;
    }

    pub fn register_small(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        self.small = surface;
    }

    /// Surface a screenshot is taken from
    ///
    /// With the view swapped the remote stream moved to the small surface,
    /// so that one is read.
    pub fn capture_source(&self, swapped: bool) -> Option<&Arc<dyn VideoSurface>> {
        if swapped {
            self.small.as_ref()
        } else {
            self.big.as_ref()
        }
    }
}

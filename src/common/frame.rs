use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;
use uuid::Uuid;

/// Decoded RGB frame submitted for analysis. Clones share the pixel buffer.
#[derive(Clone)]
pub struct Frame {
    frame_id: Uuid,
    image: Arc<RgbImage>,
    received_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(frame_id: Uuid, image: RgbImage, received_at: DateTime<Utc>) -> Self {
        Self {
            frame_id,
            image: Arc::new(image),
            received_at,
        }
    }

    /// Fresh id, stamped now.
    pub fn from_image(image: RgbImage) -> Self {
        Self::new(Uuid::new_v4(), image, Utc::now())
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

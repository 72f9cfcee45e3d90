//! Registration state machine.

use crate::geometry::ImageSize;
use crate::vision::FeatureSet;

/// Target captured at registration time. Never mutated after creation.
pub struct Template<I, F> {
    image: I,
    size: ImageSize,
    features: F,
}

impl<I, F: FeatureSet> Template<I, F> {
    pub fn new(image: I, size: ImageSize, features: F) -> Self {
        Self {
            image,
            size,
            features,
        }
    }

    /// Cropped ROI pixels.
    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn features(&self) -> &F {
        &self.features
    }

    pub fn num_keypoints(&self) -> usize {
        self.features.len()
    }
}

/// Whether a target has been registered.
///
/// There is no transition back to `Unregistered`; registering again replaces
/// the template.
pub enum RegistrationState<I, F> {
    Unregistered,
    Registered(Template<I, F>),
}

impl<I, F> RegistrationState<I, F> {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    pub fn template(&self) -> Option<&Template<I, F>> {
        match self {
            Self::Registered(template) => Some(template),
            Self::Unregistered => None,
        }
    }
}

impl<I, F> Default for RegistrationState<I, F> {
    fn default() -> Self {
        Self::Unregistered
    }
}

//! Product image selection and the upload plan run after a product save.
//!
//! A gallery mixes images already stored by the backend with files picked in
//! the current form. At most one of them is the principal image. Saving
//! never rolls back: each step of [`Gallery::plan`] is attempted in order and
//! failures are only counted.

use std::str::FromStr;

use crate::models::ProductImage;
use crate::types::ImageId;

/// Images allowed per product, existing and new combined.
pub const MAX_IMAGES: usize = 5;

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Por favor, seleccione archivos de imagen válidos (máximo 5MB cada uno).")]
    NoValidImages,

    #[error("Máximo {limit} imágenes permitidas por producto.")]
    TooMany { limit: usize },

    #[error("La imagen principal seleccionada no existe.")]
    UnknownPrincipal,
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl NewImage {
    /// Images only, and no larger than [`MAX_IMAGE_BYTES`].
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.content_type.starts_with("image/")
            && !self.bytes.is_empty()
            && self.bytes.len() <= MAX_IMAGE_BYTES
    }
}

/// Which image is the principal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    Existing(ImageId),
    /// Index into the newly selected files.
    New(usize),
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Existing(id) => write!(f, "existing:{id}"),
            Self::New(idx) => write!(f, "new:{idx}"),
        }
    }
}

impl FromStr for Principal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid principal image: {s}");
        let (kind, value) = s.split_once(':').ok_or_else(invalid)?;
        match kind {
            "existing" => value.parse().map(Self::Existing).map_err(|_| invalid()),
            "new" => value.parse().map(Self::New).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// A thumbnail in the image picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub principal: Principal,
    /// Backend URL for stored images; `None` for files not yet uploaded.
    pub url: Option<String>,
    pub label: String,
    pub is_principal: bool,
}

/// One step of the post-save image sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStep<'a> {
    /// `PATCH /api/product-images/{id}/` with the principal flag.
    SetPrincipal { id: ImageId, is_principal: bool },
    /// Multipart `POST /api/product-images/`.
    Upload { image: &'a NewImage, is_principal: bool },
}

/// Existing and newly selected images for one product form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    existing: Vec<ProductImage>,
    new: Vec<NewImage>,
    principal: Option<Principal>,
}

impl Gallery {
    /// Start from the images the backend has; keeps their principal flag.
    #[must_use]
    pub fn from_existing(existing: Vec<ProductImage>) -> Self {
        let principal = existing
            .iter()
            .find(|img| img.is_principal)
            .map(|img| Principal::Existing(img.id));
        Self {
            existing,
            new: Vec::new(),
            principal,
        }
    }

    #[must_use]
    pub fn existing(&self) -> &[ProductImage] {
        &self.existing
    }

    #[must_use]
    pub fn new_images(&self) -> &[NewImage] {
        &self.new
    }

    #[must_use]
    pub const fn principal(&self) -> Option<Principal> {
        self.principal
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.existing.len() + self.new.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots left under [`MAX_IMAGES`].
    #[must_use]
    pub fn remaining(&self) -> usize {
        MAX_IMAGES.saturating_sub(self.len())
    }

    /// Add selected files, dropping those that are not acceptable images.
    ///
    /// Returns how many files were added.
    ///
    /// # Errors
    ///
    /// No acceptable file in `files`, or the total would exceed
    /// [`MAX_IMAGES`]. Nothing is added on error.
    pub fn add_files(&mut self, files: Vec<NewImage>) -> Result<usize, GalleryError> {
        let accepted: Vec<NewImage> = files.into_iter().filter(NewImage::is_acceptable).collect();
        if accepted.is_empty() {
            return Err(GalleryError::NoValidImages);
        }
        if self.len() + accepted.len() > MAX_IMAGES {
            return Err(GalleryError::TooMany { limit: MAX_IMAGES });
        }
        let added = accepted.len();
        self.new.extend(accepted);
        Ok(added)
    }

    /// Drop a stored image from the form.
    pub fn remove_existing(&mut self, id: ImageId) {
        self.existing.retain(|img| img.id != id);
        if self.principal == Some(Principal::Existing(id)) {
            self.principal = None;
        }
    }

    /// Drop a selected file; later files shift down by one.
    pub fn remove_new(&mut self, index: usize) {
        if index >= self.new.len() {
            return;
        }
        self.new.remove(index);
        self.principal = match self.principal {
            Some(Principal::New(i)) if i == index => None,
            Some(Principal::New(i)) if i > index => Some(Principal::New(i - 1)),
            other => other,
        };
    }

    /// # Errors
    ///
    /// `principal` does not refer to an image in this gallery.
    pub fn set_principal(&mut self, principal: Principal) -> Result<(), GalleryError> {
        let known = match principal {
            Principal::Existing(id) => self.existing.iter().any(|img| img.id == id),
            Principal::New(i) => i < self.new.len(),
        };
        if !known {
            return Err(GalleryError::UnknownPrincipal);
        }
        self.principal = Some(principal);
        Ok(())
    }

    /// Thumbnails, stored images first.
    #[must_use]
    pub fn previews(&self) -> Vec<Preview> {
        let existing = self.existing.iter().map(|img| {
            let principal = Principal::Existing(img.id);
            Preview {
                principal,
                url: Some(img.image.clone()),
                label: format!("Imagen #{}", img.id),
                is_principal: self.principal == Some(principal),
            }
        });
        let new = self.new.iter().enumerate().map(|(i, img)| {
            let principal = Principal::New(i);
            Preview {
                principal,
                url: None,
                label: img.file_name.clone(),
                is_principal: self.principal == Some(principal),
            }
        });
        existing.chain(new).collect()
    }

    /// Steps to run after the product itself is saved: patch the principal
    /// flag of every stored image, then upload every new file.
    #[must_use]
    pub fn plan(&self) -> Vec<ImageStep<'_>> {
        let patches = self.existing.iter().map(|img| ImageStep::SetPrincipal {
            id: img.id,
            is_principal: self.principal == Some(Principal::Existing(img.id)),
        });
        let uploads = self.new.iter().enumerate().map(|(i, image)| ImageStep::Upload {
            image,
            is_principal: self.principal == Some(Principal::New(i)),
        });
        patches.chain(uploads).collect()
    }
}

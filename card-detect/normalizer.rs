use card_core::resample::resize_bilinear;
use card_core::Circle;
use log::debug;
use rayon::prelude::*;

use crate::error::{DetectError, DetectResult};
use crate::types::{Card, NormalizedCard};

/// Rescales located cards onto one shared `target_dim x target_dim` frame
#[derive(Debug, Clone, Copy)]
pub struct CardNormalizer {
    target_dim: u32,
}

impl CardNormalizer {
    pub fn new(target_dim: u32) -> DetectResult<Self> {
        if target_dim == 0 {
            return Err(DetectError::InvalidTargetDim(target_dim));
        }
        Ok(Self { target_dim })
    }

    pub fn target_dim(&self) -> u32 {
        self.target_dim
    }

    /// Resize every card independently in x and y. Order is preserved and
    /// `NormalizedCard::index` records each card's position in `cards`.
    pub fn normalize(&self, cards: &[Card]) -> Vec<NormalizedCard> {
        cards
            .par_iter()
            .enumerate()
            .map(|(index, card)| self.normalize_card(index, card))
            .collect()
    }

    fn normalize_card(&self, index: usize, card: &Card) -> NormalizedCard {
        let (w, h) = card.dimensions();
        let dim = self.target_dim;
        let sx = dim as f32 / w.max(1) as f32;
        let sy = dim as f32 / h.max(1) as f32;
        debug!("Card {}: {}x{} -> {}x{}", index, w, h, dim, dim);

        NormalizedCard {
            index,
            image: resize_bilinear(&card.image, dim, dim),
            mask: Circle::new(card.mask.cx * sx, card.mask.cy * sy, card.mask.radius * sx.min(sy)),
            source_circle: card.source_circle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma};

    fn create_card(width: u32, height: u32) -> Card {
        let image = GrayImage::from_fn(width, height, |x, y| Luma([((x * 5 + y * 11) % 256) as u8]));
        let mask = Circle::new(width as f32 * 0.5, height as f32 * 0.5, width.min(height) as f32 * 0.5 - 1.0);
        Card {
            image,
            mask,
            circle: mask,
            source_circle: mask,
            offset: (0, 0),
        }
    }

    #[test]
    fn test_zero_target_dim_rejected() {
        assert!(matches!(CardNormalizer::new(0), Err(DetectError::InvalidTargetDim(0))));
    }

    #[test]
    fn test_every_card_gets_target_dim() {
        let normalizer = CardNormalizer::new(150).unwrap();
        let cards = vec![create_card(121, 121), create_card(90, 97), create_card(301, 280)];
        let normalized = normalizer.normalize(&cards);

        assert_eq!(normalized.len(), 3);
        for (i, card) in normalized.iter().enumerate() {
            assert_eq!(card.index, i);
            assert_eq!(card.image.dimensions(), (150, 150));
            assert_eq!(card.dim(), 150);
        }
    }

    #[test]
    fn test_parallel_normalize_keeps_card_order() {
        let normalizer = CardNormalizer::new(48).unwrap();
        let cards: Vec<Card> = (0..40)
            .map(|i| Card {
                source_circle: Circle::new(i as f32 * 10.0, 5.0, 20.0),
                ..create_card(30 + i, 40)
            })
            .collect();
        let normalized = normalizer.normalize(&cards);

        assert_eq!(normalized.len(), cards.len());
        for (i, (card, source)) in normalized.iter().zip(&cards).enumerate() {
            assert_eq!(card.index, i);
            assert_eq!(card.source_circle, source.source_circle);
            assert_eq!(card.image, resize_bilinear(&source.image, 48, 48));
        }
    }

    #[test]
    fn test_canonical_card_is_unchanged() {
        let normalizer = CardNormalizer::new(64).unwrap();
        let card = create_card(64, 64);
        let normalized = normalizer.normalize(std::slice::from_ref(&card));

        assert_eq!(normalized[0].image.as_raw(), card.image.as_raw());
        assert_relative_eq!(normalized[0].mask.radius, card.mask.radius);
    }

    #[test]
    fn test_mask_scales_with_card() {
        let normalizer = CardNormalizer::new(100).unwrap();
        let normalized = normalizer.normalize(&[create_card(50, 50)]);
        let mask = normalized[0].mask;
        assert_relative_eq!(mask.cx, 50.0);
        assert_relative_eq!(mask.cy, 50.0);
        assert_relative_eq!(mask.radius, 48.0);
    }

    #[test]
    fn test_empty_input() {
        let normalizer = CardNormalizer::new(100).unwrap();
        assert!(normalizer.normalize(&[]).is_empty());
    }
}
